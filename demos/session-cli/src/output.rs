//! Styled terminal output

use bearer_guard::HttpResponse;
use bearer_guard::utils::redact_optional;
use console::style;

/// Display the session status
pub fn display_status(authenticated: bool, access: Option<&str>, refresh: Option<&str>) {
    let state = if authenticated {
        style("authenticated").green().bold()
    } else {
        style("logged out").yellow().bold()
    };
    println!("{} {}", style("Session:").cyan(), state);
    println!("  access:  {}", style(redact_optional(access)).dim());
    println!("  refresh: {}", style(redact_optional(refresh)).dim());
}

/// Display a response status line and body
pub fn display_response(response: &HttpResponse) {
    println!(
        "{} {}",
        style("Status:").cyan(),
        style(response.status).green()
    );

    // Pretty-print JSON bodies, pass anything else through
    match response.json::<serde_json::Value>() {
        Ok(json) => match serde_json::to_string_pretty(&json) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{}", response.text()),
        },
        Err(_) => println!("{}", response.text()),
    }
}

/// Display a success message
pub fn display_success(msg: &str) {
    println!("{} {}", style("✓").green(), msg);
}

/// Display a warning message
pub fn display_warning(msg: &str) {
    eprintln!("{} {}", style("!").yellow(), style(msg).yellow());
}
