//! Display utilities for CLI output formatting

use colored::{ColoredString, Colorize};

use ariel_client::ApiResponse;
use ariel_common::{Search, SearchStatus};

/// Colors a status line by class: green for 2xx, yellow for 3xx, red otherwise.
pub fn status_line(response: &ApiResponse) -> ColoredString {
    let line = response.status.to_string();
    if response.status.is_success() {
        line.bright_green()
    } else if response.status.is_redirection() {
        line.yellow()
    } else {
        line.bright_red()
    }
}

/// Pretty-prints JSON bodies; anything else is passed through as text.
pub fn format_body(response: &ApiResponse) -> String {
    match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
        Err(_) => response.text().into_owned(),
    }
}

/// Display a full response: status line then body
pub fn print_response(response: &ApiResponse) {
    println!("{}", status_line(response));
    let body = format_body(response);
    if !body.is_empty() {
        println!("{body}");
    }
}

/// One-line progress report for a running search.
pub fn format_progress(search: &Search) -> String {
    let status = match search.status {
        SearchStatus::Completed => search.status.to_string().bright_green(),
        SearchStatus::Canceled | SearchStatus::Error => search.status.to_string().bright_red(),
        _ => search.status.to_string().cyan(),
    };
    format!(
        "{} {} {status} {}% ({} records)",
        "○".bright_blue(),
        search.search_id,
        search.progress,
        search.record_count
    )
}
