//! Terminal output utilities

use console::style;
use lunar_bootstrap::Severity;
use lunar_core::LoadingState;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Colored loading state for tables
pub fn state(state: LoadingState) -> String {
    let text = state.to_string();
    match state {
        LoadingState::Initialized | LoadingState::Loaded => style(text).green().to_string(),
        LoadingState::Pending => style(text).yellow().to_string(),
        LoadingState::Errored => style(text).red().to_string(),
    }
}

pub fn severity(severity: Severity) -> String {
    match severity {
        Severity::AskRedownload => style("redownload").yellow().to_string(),
        Severity::UpdateHost => style("update game").yellow().to_string(),
        Severity::LogOnly => style("log only").dim().to_string(),
    }
}
