//! Terminal output helpers. ASCII markers, color via owo-colors.

use owo_colors::OwoColorize;
use wmi_common::{DispatchError, OutputFormat};

use crate::errors;

/// Print a key/value line with aligned keys.
pub fn print_kv(key: &str, value: &str, key_width: usize) {
    println!("{:width$} {}", key.cyan(), value, width = key_width);
}

/// Footer after a table: `Total: N services`.
pub fn print_total(count: usize, noun: &str) {
    println!();
    println!("{}", format!("Total: {} {}", count, noun).green());
}

/// Report a dispatch error and return the matching exit code.
///
/// Diagnostics go to stderr. When JSON output was requested, a machine
/// readable error object goes to stdout instead of result data.
pub fn report_error(error: &DispatchError, format: OutputFormat) -> i32 {
    eprintln!("{} {}", "[ERROR]".red(), error);
    if format == OutputFormat::Json {
        let object = serde_json::json!({
            "error": error.kind(),
            "message": error.to_string(),
        });
        println!("{}", object);
    }
    errors::exit_code_for(error)
}

pub fn report_general_error(message: &str) -> i32 {
    eprintln!("{} {}", "[ERROR]".red(), message);
    errors::EXIT_GENERAL_ERROR
}
