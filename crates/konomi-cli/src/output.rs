//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde_json::Value;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print every setting, marking the ones that stay on this device
    pub fn print_settings(&self, settings: &serde_json::Map<String, Value>, local_only: &[&str]) {
        match self.format {
            OutputFormat::Human => {
                let width = settings.keys().map(|k| k.len()).max().unwrap_or(0);
                for (key, value) in settings {
                    let marker = if local_only.contains(&key.as_str()) {
                        "  (local)"
                    } else {
                        ""
                    };
                    println!(
                        "{:width$}  {}{}",
                        key,
                        truncate(&render_value(value), 60),
                        marker,
                        width = width
                    );
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(settings).unwrap_or_default()
                );
            }
            OutputFormat::Quiet => {
                for key in settings.keys() {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print a single setting value
    pub fn print_value(&self, key: &str, value: &Value) {
        match self.format {
            OutputFormat::Human => println!("{} = {}", key, render_value(value)),
            OutputFormat::Json => println!("{}", serde_json::json!({ key: value })),
            OutputFormat::Quiet => println!("{}", render_value(value)),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Render a JSON value the way a user would type it
///
/// Strings print without quotes; everything else prints as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
