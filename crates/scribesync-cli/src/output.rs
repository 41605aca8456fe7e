//! Terminal output helpers
//!
//! Every command prints through a [`Printer`] so `--json` swaps the whole
//! surface at once: human mode writes checkmarked lines, JSON mode writes
//! one machine-readable object per message.

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Formats command output for either humans or machines
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("\u{2713} {message}"),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"success": true, "message": message}));
            }
        }
    }

    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("\u{2717} Error: {message}"),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({"success": false, "error": message}));
            }
        }
    }

    pub fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("\u{26a0} Warning: {message}"),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
            }
        }
    }

    /// Indented detail line; silent in JSON mode
    pub fn detail(&self, message: &str) {
        if self.format == OutputFormat::Human {
            println!("  {message}");
        }
    }

    /// Structured payload; silent in human mode
    pub fn json(&self, value: &serde_json::Value) {
        if self.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
        }
    }
}
