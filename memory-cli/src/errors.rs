//! Enhanced error handling module for memory-cli
//!
//! Provides helpful error messages with context and suggestions for common issues.

use anyhow::Result;
use colored::Colorize;

/// Trait for adding helpful context and suggestions to errors
#[allow(dead_code)]
pub trait EnhancedError<T> {
    /// Add context with helpful suggestions
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> EnhancedError<T> for Result<T, E> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T> {
        self.map_err(|e| {
            let mut error_msg = format!("{}\n\n{}", msg.red().bold(), e);

            if !help.is_empty() {
                error_msg.push_str(&format!("\n\n{}", "Possible solutions:".yellow().bold()));
                for (i, h) in help.iter().enumerate() {
                    error_msg.push_str(&format!("\n  {}. {}", i + 1, h));
                }
            }

            anyhow::anyhow!(error_msg)
        })
    }
}

/// Common error messages and help text
#[allow(dead_code)]
pub mod helpers {
    /// Memory not found error help
    #[allow(dead_code)]
    pub const MEMORY_NOT_FOUND_HELP: &[&str] = &[
        "Check that the memory ID is correct",
        "The memory may have decayed below the delete threshold and been removed",
        "Check the archive key if lifecycle archiving is enabled",
    ];

    /// Configuration error help
    #[allow(dead_code)]
    pub const CONFIG_ERROR_HELP: &[&str] = &[
        "Check the config file path passed via --config",
        "Verify all required fields are present",
        "Use 'memory-cli config check' to validate configuration",
    ];

    /// Invalid input error help
    #[allow(dead_code)]
    pub const INVALID_INPUT_HELP: &[&str] = &[
        "Check input format and data types",
        "Verify JSON syntax if providing message content",
        "Use --help to see valid options",
    ];

    /// PRIME provider configuration error help
    #[allow(dead_code)]
    pub const PRIME_CONFIG_HELP: &[&str] = &[
        "Set PRIME_API_KEY or pass --api-key",
        "Set PRIME_PROVIDER to one of: openai, anthropic, mistral, local",
        "Use 'memory-cli config check' to see resolved configuration",
    ];

    /// Format enhanced error message
    #[allow(dead_code)]
    pub fn format_error_message(error: &str, context: &str, help: &[&str]) -> String {
        use colored::Colorize;

        let mut msg = format!("{}\n\n{}", context.red().bold(), error);

        if !help.is_empty() {
            msg.push_str(&format!("\n\n{}", "Possible solutions:".yellow().bold()));
            for (i, h) in help.iter().enumerate() {
                msg.push_str(&format!("\n  {}. {}", i + 1, h));
            }
        }

        msg
    }
}
