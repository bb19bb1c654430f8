//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Setup commands (init, info) and shared utilities (load_config, open_store)
//! - `import` - CSV import through the mapping/preview/commit pipeline
//! - `transactions` - Transaction commands (list, add, update, delete)

pub mod core;
pub mod import;
pub mod transactions;

// Re-export command functions for main.rs
pub use self::core::*;
pub use self::import::*;
pub use self::transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount with red for debits and green for credits
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("\x1b[31m${:.2}\x1b[0m", amount.abs()) // Red for debits
    } else {
        format!("\x1b[32m+${:.2}\x1b[0m", amount) // Green for credits
    }
}
