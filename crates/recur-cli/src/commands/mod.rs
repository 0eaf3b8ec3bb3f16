//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config, CSV loading, date arguments)
//! - `detect` - Recurring charge detection
//! - `predict` - Upcoming occurrence prediction
//! - `holidays` - Holiday calendar listing

pub mod core;
pub mod detect;
pub mod holidays;
pub mod predict;

// Re-export command functions for main.rs
pub use core::*;
pub use detect::*;
pub use holidays::*;
pub use predict::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
