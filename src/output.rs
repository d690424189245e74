//! User-facing output utilities for colored terminal messages
//!
//! Diagnostics go through `log`; these are for the few messages a user of the
//! `cmap` binary should always see.

use owo_colors::OwoColorize;

/// Display a warning message to the user in yellow with padding
///
/// # Example
/// ```ignore
/// output::warn("No declarations found. Check the extensions allowed in classmap.toml.");
/// ```
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Display an error message to the user in red with padding
///
/// # Example
/// ```ignore
/// output::error("No symbol map found. Run 'cmap index' to scan the tree first.");
/// ```
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}
