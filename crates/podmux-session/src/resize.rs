use serde::{Deserialize, Serialize};

/// Terminal dimensions sent on the resize channel of a TTY session.
///
/// Serializes to the wire's `{"Width":..,"Height":..}` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Columns.
    #[serde(rename = "Width")]
    pub width: u16,
    /// Rows.
    #[serde(rename = "Height")]
    pub height: u16,
}

impl TerminalSize {
    /// Create a terminal size.
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}
