//! Clipboard functionality for copying calculator results.

use anyhow::Context;
use arboard::Clipboard;

use super::format::{ERROR_MARKER, NumberFormatter};

/// Copy a displayed result to the system clipboard without grouping separators.
pub fn copy_result(result: &str, formatter: &NumberFormatter) -> anyhow::Result<()> {
    let text = clipboard_text(result, formatter)
        .with_context(|| format!("Nothing to copy for '{}'", result))?;

    let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .set_text(text)
        .context("Failed to copy to clipboard")
}

/// The raw number for a displayed result, or `None` for the error marker.
fn clipboard_text(result: &str, formatter: &NumberFormatter) -> Option<String> {
    let trimmed = result.trim();
    if trimmed.is_empty() || trimmed == ERROR_MARKER {
        return None;
    }
    Some(formatter.strip_grouping(trimmed))
}
