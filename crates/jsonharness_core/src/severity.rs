//! Message severity used by the report layer.
//!
//! Logic code tags text with a [`Severity`]; only the final print boundary maps it to terminal
//! styling.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Section headers and timing lines
    Header,
    /// Passing glyphs, matched comparisons
    Ok,
    /// Failing glyphs, mismatches, fatal messages
    Fail,
    /// Unstyled text (fixture dumps, parser traces)
    #[default]
    Plain,
}
