//! Source locations attached to operators.

use std::{fmt, sync::Arc};

/// A source span an operator was generated from.
///
/// Lines and columns are 1-based; `0` means unknown. File and method names are shared between
/// the many operators generated from the same source method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DebugInfo {
    /// Path of the source file
    pub file: Arc<str>,
    /// Name of the source method
    pub method_name: Arc<str>,
    /// First line of the span
    pub begin_line: u32,
    /// First column of the span
    pub begin_column: u32,
    /// Last line of the span
    pub end_line: u32,
    /// Last column of the span
    pub end_column: u32,
}

impl DebugInfo {
    /// Creates a span covering `begin_line:begin_column` to `end_line:end_column`.
    #[must_use]
    pub fn new(
        file: &str,
        method_name: &str,
        begin_line: u32,
        begin_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file: Arc::from(file),
            method_name: Arc::from(method_name),
            begin_line,
            begin_column,
            end_line,
            end_column,
        }
    }

    /// Creates a span for a single source line.
    #[must_use]
    pub fn line(file: &str, method_name: &str, line: u32) -> Self {
        Self::new(file, method_name, line, 1, line, 1)
    }
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{})-({},{})",
            self.file, self.begin_line, self.begin_column, self.end_line, self.end_column
        )
    }
}
