//! Source file bookkeeping.

/// A source file: its display name and its contents.
///
/// The compiler runs one file at a time, so there is no source map; the file
/// itself knows how to turn a byte offset back into a line/column pair for
/// error messages.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Name used in diagnostics (usually the path given on the command line).
    pub name: String,
    /// Full contents of the file.
    pub content: String,
}

impl SourceFile {
    /// Create a source file from a name and its contents.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Derive the 1-based line/column of a byte offset by scanning the
    /// buffer up to it.
    ///
    /// Offsets past the end of the buffer report the position just after the
    /// last byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use gobc_util::SourceFile;
    ///
    /// let file = SourceFile::new("t.gob", "ab\ncd");
    /// assert_eq!(file.line_col(0), (1, 1));
    /// assert_eq!(file.line_col(3), (2, 1));
    /// assert_eq!(file.line_col(4), (2, 2));
    /// ```
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let mut line = 1u32;
        let mut column = 1u32;
        for &b in self.content.as_bytes().iter().take(offset) {
            if b == b'\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}
