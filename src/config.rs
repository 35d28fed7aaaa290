/// Knobs for reading an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportConfig {
    /// Leading lines discarded before data rows start.
    pub header_lines: usize,
    pub delimiter: u8,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            header_lines: 1,
            delimiter: b',',
        }
    }
}

impl ImportConfig {
    pub fn with_header_lines(mut self, header_lines: usize) -> Self {
        self.header_lines = header_lines;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}
