//! Extended BED output record and tab-delimited field splitting

use memchr::memchr_iter;
use std::fmt;
use std::io::{self, Write};

/// Chromosome name used for header pseudo-records
pub const HEADER_CHROM: &str = "_header";

/// Extended BED record
///
/// Chromosome plus a 0-based, half-open `[start, stop)` interval, followed by
/// format-specific columns (the first one is the BED id column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedRecord {
    pub chrom: String,
    pub start: u64,
    pub stop: u64,
    pub columns: Vec<String>,
}

impl BedRecord {
    pub fn new(chrom: impl Into<String>, start: u64, stop: u64, columns: Vec<String>) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            stop,
            columns,
        }
    }

    /// Pseudo-record preserving a header line at `[index, index + 1)`
    pub fn header(index: u64, line: &str) -> Self {
        Self::new(HEADER_CHROM, index, index + 1, vec![line.to_string()])
    }

    /// BED id (4th) column
    pub fn id(&self) -> Option<&str> {
        self.columns.first().map(|s| s.as_str())
    }

    /// Total number of output columns
    pub fn column_count(&self) -> usize {
        3 + self.columns.len()
    }

    /// All output columns as strings, in order
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.column_count());
        fields.push(self.chrom.clone());
        fields.push(self.start.to_string());
        fields.push(self.stop.to_string());
        fields.extend(self.columns.iter().cloned());
        fields
    }

    /// Write as one newline-terminated, tab-separated line
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self)
    }
}

impl fmt::Display for BedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.stop)?;
        for col in &self.columns {
            write!(f, "\t{}", col)?;
        }
        Ok(())
    }
}

/// Split a line on tab characters
pub fn tab_fields(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(16);
    let mut start = 0;
    for tab in memchr_iter(b'\t', bytes) {
        fields.push(&line[start..tab]);
        start = tab + 1;
    }
    fields.push(&line[start..]);
    fields
}
