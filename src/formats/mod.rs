//! File format adapters
//!
//! One record mapper per source format (SAM, GFF3, PSL, VCF). Each one
//! turns a line of its format into zero or more extended BED records.

pub mod gff;
pub mod psl;
pub mod sam;
pub mod vcf;

use crate::core::{BedRecord, ConvertResult};

pub use gff::{GffMapper, GffOptions, GffParseError, GffRecordView};
pub use psl::{PslMapper, PslOptions, PslRecordView, PSL_COLUMNS, PSL_HEADER_LINES};
pub use sam::{SamMapper, SamOptions, SamRecordView, SamTag, TagPolicy, SPECIFICATION_SAM_TAGS};
pub use vcf::{
    is_deletion, is_insertion, is_snv, is_symbolic, split_alt_alleles, VariantFilter, VcfColumns,
    VcfMapper, VcfOptions, VcfRecordView,
};

/// How a mapper treats one input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Header or metadata line, handled in order by [`RecordMapper::header`]
    Header,
    /// Data record, handled by [`RecordMapper::map_record`]
    Record,
    /// Ignored line
    Skip,
    /// End of convertible data; the rest of the stream is not read
    End,
}

/// Converts the lines of one source format into extended BED
///
/// Header lines go through `header` strictly in input order and may update
/// mapper state. Data records go through `map_record`, which only reads
/// state and may run on several threads at once.
pub trait RecordMapper: Sync {
    /// Format name used in messages
    fn format_name(&self) -> &'static str;

    /// Classify a line; `line_no` is 1-based
    fn classify(&self, line_no: usize, line: &str) -> LineKind;

    /// Consume a header line, optionally producing a pseudo-record
    fn header(&mut self, line_no: usize, line: &str) -> ConvertResult<Option<BedRecord>>;

    /// Map one data record; an empty result drops the record
    fn map_record(&self, line_no: usize, line: &str) -> ConvertResult<Vec<BedRecord>>;
}

/// Numbering of header pseudo-records on the `_header` chromosome
#[derive(Debug, Clone, Default)]
pub struct HeaderKeeper {
    keep: bool,
    next: u64,
}

impl HeaderKeeper {
    pub fn new(keep: bool) -> Self {
        Self { keep, next: 0 }
    }

    pub fn keeps(&self) -> bool {
        self.keep
    }

    /// Pseudo-record for `line` when headers are kept
    pub fn record(&mut self, line: &str) -> Option<BedRecord> {
        if !self.keep {
            return None;
        }
        let rec = BedRecord::header(self.next, line);
        self.next += 1;
        Some(rec)
    }
}

/// Conversion statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Input lines read
    pub lines: usize,
    /// Header and metadata lines seen
    pub headers: usize,
    /// Data records mapped
    pub records: usize,
    /// BED lines written, pseudo-records included
    pub emitted: usize,
    /// Data records that produced no output
    pub dropped: usize,
}
