//! SAM format adapter
//!
//! Converts 1-based, closed SAM alignments into 0-based, half-open extended
//! BED. The first six BED columns come from:
//!
//! - RNAME                    -> chromosome
//! - POS - 1                  -> start
//! - POS + length(CIGAR) - 1  -> stop
//! - QNAME                    -> id
//! - FLAG                     -> score
//! - 16 & FLAG                -> strand
//!
//! MAPQ, CIGAR, RNEXT, PNEXT, TLEN, SEQ, QUAL and the optional tags follow
//! in their original order, so BED output can be permuted back into SAM.

use super::{HeaderKeeper, LineKind, RecordMapper};
use crate::core::{split_read, tab_fields, whole_read, BedRecord, Cigar, ConvertError, ConvertResult};
use std::collections::HashSet;

/// Optional field tags defined by the SAM specification
pub const SPECIFICATION_SAM_TAGS: &[&str] = &[
    "AM", "AS", "BC", "BQ", "CC", "CM", "CO", "CP", "CQ", "CS", "CT", "E2", "FI", "FS", "FZ",
    "LB", "H0", "H1", "H2", "HI", "IH", "MD", "MQ", "NH", "NM", "OQ", "OP", "OC", "PG", "PQ",
    "PT", "PU", "QT", "Q2", "R2", "RG", "RT", "SA", "SM", "TC", "U2", "UQ",
];

/// Number of mandatory SAM columns
pub const SAM_MANDATORY_COLUMNS: usize = 11;

const FLAG_UNMAPPED: u16 = 0x4;
const FLAG_REVERSE: u16 = 0x10;

/// Why a tag key was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Listed in the SAM specification
    Specification,
    /// Starts with X, Y or Z (reserved for end users)
    Reserved,
    /// Named in `--custom-tags`
    Custom,
}

/// Set of optional-field keys accepted for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPolicy {
    custom: HashSet<String>,
}

impl TagPolicy {
    pub fn new<I, S>(custom: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            custom: custom.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from a comma-separated `--custom-tags` value
    pub fn from_csv(csv: Option<&str>) -> Self {
        match csv {
            Some(csv) => Self::new(
                csv.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            ),
            None => Self::default(),
        }
    }

    pub fn classify(&self, key: &str) -> Option<TagClass> {
        if SPECIFICATION_SAM_TAGS.contains(&key) {
            Some(TagClass::Specification)
        } else if key.starts_with(['X', 'Y', 'Z']) {
            Some(TagClass::Reserved)
        } else if self.custom.contains(key) {
            Some(TagClass::Custom)
        } else {
            None
        }
    }

    pub fn accepts(&self, key: &str) -> bool {
        self.classify(key).is_some()
    }
}

/// One `TAG:TYPE:VALUE` optional field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamTag<'a> {
    pub key: &'a str,
    pub kind: &'a str,
    pub value: &'a str,
}

impl<'a> SamTag<'a> {
    /// Split a triplet; the value may itself contain `:`
    pub fn parse(field: &'a str) -> ConvertResult<Self> {
        let mut parts = field.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(kind), Some(value)) if key.len() == 2 => Ok(Self { key, kind, value }),
            _ => Err(ConvertError::InvalidSamTag(field.to_string())),
        }
    }

    /// Parse and check the key against `policy`
    pub fn parse_with(field: &'a str, policy: &TagPolicy) -> ConvertResult<Self> {
        let tag = Self::parse(field)?;
        if !policy.accepts(tag.key) {
            return Err(ConvertError::InvalidSamTag(tag.key.to_string()));
        }
        Ok(tag)
    }
}

/// SAM conversion settings
#[derive(Debug, Clone, Default)]
pub struct SamOptions {
    /// Keep `@` header lines as pseudo-records
    pub keep_header: bool,
    /// Split reads on `N`/`D` CIGAR boundaries
    pub split: bool,
    /// Include unmapped reads
    pub all_reads: bool,
    pub tags: TagPolicy,
}

/// Parsed SAM alignment line
///
/// Text columns borrow from the input line; built once per line and
/// discarded after conversion.
#[derive(Debug)]
pub struct SamRecordView<'a> {
    pub qname: &'a str,
    pub flag: u16,
    pub rname: &'a str,
    /// 1-based leftmost position
    pub pos: u64,
    pub mapq: &'a str,
    pub cigar_str: &'a str,
    pub cigar: Cigar,
    pub rnext: &'a str,
    pub pnext: &'a str,
    pub tlen: &'a str,
    pub seq: &'a str,
    pub qual: &'a str,
    /// Raw optional fields (12th column onward)
    pub tags: Vec<&'a str>,
}

impl<'a> SamRecordView<'a> {
    /// Parse an alignment line; `line_no` is used in error messages
    pub fn parse(line: &'a str, line_no: usize) -> ConvertResult<Self> {
        let fields = tab_fields(line);
        if fields.len() < SAM_MANDATORY_COLUMNS {
            return Err(ConvertError::malformed(
                line_no,
                format!(
                    "expected at least {} SAM columns, found {}",
                    SAM_MANDATORY_COLUMNS,
                    fields.len()
                ),
            ));
        }

        let cigar = Cigar::parse(fields[5])?;
        let flag: u16 = fields[1]
            .parse()
            .map_err(|_| ConvertError::malformed(line_no, format!("invalid FLAG '{}'", fields[1])))?;
        let pos: u64 = fields[3]
            .parse()
            .map_err(|_| ConvertError::malformed(line_no, format!("invalid POS '{}'", fields[3])))?;
        if fields[7].parse::<u64>().is_err() {
            return Err(ConvertError::malformed(
                line_no,
                format!("invalid PNEXT '{}'", fields[7]),
            ));
        }
        if fields[8].parse::<i64>().is_err() {
            return Err(ConvertError::malformed(
                line_no,
                format!("invalid TLEN '{}'", fields[8]),
            ));
        }

        Ok(Self {
            qname: fields[0],
            flag,
            rname: fields[2],
            pos,
            mapq: fields[4],
            cigar_str: fields[5],
            cigar,
            rnext: fields[6],
            pnext: fields[7],
            tlen: fields[8],
            seq: fields[9],
            qual: fields[10],
            tags: fields[SAM_MANDATORY_COLUMNS..].to_vec(),
        })
    }

    pub fn strand(&self) -> char {
        if self.flag & FLAG_REVERSE != 0 {
            '-'
        } else {
            '+'
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.flag & FLAG_UNMAPPED == 0
    }

    /// 0-based start (POS 0 of unplaced reads stays at 0)
    pub fn start(&self) -> u64 {
        self.pos.saturating_sub(1)
    }

    /// Check SEQ against the CIGAR; skipped for `*` SEQ or `*` CIGAR
    pub fn validate_seq(&self) -> ConvertResult<()> {
        if self.cigar.is_unavailable() {
            return Ok(());
        }
        self.cigar.validate_seq(self.seq)
    }

    /// Check every optional field against `policy`
    pub fn validate_tags(&self, policy: &TagPolicy) -> ConvertResult<Vec<SamTag<'a>>> {
        self.tags
            .iter()
            .map(|field| SamTag::parse_with(field, policy))
            .collect()
    }

    fn bed_record(&self, id: String, start: u64, stop: u64) -> BedRecord {
        let mut columns = Vec::with_capacity(10 + self.tags.len());
        columns.push(id);
        columns.push(self.flag.to_string());
        columns.push(self.strand().to_string());
        columns.push(self.mapq.to_string());
        columns.push(self.cigar_str.to_string());
        columns.push(self.rnext.to_string());
        columns.push(self.pnext.to_string());
        columns.push(self.tlen.to_string());
        columns.push(self.seq.to_string());
        columns.push(self.qual.to_string());
        columns.extend(self.tags.iter().map(|t| t.to_string()));
        BedRecord::new(self.rname, start, stop, columns)
    }

    /// Build BED records for this alignment
    pub fn to_bed(&self, split: bool) -> ConvertResult<Vec<BedRecord>> {
        let blocks = if split {
            split_read(&self.cigar, self.start())?
        } else {
            vec![whole_read(&self.cigar, self.start())?]
        };
        Ok(blocks
            .into_iter()
            .map(|block| self.bed_record(block.id(self.qname), block.start, block.stop))
            .collect())
    }
}

/// SAM record mapper
#[derive(Debug, Clone)]
pub struct SamMapper {
    options: SamOptions,
    headers: HeaderKeeper,
}

impl SamMapper {
    pub fn new(options: SamOptions) -> Self {
        let headers = HeaderKeeper::new(options.keep_header);
        Self { options, headers }
    }
}

impl RecordMapper for SamMapper {
    fn format_name(&self) -> &'static str {
        "SAM"
    }

    fn classify(&self, _line_no: usize, line: &str) -> LineKind {
        if line.is_empty() {
            LineKind::Skip
        } else if line.starts_with('@') {
            LineKind::Header
        } else {
            LineKind::Record
        }
    }

    fn header(&mut self, _line_no: usize, line: &str) -> ConvertResult<Option<BedRecord>> {
        Ok(self.headers.record(line))
    }

    fn map_record(&self, line_no: usize, line: &str) -> ConvertResult<Vec<BedRecord>> {
        let view = SamRecordView::parse(line, line_no)?;
        if !self.options.all_reads && !view.is_mapped() {
            return Ok(Vec::new());
        }
        view.validate_seq()?;
        view.validate_tags(&self.options.tags)?;
        view.to_bed(self.options.split)
    }
}
