//! GFF3 format adapter
//!
//! GFF uses 1-based, closed coordinates; BED output is 0-based, half-open.
//! Output columns: seqid, start - 1, end, ID attribute (or `.`), score,
//! strand, source, type, phase, attributes.
//!
//! Zero-length insertions (start == end) get `zero_length_insertion=True`
//! appended to their attributes.

use super::{HeaderKeeper, LineKind, RecordMapper};
use crate::core::{tab_fields, BedRecord, ConvertError, ConvertResult};

/// Number of GFF3 columns
pub const GFF_COLUMNS: usize = 9;

/// Attribute appended to zero-length insertion features
pub const ZERO_LENGTH_INSERTION_ATTR: &str = "zero_length_insertion=True";

/// GFF parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GffParseError {
    WrongFieldCount { expected: usize, found: usize },
    InvalidNumber(&'static str, String),
    InvalidRange { start: u64, end: u64 },
}

impl std::fmt::Display for GffParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GffParseError::WrongFieldCount { expected, found } => {
                write!(f, "Wrong field count: expected {}, found {}", expected, found)
            }
            GffParseError::InvalidNumber(field, value) => {
                write!(f, "Invalid number in field {}: {}", field, value)
            }
            GffParseError::InvalidRange { start, end } => {
                write!(f, "Invalid range: start {} end {}", start, end)
            }
        }
    }
}

impl std::error::Error for GffParseError {}

/// Zero-copy GFF3 record view
pub struct GffRecordView<'a> {
    pub seqid: &'a str,
    pub source: &'a str,
    pub feature: &'a str,
    /// Start position (1-based)
    pub start: u64,
    /// End position (1-based, inclusive)
    pub end: u64,
    pub score: &'a str,
    pub strand: &'a str,
    pub phase: &'a str,
    pub attributes: &'a str,
}

impl<'a> GffRecordView<'a> {
    /// Parse a GFF3 line of exactly nine tab-separated columns
    pub fn parse(line: &'a str) -> Result<Self, GffParseError> {
        let fields = tab_fields(line);
        if fields.len() != GFF_COLUMNS {
            return Err(GffParseError::WrongFieldCount {
                expected: GFF_COLUMNS,
                found: fields.len(),
            });
        }

        let start: u64 = fields[3]
            .parse()
            .map_err(|_| GffParseError::InvalidNumber("start", fields[3].to_string()))?;
        let end: u64 = fields[4]
            .parse()
            .map_err(|_| GffParseError::InvalidNumber("end", fields[4].to_string()))?;
        if start == 0 || start > end {
            return Err(GffParseError::InvalidRange { start, end });
        }

        Ok(Self {
            seqid: fields[0].trim_start_matches(' '),
            source: fields[1],
            feature: fields[2],
            start,
            end,
            score: fields[5],
            strand: fields[6],
            phase: fields[7],
            attributes: fields[8].trim_end_matches(' '),
        })
    }

    /// Value of the `ID` attribute, if any
    pub fn id(&self) -> Option<&'a str> {
        self.attributes
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| key.trim() == "ID")
            .map(|(_, value)| value)
    }

    pub fn is_zero_length_insertion(&self) -> bool {
        self.start == self.end
    }

    pub fn to_bed(&self) -> BedRecord {
        let attributes = if self.is_zero_length_insertion() {
            format!("{};{}", self.attributes, ZERO_LENGTH_INSERTION_ATTR)
        } else {
            self.attributes.to_string()
        };
        BedRecord::new(
            self.seqid,
            self.start - 1,
            self.end,
            vec![
                self.id().unwrap_or(".").to_string(),
                self.score.to_string(),
                self.strand.to_string(),
                self.source.to_string(),
                self.feature.to_string(),
                self.phase.to_string(),
                attributes,
            ],
        )
    }
}

/// GFF3 conversion settings
#[derive(Debug, Clone, Default)]
pub struct GffOptions {
    /// Keep `#` and `##` lines as pseudo-records
    pub keep_header: bool,
}

/// GFF3 record mapper
#[derive(Debug, Clone)]
pub struct GffMapper {
    headers: HeaderKeeper,
}

impl GffMapper {
    pub fn new(options: GffOptions) -> Self {
        Self {
            headers: HeaderKeeper::new(options.keep_header),
        }
    }
}

impl RecordMapper for GffMapper {
    fn format_name(&self) -> &'static str {
        "GFF"
    }

    fn classify(&self, _line_no: usize, line: &str) -> LineKind {
        if line.starts_with("##FASTA") {
            LineKind::End
        } else if line.is_empty() {
            LineKind::Skip
        } else if line.starts_with('#') {
            LineKind::Header
        } else {
            LineKind::Record
        }
    }

    fn header(&mut self, _line_no: usize, line: &str) -> ConvertResult<Option<BedRecord>> {
        Ok(self.headers.record(line))
    }

    fn map_record(&self, line_no: usize, line: &str) -> ConvertResult<Vec<BedRecord>> {
        let view = GffRecordView::parse(line)
            .map_err(|e| ConvertError::malformed(line_no, e.to_string()))?;
        Ok(vec![view.to_bed()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gff_record_view_basic() {
        let line = "chr1\tensembl\tgene\t1000\t2000\t.\t+\t.\tID=gene1;Name=TestGene";
        let view = GffRecordView::parse(line).unwrap();
        assert_eq!(view.seqid, "chr1");
        assert_eq!(view.source, "ensembl");
        assert_eq!(view.feature, "gene");
        assert_eq!(view.start, 1000);
        assert_eq!(view.end, 2000);
        assert_eq!(view.id(), Some("gene1"));
        assert_eq!(
            view.to_bed().to_string(),
            "chr1\t999\t2000\tgene1\t.\t+\tensembl\tgene\t.\tID=gene1;Name=TestGene"
        );
    }

    #[test]
    fn test_missing_id() {
        let line = "chr2\trefseq\texon\t5000\t5500\t100\t-\t0\tParent=tx1";
        let rec = GffRecordView::parse(line).unwrap().to_bed();
        assert_eq!(rec.id(), Some("."));
        assert_eq!(rec.columns[1], "100");
        assert_eq!(rec.columns[5], "0");
    }

    #[test]
    fn test_zero_length_insertion() {
        let line = "chr3\t.\tinsertion\t500\t500\t.\t+\t.\tID=ins1";
        let rec = GffRecordView::parse(line).unwrap().to_bed();
        assert_eq!((rec.start, rec.stop), (499, 500));
        assert_eq!(rec.columns[6], "ID=ins1;zero_length_insertion=True");
    }

    #[test]
    fn test_whitespace_trimmed() {
        let line = "  chrX\t.\tregion\t100\t200\t.\t.\t.\tID=r1  ";
        let view = GffRecordView::parse(line).unwrap();
        assert_eq!(view.seqid, "chrX");
        assert_eq!(view.attributes, "ID=r1");
    }

    #[test]
    fn test_wrong_field_count() {
        let result = GffRecordView::parse("chr1\tensembl\tgene\t1000\t2000");
        assert!(matches!(
            result,
            Err(GffParseError::WrongFieldCount { expected: 9, found: 5 })
        ));
    }

    #[test]
    fn test_invalid_range() {
        let result = GffRecordView::parse("chr1\t.\tgene\t2000\t1000\t.\t+\t.\t.");
        assert!(matches!(result, Err(GffParseError::InvalidRange { .. })));
    }

    #[test]
    fn test_mapper_malformed() {
        let mapper = GffMapper::new(GffOptions::default());
        let result = mapper.map_record(4, "chr1\tgene");
        assert!(matches!(
            result,
            Err(ConvertError::MalformedRecord { line: 4, .. })
        ));
    }

    #[test]
    fn test_classify() {
        let mapper = GffMapper::new(GffOptions::default());
        assert_eq!(mapper.classify(1, "##gff-version 3"), LineKind::Header);
        assert_eq!(mapper.classify(2, "#comment"), LineKind::Header);
        assert_eq!(mapper.classify(3, "##FASTA"), LineKind::End);
        assert_eq!(mapper.classify(4, ""), LineKind::Skip);
        assert_eq!(mapper.classify(5, "chr1\t.\tgene"), LineKind::Record);
    }
}
