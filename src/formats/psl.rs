//! PSL format adapter
//!
//! PSL coordinates are already 0-based, half-open, so conversion is a
//! column permutation: tName, tStart, tEnd, qName, qSize and strand come
//! first, the remaining fifteen PSL columns follow in order. Reversing the
//! permutation gives back headerless PSL.

use super::{HeaderKeeper, LineKind, RecordMapper};
use crate::core::{tab_fields, BedRecord, ConvertError, ConvertResult};

/// Number of PSL columns
pub const PSL_COLUMNS: usize = 21;

/// Lines in a BLAT PSL header block
pub const PSL_HEADER_LINES: usize = 5;

/// Parsed PSL alignment line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PslRecordView<'a> {
    pub matches: u64,
    pub mismatches: u64,
    pub rep_matches: u64,
    pub n_count: u64,
    pub q_num_insert: u64,
    pub q_base_insert: u64,
    pub t_num_insert: u64,
    pub t_base_insert: u64,
    pub strand: &'a str,
    pub q_name: &'a str,
    pub q_size: u64,
    pub q_start: u64,
    pub q_end: u64,
    pub t_name: &'a str,
    pub t_size: u64,
    pub t_start: u64,
    pub t_end: u64,
    pub block_count: u64,
    pub block_sizes: &'a str,
    pub q_starts: &'a str,
    pub t_starts: &'a str,
}

impl<'a> PslRecordView<'a> {
    pub fn parse(line: &'a str, line_no: usize) -> ConvertResult<Self> {
        let fields = tab_fields(line);
        if fields.len() < PSL_COLUMNS {
            return Err(ConvertError::malformed(
                line_no,
                format!(
                    "expected {} PSL columns, found {} (if input is headered, use --headered)",
                    PSL_COLUMNS,
                    fields.len()
                ),
            ));
        }

        let number = |idx: usize, name: &str| -> ConvertResult<u64> {
            fields[idx].parse().map_err(|_| {
                ConvertError::malformed(
                    line_no,
                    format!("invalid {} '{}' (if input is headered, use --headered)", name, fields[idx]),
                )
            })
        };

        let view = Self {
            matches: number(0, "matches")?,
            mismatches: number(1, "misMatches")?,
            rep_matches: number(2, "repMatches")?,
            n_count: number(3, "nCount")?,
            q_num_insert: number(4, "qNumInsert")?,
            q_base_insert: number(5, "qBaseInsert")?,
            t_num_insert: number(6, "tNumInsert")?,
            t_base_insert: number(7, "tBaseInsert")?,
            strand: fields[8],
            q_name: fields[9],
            q_size: number(10, "qSize")?,
            q_start: number(11, "qStart")?,
            q_end: number(12, "qEnd")?,
            t_name: fields[13],
            t_size: number(14, "tSize")?,
            t_start: number(15, "tStart")?,
            t_end: number(16, "tEnd")?,
            block_count: number(17, "blockCount")?,
            block_sizes: fields[18],
            q_starts: fields[19],
            t_starts: fields[20],
        };

        if view.t_start >= view.t_end {
            return Err(ConvertError::malformed(
                line_no,
                format!(
                    "start coordinate ({}) must be less than end coordinate ({})",
                    view.t_start, view.t_end
                ),
            ));
        }
        Ok(view)
    }

    pub fn to_bed(&self) -> BedRecord {
        BedRecord::new(
            self.t_name,
            self.t_start,
            self.t_end,
            vec![
                self.q_name.to_string(),
                self.q_size.to_string(),
                self.strand.to_string(),
                self.matches.to_string(),
                self.mismatches.to_string(),
                self.rep_matches.to_string(),
                self.n_count.to_string(),
                self.q_num_insert.to_string(),
                self.q_base_insert.to_string(),
                self.t_num_insert.to_string(),
                self.t_base_insert.to_string(),
                self.q_start.to_string(),
                self.q_end.to_string(),
                self.t_size.to_string(),
                self.block_count.to_string(),
                self.block_sizes.to_string(),
                self.q_starts.to_string(),
                self.t_starts.to_string(),
            ],
        )
    }
}

/// PSL conversion settings
#[derive(Debug, Clone, Default)]
pub struct PslOptions {
    /// Keep the header block as pseudo-records (needs `headered`)
    pub keep_header: bool,
    /// Input starts with the 5-line BLAT header
    pub headered: bool,
}

/// PSL record mapper
#[derive(Debug, Clone)]
pub struct PslMapper {
    headered: bool,
    headers: HeaderKeeper,
}

impl PslMapper {
    pub fn new(options: PslOptions) -> Self {
        Self {
            headered: options.headered,
            headers: HeaderKeeper::new(options.keep_header && options.headered),
        }
    }
}

impl RecordMapper for PslMapper {
    fn format_name(&self) -> &'static str {
        "PSL"
    }

    fn classify(&self, line_no: usize, line: &str) -> LineKind {
        if self.headered && line_no <= PSL_HEADER_LINES {
            LineKind::Header
        } else if line.is_empty() {
            LineKind::Skip
        } else {
            LineKind::Record
        }
    }

    fn header(&mut self, _line_no: usize, line: &str) -> ConvertResult<Option<BedRecord>> {
        Ok(self.headers.record(line))
    }

    fn map_record(&self, line_no: usize, line: &str) -> ConvertResult<Vec<BedRecord>> {
        Ok(vec![PslRecordView::parse(line, line_no)?.to_bed()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "59\t9\t0\t0\t1\t823\t1\t96\t+-\tS1\t1648\t0\t891\tchr4\t191154276\t100\t200\t2\t448,443,\t0,1205,\t1020,1099,";

    #[test]
    fn test_psl_to_bed() {
        let rec = PslRecordView::parse(LINE, 1).unwrap().to_bed();
        assert_eq!(rec.column_count(), 21);
        assert_eq!(
            rec.to_string(),
            "chr4\t100\t200\tS1\t1648\t+-\t59\t9\t0\t0\t1\t823\t1\t96\t0\t891\t191154276\t2\t448,443,\t0,1205,\t1020,1099,"
        );
    }

    #[test]
    fn test_numbers_canonicalised() {
        let line = LINE.replacen("59\t", "059\t", 1);
        let rec = PslRecordView::parse(&line, 1).unwrap().to_bed();
        assert_eq!(rec.columns[3], "59");
    }

    #[test]
    fn test_inverted_coordinates() {
        let line = LINE.replace("\t100\t200\t", "\t200\t100\t");
        assert!(matches!(
            PslRecordView::parse(&line, 3),
            Err(ConvertError::MalformedRecord { line: 3, .. })
        ));
    }

    #[test]
    fn test_non_numeric() {
        let result = PslRecordView::parse("psLayout version 3", 1);
        assert!(matches!(result, Err(ConvertError::MalformedRecord { .. })));
        let line = LINE.replacen("59", "x", 1);
        assert!(matches!(
            PslRecordView::parse(&line, 1),
            Err(ConvertError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_headered_classification() {
        let mapper = PslMapper::new(PslOptions {
            headered: true,
            keep_header: false,
        });
        for n in 1..=5 {
            assert_eq!(mapper.classify(n, "psLayout version 3"), LineKind::Header);
        }
        assert_eq!(mapper.classify(6, LINE), LineKind::Record);

        let plain = PslMapper::new(PslOptions::default());
        assert_eq!(plain.classify(1, LINE), LineKind::Record);
    }

    #[test]
    fn test_keep_header_needs_headered() {
        let mut mapper = PslMapper::new(PslOptions {
            headered: false,
            keep_header: true,
        });
        assert!(mapper.header(1, "psLayout").unwrap().is_none());

        let mut kept = PslMapper::new(PslOptions {
            headered: true,
            keep_header: true,
        });
        let rec = kept.header(1, "psLayout version 3").unwrap().unwrap();
        assert_eq!(rec.to_string(), "_header\t0\t1\tpsLayout version 3");
    }
}
