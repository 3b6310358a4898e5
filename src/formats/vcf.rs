//! VCF format adapter
//!
//! Converts 1-based VCF v4 rows into 0-based, half-open extended BED:
//! #CHROM, POS - 1, POS, ID, QUAL, REF, ALT, FILTER, INFO, then the genotype
//! block (FORMAT and sample columns) when present.
//!
//! Rows listing several ALT alleles are written once per allele. With an
//! SNV, insertion or deletion filter active, the stop coordinate becomes
//! `start + |len(REF) - len(ALT)| + 1` and alleles outside the selected
//! class are dropped.

use super::{HeaderKeeper, LineKind, RecordMapper};
use crate::core::{tab_fields, BedRecord, ConvertError, ConvertResult};

/// Index of the first genotype column (FORMAT)
pub const VCF_GENOTYPE_START: usize = 8;

/// Symbolic allele such as `<DEL>` or `<CN0>`
pub fn is_symbolic(alt: &str) -> bool {
    alt.contains(['<', '>'])
}

pub fn is_snv(ref_allele: &str, alt: &str) -> bool {
    !is_symbolic(alt) && ref_allele.len() == alt.len()
}

pub fn is_insertion(ref_allele: &str, alt: &str) -> bool {
    !is_symbolic(alt) && ref_allele.len() < alt.len()
}

pub fn is_deletion(ref_allele: &str, alt: &str) -> bool {
    !is_symbolic(alt) && ref_allele.len() > alt.len()
}

/// Split an ALT column on commas outside `<...>` symbolic alleles
pub fn split_alt_alleles(alt: &str) -> Vec<&str> {
    let mut alleles = Vec::with_capacity(2);
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in alt.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                alleles.push(&alt[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    alleles.push(&alt[start..]);
    alleles
}

/// Variant class selected with `--snvs`, `--insertions` or `--deletions`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VariantFilter {
    #[default]
    All,
    Snvs,
    Insertions,
    Deletions,
}

impl VariantFilter {
    /// Build from the three mutually exclusive flags
    pub fn from_flags(snvs: bool, insertions: bool, deletions: bool) -> ConvertResult<Self> {
        match (snvs, insertions, deletions) {
            (false, false, false) => Ok(VariantFilter::All),
            (true, false, false) => Ok(VariantFilter::Snvs),
            (false, true, false) => Ok(VariantFilter::Insertions),
            (false, false, true) => Ok(VariantFilter::Deletions),
            _ => Err(ConvertError::Usage(
                "Cannot specify more than one filter parameter".into(),
            )),
        }
    }

    pub fn is_active(&self) -> bool {
        *self != VariantFilter::All
    }

    pub fn accepts(&self, ref_allele: &str, alt: &str) -> bool {
        match self {
            VariantFilter::All => true,
            VariantFilter::Snvs => is_snv(ref_allele, alt),
            VariantFilter::Insertions => is_insertion(ref_allele, alt),
            VariantFilter::Deletions => is_deletion(ref_allele, alt),
        }
    }
}

/// Positions of the mandatory columns in the `#CHROM` header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcfColumns {
    pub chrom: usize,
    pub pos: usize,
    pub id: usize,
    pub ref_allele: usize,
    pub alt: usize,
    pub qual: usize,
    pub filter: usize,
    pub info: usize,
    /// Number of columns named in the header
    pub width: usize,
}

impl VcfColumns {
    /// Resolve column positions from a `#CHROM` header line
    pub fn from_header(line: &str, line_no: usize) -> ConvertResult<Self> {
        let names = tab_fields(line);
        let find = |name: &str| -> ConvertResult<usize> {
            names.iter().position(|n| *n == name).ok_or_else(|| {
                ConvertError::HeaderMappingError {
                    line: line_no,
                    message: format!("header line has no {} column (perhaps bad delimiters?)", name),
                }
            })
        };
        Ok(Self {
            chrom: find("#CHROM")?,
            pos: find("POS")?,
            id: find("ID")?,
            ref_allele: find("REF")?,
            alt: find("ALT")?,
            qual: find("QUAL")?,
            filter: find("FILTER")?,
            info: find("INFO")?,
            width: names.len(),
        })
    }
}

/// Data row resolved through the header columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfRecordView<'a> {
    pub chrom: &'a str,
    /// Position (1-based)
    pub pos: u64,
    pub id: &'a str,
    pub qual: &'a str,
    pub ref_allele: &'a str,
    pub alt: &'a str,
    pub filter: &'a str,
    pub info: &'a str,
    /// FORMAT and sample columns
    pub genotypes: Vec<&'a str>,
}

impl<'a> VcfRecordView<'a> {
    pub fn parse(line: &'a str, columns: &VcfColumns, line_no: usize) -> ConvertResult<Self> {
        let fields = tab_fields(line);
        if fields.len() < columns.width {
            return Err(ConvertError::HeaderMappingError {
                line: line_no,
                message: format!(
                    "row has {} fields but header names {} (perhaps missing or bad delimiters?)",
                    fields.len(),
                    columns.width
                ),
            });
        }

        let pos_str = fields[columns.pos];
        let pos: u64 = pos_str
            .parse()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| ConvertError::malformed(line_no, format!("invalid POS '{}'", pos_str)))?;

        let genotypes = fields
            .get(VCF_GENOTYPE_START..)
            .map(|g| g.to_vec())
            .unwrap_or_default();

        Ok(Self {
            chrom: fields[columns.chrom],
            pos,
            id: fields[columns.id],
            qual: fields[columns.qual],
            ref_allele: fields[columns.ref_allele],
            alt: fields[columns.alt],
            filter: fields[columns.filter],
            info: fields[columns.info],
            genotypes,
        })
    }

    /// ALT alleles in their original order
    pub fn alleles(&self) -> Vec<&'a str> {
        split_alt_alleles(self.alt)
    }

    /// BED record for one ALT allele, or `None` when `filter` rejects it
    pub fn allele_to_bed(&self, alt: &str, filter: VariantFilter) -> Option<BedRecord> {
        if !filter.accepts(self.ref_allele, alt) {
            return None;
        }
        let start = self.pos - 1;
        // Filtered runs widen the interval by the allele length difference
        let stop = if filter.is_active() {
            start.saturating_add(self.ref_allele.len().abs_diff(alt.len()) as u64 + 1)
        } else {
            self.pos
        };

        let mut columns = vec![
            self.id.to_string(),
            self.qual.to_string(),
            self.ref_allele.to_string(),
            alt.to_string(),
            self.filter.to_string(),
            self.info.to_string(),
        ];
        let genotypes = self.genotypes.join("\t");
        if !genotypes.is_empty() {
            columns.push(genotypes);
        }
        Some(BedRecord::new(self.chrom, start, stop, columns))
    }

    /// One BED record per accepted ALT allele
    pub fn to_bed(&self, filter: VariantFilter) -> Vec<BedRecord> {
        self.alleles()
            .into_iter()
            .filter_map(|alt| self.allele_to_bed(alt, filter))
            .collect()
    }
}

/// VCF conversion settings
#[derive(Debug, Clone, Default)]
pub struct VcfOptions {
    /// Keep `##` metadata and the `#CHROM` line as pseudo-records
    pub keep_header: bool,
    pub filter: VariantFilter,
}

/// VCF record mapper
#[derive(Debug, Clone)]
pub struct VcfMapper {
    filter: VariantFilter,
    headers: HeaderKeeper,
    columns: Option<VcfColumns>,
}

impl VcfMapper {
    pub fn new(options: VcfOptions) -> Self {
        Self {
            filter: options.filter,
            headers: HeaderKeeper::new(options.keep_header),
            columns: None,
        }
    }

    /// Column layout captured from the `#CHROM` line
    pub fn columns(&self) -> Option<&VcfColumns> {
        self.columns.as_ref()
    }
}

impl RecordMapper for VcfMapper {
    fn format_name(&self) -> &'static str {
        "VCF"
    }

    fn classify(&self, _line_no: usize, line: &str) -> LineKind {
        if line.is_empty() {
            LineKind::Skip
        } else if line.starts_with('#') {
            LineKind::Header
        } else {
            LineKind::Record
        }
    }

    fn header(&mut self, line_no: usize, line: &str) -> ConvertResult<Option<BedRecord>> {
        if !line.starts_with("##") {
            self.columns = Some(VcfColumns::from_header(line, line_no)?);
        }
        Ok(self.headers.record(line))
    }

    fn map_record(&self, line_no: usize, line: &str) -> ConvertResult<Vec<BedRecord>> {
        let columns = self.columns.as_ref().ok_or_else(|| ConvertError::HeaderMappingError {
            line: line_no,
            message: "data row before #CHROM header line".into(),
        })?;
        let view = VcfRecordView::parse(line, columns, line_no)?;
        Ok(view.to_bed(self.filter))
    }
}
