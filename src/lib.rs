//! FastConvert2Bed - Genomic format to extended BED conversion
//!
//! Converts SAM/BAM, GFF3, PSL and VCF records into 0-based, half-open
//! extended BED, optionally piping the result through BEDOPS `sort-bed`
//! and `starch`.
//!
//! # Features
//!
//! - CIGAR parsing with read splitting on `N`/`D` operations
//! - Header lines preserved as sortable `_header` pseudo-records
//! - Parallel record mapping with rayon, input order preserved
//! - `sysexits.h` exit statuses for every failure class
//!
//! # Example
//!
//! ```ignore
//! use fast_convert2bed::formats::{GffMapper, GffOptions};
//! use fast_convert2bed::pipeline::convert_stream;
//!
//! let mut mapper = GffMapper::new(GffOptions::default());
//! let mut out = Vec::new();
//! let stats = convert_stream(input, &mut out, &mut mapper, 1)?;
//! ```

pub mod core;
pub mod formats;
pub mod pipeline;

// Re-export commonly used types
pub use crate::core::{
    sysexits, BedRecord, Cigar, CigarOp, ConvertError, ConvertResult, InputSource,
    PipelineFlags, PipelineOptions, SortOptions, StarchFormat,
};
pub use crate::formats::{ConversionStats, LineKind, RecordMapper};
pub use crate::pipeline::{convert_stream, ExternalTool, PipelineReport, StreamPipeline, ToolGateway};
