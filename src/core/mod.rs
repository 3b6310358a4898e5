//! Core conversion building blocks
//!
//! Errors, run configuration, the CIGAR state machine, input handling
//! and the extended BED record shared by every format adapter.

pub mod cigar;
pub mod config;
mod error;
pub mod io;
mod record;
pub mod split;

pub use cigar::{Cigar, CigarOp, VALID_CIGAR_OPS};
pub use config::{
    InputSource, PipelineFlags, PipelineOptions, SortOptions, StarchFormat, DEFAULT_MAX_MEM,
};
pub use error::{sysexits, ConvertError, ConvertResult};
pub use io::{
    detect_compression, open_file, open_input, CompressionFormat, LineIterator, SmartReader,
    DEFAULT_BUFFER_SIZE, LARGE_BUFFER_SIZE, MMAP_THRESHOLD,
};
pub use record::{tab_fields, BedRecord, HEADER_CHROM};
pub use split::{split_read, whole_read, SplitBlock};
