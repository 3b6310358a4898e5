//! Per-run pipeline configuration
//!
//! Built once from command-line flags and read-only afterwards. The
//! format-specific options live next to their mappers in `formats`.

use crate::core::{ConvertError, ConvertResult};
use clap::ValueEnum;
use std::path::PathBuf;

/// Memory reserved for `sort-bed` when not set explicitly
pub const DEFAULT_MAX_MEM: &str = "2G";

/// Backend compression of the Starch archive stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StarchFormat {
    #[default]
    Bzip2,
    Gzip,
}

impl StarchFormat {
    /// Flag passed to `starch`
    pub fn flag(&self) -> &'static str {
        match self {
            StarchFormat::Bzip2 => "--bzip2",
            StarchFormat::Gzip => "--gzip",
        }
    }
}

/// Settings of the `sort-bed` stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOptions {
    pub max_mem: String,
    pub tmpdir: Option<PathBuf>,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            max_mem: DEFAULT_MAX_MEM.to_string(),
            tmpdir: None,
        }
    }
}

/// Where raw records are read from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputSource {
    #[default]
    Stdin,
    File(PathBuf),
}

/// Stage layout of one conversion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// `None` when sorting is disabled
    pub sort: Option<SortOptions>,
    /// `Some` when output goes through `starch`
    pub archive: Option<StarchFormat>,
    /// Worker threads for record mapping
    pub threads: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sort: Some(SortOptions::default()),
            archive: None,
            threads: 1,
        }
    }
}

/// Raw pipeline flags as given on the command line
#[derive(Debug, Clone, Default)]
pub struct PipelineFlags {
    pub do_not_sort: bool,
    pub max_mem: Option<String>,
    pub sort_tmpdir: Option<PathBuf>,
    pub starch: bool,
    pub starch_format: Option<StarchFormat>,
    pub threads: usize,
}

impl PipelineOptions {
    /// Validate flag combinations and build the options
    pub fn from_flags(flags: PipelineFlags) -> ConvertResult<Self> {
        if flags.max_mem.is_some() && flags.do_not_sort {
            return Err(ConvertError::Usage(
                "Cannot specify both --do-not-sort and --max-mem parameters".into(),
            ));
        }
        if flags.sort_tmpdir.is_some() && flags.max_mem.is_none() {
            return Err(ConvertError::Usage(
                "Cannot specify --sort-tmpdir parameter without specifying --max-mem parameter".into(),
            ));
        }
        if let Some(dir) = &flags.sort_tmpdir {
            if std::fs::read_dir(dir).is_err() {
                return Err(ConvertError::Usage(
                    "Temporary sort data directory specified with --sort-tmpdir is a file, is non-existent, or its permissions do not allow access".into(),
                ));
            }
        }
        if flags.starch_format.is_some() && !flags.starch {
            return Err(ConvertError::Usage(
                "Cannot specify --starch-format without --starch".into(),
            ));
        }

        let sort = if flags.do_not_sort {
            None
        } else {
            Some(SortOptions {
                max_mem: flags.max_mem.unwrap_or_else(|| DEFAULT_MAX_MEM.to_string()),
                tmpdir: flags.sort_tmpdir,
            })
        };
        let archive = if flags.starch {
            Some(flags.starch_format.unwrap_or_default())
        } else {
            None
        };

        Ok(Self {
            sort,
            archive,
            threads: flags.threads.max(1),
        })
    }

    pub fn sorts(&self) -> bool {
        self.sort.is_some()
    }
}
