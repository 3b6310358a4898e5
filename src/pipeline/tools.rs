//! External programs used by the pipeline
//!
//! `sort-bed` and `starch` come from BEDOPS, `samtools` decodes BAM.
//! Each command is built from typed options, never from a shell string.

use crate::core::{ConvertError, ConvertResult, InputSource, SortOptions, StarchFormat};
use log::debug;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// External binary a pipeline stage runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalTool {
    SortBed,
    Starch,
    Samtools,
}

impl ExternalTool {
    pub fn binary(&self) -> &'static str {
        match self {
            ExternalTool::SortBed => "sort-bed",
            ExternalTool::Starch => "starch",
            ExternalTool::Samtools => "samtools",
        }
    }
}

impl fmt::Display for ExternalTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Finds external binaries on a search path and builds their commands
#[derive(Debug, Clone, Default)]
pub struct ToolGateway {
    search_path: Vec<PathBuf>,
}

impl ToolGateway {
    /// Search the directories listed in `PATH`
    pub fn from_env() -> Self {
        let search_path = env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self { search_path }
    }

    pub fn with_search_path<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_path: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// First executable named after `tool` on the search path
    pub fn locate(&self, tool: ExternalTool) -> Option<PathBuf> {
        self.search_path
            .iter()
            .map(|dir| dir.join(tool.binary()))
            .find(|candidate| is_executable(candidate))
    }

    /// Fail with the first tool that cannot be found
    pub fn require(&self, tools: &[ExternalTool]) -> ConvertResult<()> {
        for tool in tools {
            match self.locate(*tool) {
                Some(path) => debug!("Found {} at {}", tool, path.display()),
                None => {
                    return Err(ConvertError::MissingExternalTool(tool.binary().to_string()))
                }
            }
        }
        Ok(())
    }

    fn command(&self, tool: ExternalTool) -> ConvertResult<Command> {
        self.locate(tool)
            .map(Command::new)
            .ok_or_else(|| ConvertError::MissingExternalTool(tool.binary().to_string()))
    }

    /// `sort-bed --max-mem <mem> [--tmpdir <dir>] -`
    pub fn sort_command(&self, options: &SortOptions) -> ConvertResult<Command> {
        let mut cmd = self.command(ExternalTool::SortBed)?;
        cmd.arg("--max-mem").arg(&options.max_mem);
        if let Some(dir) = &options.tmpdir {
            cmd.arg("--tmpdir").arg(dir);
        }
        cmd.arg("-");
        Ok(cmd)
    }

    /// `starch --bzip2|--gzip -`
    pub fn archive_command(&self, format: StarchFormat) -> ConvertResult<Command> {
        let mut cmd = self.command(ExternalTool::Starch)?;
        cmd.arg(format.flag()).arg("-");
        Ok(cmd)
    }

    /// `samtools view -h <path|->`
    pub fn view_command(&self, input: &InputSource) -> ConvertResult<Command> {
        let mut cmd = self.command(ExternalTool::Samtools)?;
        cmd.arg("view").arg("-h");
        match input {
            InputSource::Stdin => cmd.arg("-"),
            InputSource::File(path) => cmd.arg(path),
        };
        Ok(cmd)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
