//! Concurrent conversion pipeline
//!
//! Stage layout, upstream to downstream:
//!
//! ```text
//! [samtools view -h] -> convert (thread) -> [sort-bed] -> [starch] -> stdout
//! ```
//!
//! Every stage is a separate process or thread joined by pipes. A stage
//! finishes when its input reaches end-of-stream and closes its output,
//! which shuts down the next stage in turn. All children are waited on
//! before the run reports its status.

use super::convert_stream;
use super::tools::{ExternalTool, ToolGateway};
use crate::core::{
    open_input, ConvertError, ConvertResult, InputSource, PipelineOptions, DEFAULT_BUFFER_SIZE,
    LARGE_BUFFER_SIZE,
};
use crate::formats::{ConversionStats, RecordMapper};
use log::{debug, info, warn};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub stats: ConversionStats,
    /// External stages that ran, upstream first
    pub stages: Vec<ExternalTool>,
}

type Stage = (ExternalTool, Child);

/// One conversion run from an input source to stdout
#[derive(Debug, Clone)]
pub struct StreamPipeline {
    options: PipelineOptions,
    input: InputSource,
    bam: bool,
    gateway: ToolGateway,
}

impl StreamPipeline {
    pub fn new(options: PipelineOptions, input: InputSource) -> Self {
        Self {
            options,
            input,
            bam: false,
            gateway: ToolGateway::from_env(),
        }
    }

    /// Decode the input as BAM through `samtools view -h`
    pub fn bam_input(mut self) -> Self {
        self.bam = true;
        self
    }

    /// Look up external tools somewhere other than `PATH`
    pub fn with_gateway(mut self, gateway: ToolGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// External stages this run needs, upstream first
    pub fn stages(&self) -> Vec<ExternalTool> {
        let mut stages = Vec::with_capacity(3);
        if self.bam {
            stages.push(ExternalTool::Samtools);
        }
        if self.options.sorts() {
            stages.push(ExternalTool::SortBed);
        }
        if self.options.archive.is_some() {
            stages.push(ExternalTool::Starch);
        }
        stages
    }

    /// Checks made before any input is read or any process is started
    pub fn check(&self, format_name: &str) -> ConvertResult<()> {
        let stages = self.stages();
        if !cfg!(unix) && !stages.is_empty() {
            return Err(ConvertError::UnsupportedEnvironment(
                "external sort and archive stages need a Unix host".into(),
            ));
        }
        match &self.input {
            InputSource::Stdin if !stdin_is_data_source() => {
                return Err(ConvertError::NoInputAvailable(format_name.to_string()));
            }
            InputSource::File(path) if !path.exists() => {
                return Err(ConvertError::InputNotFound(path.clone()));
            }
            _ => {}
        }
        self.gateway.require(&stages)
    }

    /// Run the pipeline to completion
    ///
    /// A data error from the converter takes precedence over failed
    /// external stages, which take precedence over converter I/O errors
    /// (usually a broken pipe left behind by the failed stage).
    pub fn run<M>(&self, mapper: M) -> ConvertResult<PipelineReport>
    where
        M: RecordMapper + Send + 'static,
    {
        self.check(mapper.format_name())?;
        debug!(
            "{}: stages {:?}, {} thread(s)",
            mapper.format_name(),
            self.stages(),
            self.options.threads
        );

        let mut children: Vec<Stage> = Vec::with_capacity(3);
        let (reader, sink) = match self.wire(&mut children) {
            Ok(ends) => ends,
            Err(e) => {
                reap(children);
                return Err(e);
            }
        };

        let threads = self.options.threads;
        let converter = thread::Builder::new()
            .name("convert".into())
            .spawn(move || {
                let mut mapper = mapper;
                let mut sink = sink;
                convert_stream(reader, &mut sink, &mut mapper, threads)
            });
        // The converter thread owns the sink; its exit closes the pipe
        let converted = match converter {
            Ok(handle) => handle.join().unwrap_or_else(|_| {
                Err(ConvertError::Internal("converter thread panicked".into()))
            }),
            Err(e) => Err(ConvertError::Io(e)),
        };

        let stages: Vec<ExternalTool> = children.iter().map(|(tool, _)| *tool).collect();
        let failed = wait_all(children);

        match converted {
            Err(e) if !matches!(e, ConvertError::Io(_)) => Err(e),
            _ if !failed.is_empty() => Err(ConvertError::StageFailed(failed)),
            Err(e) => Err(e),
            Ok(stats) => {
                info!(
                    "Converted {} record(s): {} line(s) written, {} dropped, {} header line(s)",
                    stats.records, stats.emitted, stats.dropped, stats.headers
                );
                Ok(PipelineReport { stats, stages })
            }
        }
    }

    /// Start the external stages and return the converter's two ends
    fn wire(
        &self,
        children: &mut Vec<Stage>,
    ) -> ConvertResult<(Box<dyn BufRead + Send>, Box<dyn Write + Send>)> {
        let reader: Box<dyn BufRead + Send> = if self.bam {
            let mut cmd = self.gateway.view_command(&self.input)?;
            cmd.stdin(Stdio::inherit()).stdout(Stdio::piped());
            let mut child = spawn(&mut cmd, ExternalTool::Samtools)?;
            let out = child.stdout.take();
            children.push((ExternalTool::Samtools, child));
            let out = out.ok_or_else(|| missing_pipe(ExternalTool::Samtools))?;
            Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, out))
        } else {
            open_input(&self.input)?
        };

        // Downstream first so each stage can hand its stdin to the one above
        let mut archive_in: Option<ChildStdin> = None;
        if let Some(format) = self.options.archive {
            let mut cmd = self.gateway.archive_command(format)?;
            cmd.stdin(Stdio::piped()).stdout(Stdio::inherit());
            let mut child = spawn(&mut cmd, ExternalTool::Starch)?;
            archive_in = child.stdin.take();
            children.push((ExternalTool::Starch, child));
            if archive_in.is_none() {
                return Err(missing_pipe(ExternalTool::Starch));
            }
        }

        let sink: Box<dyn Write + Send> = if let Some(sort) = &self.options.sort {
            let mut child = {
                let mut cmd = self.gateway.sort_command(sort)?;
                cmd.stdin(Stdio::piped());
                match archive_in.take() {
                    Some(pipe) => cmd.stdout(Stdio::from(pipe)),
                    None => cmd.stdout(Stdio::inherit()),
                };
                spawn(&mut cmd, ExternalTool::SortBed)?
            };
            // `cmd` is gone, so the starch stdin is now held by sort-bed only
            let input = child.stdin.take();
            let position = children.len().saturating_sub(usize::from(self.options.archive.is_some()));
            children.insert(position, (ExternalTool::SortBed, child));
            let input = input.ok_or_else(|| missing_pipe(ExternalTool::SortBed))?;
            Box::new(BufWriter::with_capacity(LARGE_BUFFER_SIZE, input))
        } else if let Some(pipe) = archive_in {
            Box::new(BufWriter::with_capacity(LARGE_BUFFER_SIZE, pipe))
        } else {
            Box::new(BufWriter::with_capacity(LARGE_BUFFER_SIZE, io::stdout()))
        };

        Ok((reader, sink))
    }
}

/// Standard input must be redirected from a pipe or a regular file
#[cfg(unix)]
fn stdin_is_data_source() -> bool {
    use std::fs::File;
    use std::os::fd::AsFd;
    use std::os::unix::fs::FileTypeExt;

    io::stdin()
        .as_fd()
        .try_clone_to_owned()
        .map(File::from)
        .and_then(|stdin| stdin.metadata())
        .map(|meta| {
            let kind = meta.file_type();
            kind.is_fifo() || kind.is_file()
        })
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn stdin_is_data_source() -> bool {
    use std::io::IsTerminal;
    !io::stdin().is_terminal()
}

fn spawn(cmd: &mut Command, tool: ExternalTool) -> ConvertResult<Child> {
    debug!("Starting {:?}", cmd);
    cmd.spawn().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConvertError::MissingExternalTool(tool.binary().to_string()),
        _ => ConvertError::Io(e),
    })
}

fn missing_pipe(tool: ExternalTool) -> ConvertError {
    ConvertError::Internal(format!("{} was started without a pipe", tool))
}

/// Wait on every child; returns the names of stages that failed
fn wait_all(children: Vec<Stage>) -> Vec<String> {
    let mut failed = Vec::new();
    for (tool, mut child) in children {
        match child.wait() {
            Ok(status) if status.success() => debug!("{} finished", tool),
            Ok(status) => {
                warn!("{} exited with {}", tool, status);
                failed.push(tool.binary().to_string());
            }
            Err(e) => {
                warn!("Could not wait on {}: {}", tool, e);
                failed.push(tool.binary().to_string());
            }
        }
    }
    failed
}

/// Collect children started before setup failed
fn reap(children: Vec<Stage>) {
    for (tool, mut child) in children {
        drop(child.stdin.take());
        drop(child.stdout.take());
        if let Err(e) = child.wait() {
            warn!("Could not wait on {}: {}", tool, e);
        }
    }
}
