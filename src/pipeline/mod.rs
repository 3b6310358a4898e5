//! Conversion driver and external stage wiring
//!
//! [`convert_stream`] reads one input stream through a [`RecordMapper`]
//! and writes extended BED lines in input order. [`StreamPipeline`] runs it
//! on its own thread, feeding `sort-bed` and `starch` child processes.

mod stream;
pub mod tools;

pub use stream::{PipelineReport, StreamPipeline};
pub use tools::{ExternalTool, ToolGateway};

use crate::core::{BedRecord, ConvertError, ConvertResult, LineIterator};
use crate::formats::{ConversionStats, LineKind, RecordMapper};
use log::debug;
use rayon::prelude::*;
use std::io::{self, BufRead, Write};

/// Records mapped per worker thread between writes
pub const CHUNK_SIZE: usize = 10000;

/// Convert every line of `reader` into BED lines on `writer`
///
/// With `threads > 1` data records are mapped in parallel chunks; output
/// order still follows input order. Headers are handled in sequence and
/// flush any pending records first. The first failing record (in input
/// order) aborts the run after everything before it has been written.
pub fn convert_stream<R, W, M>(
    reader: R,
    writer: &mut W,
    mapper: &mut M,
    threads: usize,
) -> ConvertResult<ConversionStats>
where
    R: BufRead,
    W: Write,
    M: RecordMapper,
{
    let pool = if threads > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| {
                    ConvertError::Internal(format!("Failed to create thread pool: {}", e))
                })?,
        )
    } else {
        None
    };
    let batch_limit = CHUNK_SIZE * threads.max(1);

    let mut stats = ConversionStats::default();
    let mut pending: Vec<(usize, String)> = Vec::new();

    for (idx, line) in LineIterator::new(reader).enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| read_error(line_no, e))?;
        stats.lines += 1;

        match mapper.classify(line_no, &line) {
            LineKind::Skip => {}
            LineKind::End => {
                debug!("{}: end of data at line {}", mapper.format_name(), line_no);
                break;
            }
            LineKind::Header => {
                flush_pending(&mut pending, writer, &*mapper, pool.as_ref(), &mut stats)?;
                stats.headers += 1;
                if let Some(rec) = mapper.header(line_no, &line)? {
                    rec.write_to(writer)?;
                    stats.emitted += 1;
                }
            }
            LineKind::Record => match &pool {
                Some(_) => {
                    pending.push((line_no, line));
                    if pending.len() >= batch_limit {
                        flush_pending(&mut pending, writer, &*mapper, pool.as_ref(), &mut stats)?;
                    }
                }
                None => {
                    let records = mapper.map_record(line_no, &line)?;
                    write_records(records, writer, &mut stats)?;
                }
            },
        }
    }

    flush_pending(&mut pending, writer, &*mapper, pool.as_ref(), &mut stats)?;
    writer.flush()?;
    if stats.dropped > 0 {
        debug!(
            "{}: {} record(s) produced no output",
            mapper.format_name(),
            stats.dropped
        );
    }
    Ok(stats)
}

fn read_error(line_no: usize, err: io::Error) -> ConvertError {
    if err.kind() == io::ErrorKind::InvalidData {
        ConvertError::malformed(line_no, "input is not valid UTF-8 text")
    } else {
        ConvertError::Io(err)
    }
}

fn write_records<W: Write>(
    records: Vec<BedRecord>,
    writer: &mut W,
    stats: &mut ConversionStats,
) -> ConvertResult<()> {
    stats.records += 1;
    if records.is_empty() {
        stats.dropped += 1;
    }
    for rec in &records {
        rec.write_to(writer)?;
        stats.emitted += 1;
    }
    Ok(())
}

fn flush_pending<W, M>(
    pending: &mut Vec<(usize, String)>,
    writer: &mut W,
    mapper: &M,
    pool: Option<&rayon::ThreadPool>,
    stats: &mut ConversionStats,
) -> ConvertResult<()>
where
    W: Write,
    M: RecordMapper,
{
    if pending.is_empty() {
        return Ok(());
    }

    let results: Vec<ConvertResult<Vec<BedRecord>>> = match pool {
        Some(pool) => pool.install(|| {
            pending
                .par_iter()
                .with_min_len(CHUNK_SIZE / 10)
                .map(|(line_no, line)| mapper.map_record(*line_no, line))
                .collect()
        }),
        None => pending
            .iter()
            .map(|(line_no, line)| mapper.map_record(*line_no, line))
            .collect(),
    };
    pending.clear();

    for result in results {
        write_records(result?, writer, stats)?;
    }
    Ok(())
}
