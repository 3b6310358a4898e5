//! Splitting spliced alignments into per-block intervals
//!
//! Walks the CIGAR left to right. A block is written when an `N` is
//! reached (covering the bases up to the most recent match) and when a
//! match directly follows a `D` or `N`. Deletions only move the
//! coordinates. Blocks are numbered from 1 and the read id of each block
//! gets a `/<n>` suffix.

use crate::core::{Cigar, CigarOp, ConvertResult};

/// One 0-based, half-open interval produced from an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBlock {
    pub start: u64,
    pub stop: u64,
    /// Block number for split output, `None` for a whole unsplit read
    pub index: Option<usize>,
}

impl SplitBlock {
    /// Read id for this block (`qname` or `qname/<index>`)
    pub fn id(&self, qname: &str) -> String {
        match self.index {
            Some(n) => format!("{}/{}", qname, n),
            None => qname.to_string(),
        }
    }
}

/// Interval covered by the whole read, starting at 0-based `start`
pub fn whole_read(cigar: &Cigar, start: u64) -> ConvertResult<SplitBlock> {
    let stop = start
        .checked_add(cigar.read_length()?)
        .ok_or_else(|| cigar.length_overflow())?;
    Ok(SplitBlock {
        start,
        stop,
        index: None,
    })
}

/// Split an alignment starting at 0-based `start` on its `N`/`D` boundaries
///
/// When no split is triggered the result is one block spanning the whole
/// read.
pub fn split_read(cigar: &Cigar, start: u64) -> ConvertResult<Vec<SplitBlock>> {
    let mut blocks = Vec::new();
    let mut block_start = start;
    let mut block_stop = start;
    let mut index = 1usize;
    let mut previous: Option<CigarOp> = None;
    let advance = |pos: u64, len: u64| pos.checked_add(len).ok_or_else(|| cigar.length_overflow());

    for op in cigar.ops() {
        match *op {
            CigarOp::Match(len) | CigarOp::Equal(len) | CigarOp::Diff(len) => {
                block_stop = advance(block_start, len)?;
                if matches!(previous, Some(CigarOp::Deletion(_)) | Some(CigarOp::Skip(_))) {
                    blocks.push(SplitBlock {
                        start: block_start,
                        stop: block_stop,
                        index: Some(index),
                    });
                    block_start = block_stop;
                    index += 1;
                }
            }
            CigarOp::Skip(len) => {
                blocks.push(SplitBlock {
                    start: block_start,
                    stop: block_stop,
                    index: Some(index),
                });
                block_stop = advance(block_stop, len)?;
                block_start = block_stop;
                index += 1;
            }
            CigarOp::Deletion(len) => {
                block_stop = advance(block_stop, len)?;
                block_start = block_stop;
            }
            CigarOp::Insertion(_)
            | CigarOp::SoftClip(_)
            | CigarOp::HardClip(_)
            | CigarOp::Padding(_)
            | CigarOp::Unavailable(_) => {}
        }
        previous = Some(*op);
    }

    if index == 1 {
        return Ok(vec![whole_read(cigar, start)?]);
    }
    Ok(blocks)
}
