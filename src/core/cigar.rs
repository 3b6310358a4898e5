//! SAM CIGAR parsing and evaluation
//!
//! A CIGAR string is a run of `<length><op>` pairs, e.g. `36M2I10M100N25M`.
//! Valid operation codes are `MIDNSHP=X*`; a bare `*` means no CIGAR is
//! available for the read.

use crate::core::{ConvertError, ConvertResult};

/// All valid CIGAR operation codes
pub const VALID_CIGAR_OPS: &str = "MIDNSHP=X*";

/// CIGAR operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    Match(u64),
    Insertion(u64),
    Deletion(u64),
    Skip(u64),
    SoftClip(u64),
    HardClip(u64),
    Padding(u64),
    Equal(u64),
    Diff(u64),
    /// `*`: no alignment information
    Unavailable(u64),
}

impl CigarOp {
    /// Build an operation from its code, or `None` for an unknown code
    pub fn from_code(code: char, len: u64) -> Option<Self> {
        let op = match code {
            'M' => CigarOp::Match(len),
            'I' => CigarOp::Insertion(len),
            'D' => CigarOp::Deletion(len),
            'N' => CigarOp::Skip(len),
            'S' => CigarOp::SoftClip(len),
            'H' => CigarOp::HardClip(len),
            'P' => CigarOp::Padding(len),
            '=' => CigarOp::Equal(len),
            'X' => CigarOp::Diff(len),
            '*' => CigarOp::Unavailable(len),
            _ => return None,
        };
        Some(op)
    }

    pub fn code(&self) -> char {
        match self {
            CigarOp::Match(_) => 'M',
            CigarOp::Insertion(_) => 'I',
            CigarOp::Deletion(_) => 'D',
            CigarOp::Skip(_) => 'N',
            CigarOp::SoftClip(_) => 'S',
            CigarOp::HardClip(_) => 'H',
            CigarOp::Padding(_) => 'P',
            CigarOp::Equal(_) => '=',
            CigarOp::Diff(_) => 'X',
            CigarOp::Unavailable(_) => '*',
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            CigarOp::Match(n)
            | CigarOp::Insertion(n)
            | CigarOp::Deletion(n)
            | CigarOp::Skip(n)
            | CigarOp::SoftClip(n)
            | CigarOp::HardClip(n)
            | CigarOp::Padding(n)
            | CigarOp::Equal(n)
            | CigarOp::Diff(n)
            | CigarOp::Unavailable(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// M, D, N, = and X advance along the reference
    pub fn consumes_reference(&self) -> bool {
        matches!(
            self,
            CigarOp::Match(_) | CigarOp::Deletion(_) | CigarOp::Skip(_) | CigarOp::Equal(_) | CigarOp::Diff(_)
        )
    }

    /// M, I, S, = and X consume bases of SEQ
    pub fn consumes_query(&self) -> bool {
        matches!(
            self,
            CigarOp::Match(_) | CigarOp::Insertion(_) | CigarOp::SoftClip(_) | CigarOp::Equal(_) | CigarOp::Diff(_)
        )
    }
}

impl std::fmt::Display for CigarOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CigarOp::Unavailable(0) => write!(f, "*"),
            op => write!(f, "{}{}", op.len(), op.code()),
        }
    }
}

/// Parsed CIGAR string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cigar {
    ops: Vec<CigarOp>,
}

impl Cigar {
    /// Tokenize a CIGAR string
    ///
    /// Each token is a run of digits followed by exactly one code from
    /// [`VALID_CIGAR_OPS`]. A bare `*` is kept as a single no-op.
    pub fn parse(cigar: &str) -> ConvertResult<Self> {
        if cigar.is_empty() {
            return Err(ConvertError::EmptyCigar);
        }
        if cigar == "*" {
            return Ok(Self {
                ops: vec![CigarOp::Unavailable(0)],
            });
        }

        let invalid = |op: &str| ConvertError::InvalidCigarOperation {
            cigar: cigar.to_string(),
            op: op.to_string(),
        };

        let mut ops = Vec::with_capacity(cigar.len() / 2);
        let mut token_start = 0;
        for (pos, ch) in cigar.char_indices() {
            if ch.is_ascii_digit() {
                continue;
            }
            let digits = &cigar[token_start..pos];
            let token = &cigar[token_start..pos + ch.len_utf8()];
            if digits.is_empty() {
                return Err(invalid(token));
            }
            let len: u64 = digits.parse().map_err(|_| invalid(token))?;
            let op = CigarOp::from_code(ch, len).ok_or_else(|| invalid(token))?;
            ops.push(op);
            token_start = pos + ch.len_utf8();
        }

        // Trailing length without an operation code
        if token_start < cigar.len() {
            return Err(invalid(&cigar[token_start..]));
        }

        Ok(Self { ops })
    }

    pub fn ops(&self) -> &[CigarOp] {
        &self.ops
    }

    /// True for the `*` placeholder
    pub fn is_unavailable(&self) -> bool {
        matches!(self.ops.as_slice(), [CigarOp::Unavailable(_)])
    }

    /// Error for lengths or coordinates that do not fit in 64 bits
    pub fn length_overflow(&self) -> ConvertError {
        ConvertError::InvalidCigarOperation {
            cigar: self.to_string(),
            op: "operation lengths overflow".to_string(),
        }
    }

    fn checked_total(&self, counts: impl Fn(&CigarOp) -> bool) -> ConvertResult<u64> {
        self.ops
            .iter()
            .filter(|op| counts(*op))
            .try_fold(0u64, |total, op| total.checked_add(op.len()))
            .ok_or_else(|| self.length_overflow())
    }

    /// Number of reference bases covered (sum of M/D/N/=/X)
    pub fn read_length(&self) -> ConvertResult<u64> {
        if self.ops.is_empty() {
            return Err(ConvertError::EmptyCigar);
        }
        self.checked_total(CigarOp::consumes_reference)
    }

    /// Number of SEQ bases described (sum of M/I/S/=/X)
    pub fn query_length(&self) -> ConvertResult<u64> {
        self.checked_total(CigarOp::consumes_query)
    }

    /// Check that the read-consuming operations add up to `seq_len`
    pub fn validate_seq_length(&self, seq_len: u64) -> ConvertResult<()> {
        if self.ops.is_empty() {
            return Err(ConvertError::EmptyCigar);
        }
        let expected = self.query_length()?;
        if expected != seq_len {
            return Err(ConvertError::SeqCigarMismatch {
                expected,
                found: seq_len,
            });
        }
        Ok(())
    }

    /// Validate against a SEQ column; `*` (unknown sequence) always passes
    pub fn validate_seq(&self, seq: &str) -> ConvertResult<()> {
        if seq == "*" {
            return Ok(());
        }
        self.validate_seq_length(seq.len() as u64)
    }
}

impl std::fmt::Display for Cigar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for op in &self.ops {
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}
