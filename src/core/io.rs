//! Input layer
//!
//! Opens the raw-record stream for a run: standard input, or a file read
//! buffered or memory-mapped depending on its size, with transparent
//! gzip/bzip2 decompression.

use crate::core::{ConvertError, ConvertResult, InputSource};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;

/// Read buffer for stdin, pipes and decompressors (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Write buffer towards stdout or a downstream stage (1MB)
pub const LARGE_BUFFER_SIZE: usize = 1024 * 1024;

/// Plain files at least this large are memory-mapped (100MB)
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Compression of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Plain,
    Gzip,
    Bzip2,
}

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Detect compression from the file extension, then from magic bytes
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => return Ok(CompressionFormat::Gzip),
        Some("bz2") => return Ok(CompressionFormat::Bzip2),
        _ => {}
    }

    let mut head = Vec::with_capacity(BZIP2_MAGIC.len());
    File::open(path)?
        .take(BZIP2_MAGIC.len() as u64)
        .read_to_end(&mut head)?;

    Ok(if head.starts_with(GZIP_MAGIC) {
        CompressionFormat::Gzip
    } else if head.starts_with(BZIP2_MAGIC) {
        CompressionFormat::Bzip2
    } else {
        CompressionFormat::Plain
    })
}

/// Uncompressed input file, memory-mapped when large
pub enum SmartReader {
    Buffered(BufReader<File>),
    Mapped(Cursor<Mmap>),
}

impl SmartReader {
    /// Open `path`, mapping it at or above [`MMAP_THRESHOLD`]
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() < MMAP_THRESHOLD {
            return Ok(SmartReader::Buffered(BufReader::with_capacity(
                DEFAULT_BUFFER_SIZE,
                file,
            )));
        }
        // SAFETY: input files are not expected to change during a run
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(SmartReader::Mapped(Cursor::new(mmap)))
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, SmartReader::Mapped(_))
    }

    fn inner(&mut self) -> &mut dyn BufRead {
        match self {
            SmartReader::Buffered(reader) => reader,
            SmartReader::Mapped(cursor) => cursor,
        }
    }
}

impl Read for SmartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner().read(buf)
    }
}

impl BufRead for SmartReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner().fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner().consume(amt)
    }
}

/// Open a text input file, decompressing it when needed
pub fn open_file(path: &Path) -> ConvertResult<Box<dyn BufRead + Send>> {
    if !path.exists() {
        return Err(ConvertError::InputNotFound(path.to_path_buf()));
    }
    let reader: Box<dyn BufRead + Send> = match detect_compression(path)? {
        CompressionFormat::Gzip => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            flate2::read::MultiGzDecoder::new(File::open(path)?),
        )),
        CompressionFormat::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            bzip2::read::MultiBzDecoder::new(File::open(path)?),
        )),
        CompressionFormat::Plain => {
            let reader = SmartReader::open(path)?;
            if reader.is_mapped() {
                debug!("Memory-mapped input {}", path.display());
            }
            Box::new(reader)
        }
    };
    Ok(reader)
}

/// Open the record stream for a run
pub fn open_input(source: &InputSource) -> ConvertResult<Box<dyn BufRead + Send>> {
    match source {
        InputSource::Stdin => Ok(Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            io::stdin(),
        ))),
        InputSource::File(path) => open_file(path),
    }
}

/// Lines of a reader with `\n` / `\r\n` endings removed
pub struct LineIterator<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for LineIterator<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
