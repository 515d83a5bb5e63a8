use crate::error::{ExtractorError, Result, SourceError};
use crate::scanner::{ExtensionParsing, FileFilter};
use crate::ui::signals::CancellationToken;
use regex::bytes::Regex;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Matches the usual `local@domain.tld` shape. Anything stricter is left to
/// whoever consumes the extracted list.
pub const DEFAULT_ADDRESS_PATTERN: &str =
    r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}";

/// Longest address a chunk boundary is guaranteed not to split (RFC 5321 path limit).
pub const MAX_ADDRESS_LEN: usize = 254;

pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
pub const MIN_BUFFER_SIZE: usize = 4096;

pub type AddressStream<'a> =
    Box<dyn Iterator<Item = std::result::Result<String, SourceError>> + Send + 'a>;

/// Produces the addresses found in one file.
///
/// Every call opens a fresh, lazily read stream. Implementations stop
/// yielding once `cancellation` is triggered.
pub trait AddressSource: Send + Sync {
    fn stream(
        &self,
        path: &Path,
        cancellation: &CancellationToken,
    ) -> std::result::Result<AddressStream<'_>, SourceError>;
}

pub struct RegexAddressSource {
    pattern: Regex,
    filter: FileFilter,
    buffer_size: usize,
}

impl RegexAddressSource {
    pub fn new(filter: FileFilter) -> Result<Self> {
        Self::with_pattern(DEFAULT_ADDRESS_PATTERN, filter)
    }

    pub fn with_pattern(pattern: &str, filter: FileFilter) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| ExtractorError::Config {
            message: format!("Invalid address pattern: {}", e),
        })?;

        Ok(Self {
            pattern,
            filter,
            buffer_size: DEFAULT_BUFFER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(MIN_BUFFER_SIZE);
        self
    }
}

impl AddressSource for RegexAddressSource {
    fn stream(
        &self,
        path: &Path,
        cancellation: &CancellationToken,
    ) -> std::result::Result<AddressStream<'_>, SourceError> {
        Ok(Box::new(self.open_stream(path, cancellation)?))
    }
}

impl RegexAddressSource {
    fn open_stream(
        &self,
        path: &Path,
        cancellation: &CancellationToken,
    ) -> std::result::Result<ChunkedAddressStream<'_>, SourceError> {
        if let ExtensionParsing::Skip { reason } = self.filter.parsing_for_path(path) {
            return Err(SourceError::Decode { reason });
        }

        let file = File::open(path)?;

        Ok(ChunkedAddressStream {
            reader: BufReader::with_capacity(self.buffer_size, file),
            pattern: &self.pattern,
            cancellation: cancellation.clone(),
            pending: VecDeque::new(),
            window: Vec::with_capacity(self.buffer_size + MAX_ADDRESS_LEN),
            finished: false,
        })
    }
}

/// Scans the file one buffer-sized chunk at a time. Up to `MAX_ADDRESS_LEN`
/// trailing bytes of each chunk are carried into the next scan, so an address
/// split across two reads is still found whole.
///
/// The window never holds more than one chunk plus that carry, regardless of
/// line length.
struct ChunkedAddressStream<'a> {
    reader: BufReader<File>,
    pattern: &'a Regex,
    cancellation: CancellationToken,
    pending: VecDeque<String>,
    window: Vec<u8>,
    finished: bool,
}

impl ChunkedAddressStream<'_> {
    fn scan_next_chunk(&mut self) -> io::Result<()> {
        let read = {
            let chunk = self.reader.fill_buf()?;
            self.window.extend_from_slice(chunk);
            chunk.len()
        };
        self.reader.consume(read);

        let at_eof = read == 0;
        // Matches starting before this point cannot grow with more input.
        let settled = if at_eof {
            self.window.len()
        } else {
            self.window.len().saturating_sub(MAX_ADDRESS_LEN)
        };

        let mut cut = settled;
        for found in self.pattern.find_iter(&self.window) {
            if found.start() >= settled {
                break;
            }
            self.pending
                .push_back(String::from_utf8_lossy(found.as_bytes()).into_owned());
            cut = cut.max(found.end());
        }

        self.window.drain(..cut);
        self.finished = at_eof;
        Ok(())
    }
}

impl Iterator for ChunkedAddressStream<'_> {
    type Item = std::result::Result<String, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancellation.is_cancelled() {
                return None;
            }

            if let Some(address) = self.pending.pop_front() {
                return Some(Ok(address));
            }

            if self.finished {
                return None;
            }

            match self.scan_next_chunk() {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(SourceError::Io(e)));
                }
            }
        }
    }
}
