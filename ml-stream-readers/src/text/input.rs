//! Line inputs backing the text readers

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use memmap2::{Mmap, MmapOptions};
use ml_stream_core::{Error, Result};

/// A source of text lines
pub trait LineInput: Send + 'static {
    /// Read the next line into `buf` without its terminator
    ///
    /// Returns `false` once the input is exhausted.
    fn next_line(&mut self, buf: &mut String) -> Result<bool>;

    /// Whether the input can be rewound
    fn is_seekable(&self) -> bool {
        false
    }

    /// Move back to the first line
    fn rewind(&mut self) -> Result<()> {
        Err(Error::NotImplemented("rewind is not supported by this input".into()))
    }
}

/// Lines read from any [`Read`] implementation; forward only
#[derive(Debug)]
pub struct StreamInput<R> {
    reader: BufReader<R>,
}

impl<R: Read> StreamInput<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }
}

impl<R: Read + Send + 'static> LineInput for StreamInput<R> {
    fn next_line(&mut self, buf: &mut String) -> Result<bool> {
        buf.clear();
        if self.reader.read_line(buf)? == 0 {
            return Ok(false);
        }

        let trimmed = buf.trim_end_matches(&['\n', '\r'][..]).len();
        buf.truncate(trimmed);
        Ok(true)
    }
}

#[derive(Clone)]
enum SharedBytes {
    Mapped(Arc<Mmap>),
    Owned(Arc<[u8]>),
}

impl SharedBytes {
    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Owned(bytes) => &bytes[..],
        }
    }
}

/// Lines read from an in-memory or memory-mapped buffer
///
/// Clones share the buffer but keep their own position, so the input can
/// be rewound and duplicated.
#[derive(Clone)]
pub struct MappedInput {
    bytes: SharedBytes,
    position: usize,
}

impl MappedInput {
    /// Memory-map a file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;

        if file.metadata()?.len() == 0 {
            return Ok(Self::from_bytes(Vec::new()));
        }

        #[allow(unsafe_code)]
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        tracing::debug!(path = %path.as_ref().display(), size = mmap.len(), "mapped text input");

        Ok(Self {
            bytes: SharedBytes::Mapped(Arc::new(mmap)),
            position: 0,
        })
    }

    /// Read lines from a buffer
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: SharedBytes::Owned(bytes.into()),
            position: 0,
        }
    }

    /// Byte offset of the next line
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total size of the buffer
    pub fn size(&self) -> usize {
        self.bytes.as_slice().len()
    }
}

impl fmt::Debug for MappedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.bytes {
            SharedBytes::Mapped(_) => "mapped",
            SharedBytes::Owned(_) => "owned",
        };
        f.debug_struct("MappedInput")
            .field("kind", &kind)
            .field("size", &self.size())
            .field("position", &self.position)
            .finish()
    }
}

impl LineInput for MappedInput {
    fn next_line(&mut self, buf: &mut String) -> Result<bool> {
        buf.clear();

        let data = self.bytes.as_slice();
        if self.position >= data.len() {
            return Ok(false);
        }

        let rest = &data[self.position..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        let text = std::str::from_utf8(line).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid UTF-8 at byte {}: {err}", self.position),
            )
        })?;

        buf.push_str(text);
        self.position += consumed;
        Ok(true)
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn collect(input: &mut impl LineInput) -> Vec<String> {
        let mut lines = Vec::new();
        let mut buf = String::new();
        while input.next_line(&mut buf).unwrap() {
            lines.push(buf.clone());
        }
        lines
    }

    #[test]
    fn test_stream_input_strips_terminators() {
        let mut input = StreamInput::new(Cursor::new(b"a b\r\nc\n\nd".to_vec()));
        assert_eq!(collect(&mut input), vec!["a b", "c", "", "d"]);
        assert!(!input.is_seekable());
        assert!(matches!(input.rewind(), Err(Error::NotImplemented(_))));
    }

    #[test]
    fn test_mapped_input_rewinds_and_clones() {
        let mut input = MappedInput::from_bytes(b"1\r\n2\n3\n".to_vec());
        assert_eq!(collect(&mut input), vec!["1", "2", "3"]);

        input.rewind().unwrap();
        let mut buf = String::new();
        assert!(input.next_line(&mut buf).unwrap());
        assert_eq!(input.position(), 3);

        let mut copy = input.clone();
        assert_eq!(collect(&mut copy), vec!["2", "3"]);
        assert_eq!(collect(&mut input), vec!["2", "3"]);
    }

    #[test]
    fn test_mapped_input_rejects_invalid_utf8() {
        let mut input = MappedInput::from_bytes(vec![b'1', b'\n', 0xff, b'\n']);
        let mut buf = String::new();
        assert!(input.next_line(&mut buf).unwrap());
        assert!(matches!(input.next_line(&mut buf), Err(Error::Io(_))));
    }

    #[test]
    fn test_open_maps_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "x\ny\n").unwrap();

        let mut input = MappedInput::open(file.path()).unwrap();
        assert_eq!(input.size(), 4);
        assert_eq!(collect(&mut input), vec!["x", "y"]);

        let empty = tempfile::NamedTempFile::new().unwrap();
        let mut input = MappedInput::open(empty.path()).unwrap();
        assert!(collect(&mut input).is_empty());
    }
}
