//! Text example reader

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use ml_stream_core::{ByteSource, DenseVector, FeatureType, Result, SparseVector, VectorSource};

use super::input::{LineInput, MappedInput, StreamInput};
use super::parser::LineParser;
use crate::common::AsciiReaderOptions;

/// Reads one example per line of text
///
/// Dense vectors are plain value lists; sparse vectors use `index:value`
/// pairs. The same reader can decode either representation, chosen by the
/// stream that drives it.
#[derive(Debug, Clone)]
pub struct AsciiReader<I> {
    input: I,
    parser: LineParser,
    line: String,
    record: u64,
}

impl<R: Read + Send + 'static> AsciiReader<StreamInput<R>> {
    /// Read from a forward-only stream such as stdin or a socket
    pub fn from_reader(reader: R, options: AsciiReaderOptions) -> Self {
        Self::new(StreamInput::new(reader), options)
    }
}

impl AsciiReader<MappedInput> {
    /// Memory-map a text file
    pub fn open<P: AsRef<Path>>(path: P, options: AsciiReaderOptions) -> Result<Self> {
        Ok(Self::new(MappedInput::open(path)?, options))
    }

    /// Read from an in-memory buffer
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, options: AsciiReaderOptions) -> Self {
        Self::new(MappedInput::from_bytes(bytes), options)
    }
}

impl<I: LineInput> AsciiReader<I> {
    /// Create a reader over any line input
    pub fn new(input: I, options: AsciiReaderOptions) -> Self {
        Self {
            input,
            parser: LineParser::new(options),
            line: String::new(),
            record: 0,
        }
    }

    /// Reader options
    pub fn options(&self) -> &AsciiReaderOptions {
        self.parser.options()
    }

    /// Number of lines consumed so far, including skipped ones
    pub fn records_read(&self) -> u64 {
        self.record
    }

    /// The underlying input
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Advance to the next line carrying an example
    fn next_record(&mut self) -> Result<bool> {
        loop {
            if !self.input.next_line(&mut self.line)? {
                return Ok(false);
            }
            self.record += 1;

            if !self.parser.is_skipped(&self.line) {
                return Ok(true);
            }
        }
    }
}

impl<I: LineInput> ByteSource for AsciiReader<I> {
    fn is_seekable(&self) -> bool {
        self.input.is_seekable()
    }

    fn rewind(&mut self) -> Result<()> {
        self.input.rewind()?;
        self.record = 0;
        Ok(())
    }
}

impl<I: LineInput, T: FeatureType> VectorSource<DenseVector<T>> for AsciiReader<I> {
    fn read_vector(&mut self) -> Result<Option<DenseVector<T>>> {
        if !self.next_record()? {
            return Ok(None);
        }
        self.parser.parse_dense(&self.line, self.record).map(Some)
    }

    fn read_vector_and_label(&mut self) -> Result<Option<(DenseVector<T>, f64)>> {
        if !self.next_record()? {
            return Ok(None);
        }
        self.parser.parse_dense_labeled(&self.line, self.record).map(Some)
    }
}

impl<I: LineInput, T: FeatureType> VectorSource<SparseVector<T>> for AsciiReader<I> {
    fn read_vector(&mut self) -> Result<Option<SparseVector<T>>> {
        if !self.next_record()? {
            return Ok(None);
        }
        self.parser.parse_sparse(&self.line, self.record).map(Some)
    }

    fn read_vector_and_label(&mut self) -> Result<Option<(SparseVector<T>, f64)>> {
        if !self.next_record()? {
            return Ok(None);
        }
        self.parser.parse_sparse_labeled(&self.line, self.record).map(Some)
    }
}
