//! Line parser turning text fields into typed vectors

use ml_stream_core::{DenseVector, Error, FeatureType, Result, SparseEntry, SparseVector};

use crate::common::{AsciiReaderOptions, Delimiter, LabelPosition};

/// Parses one line of text into a dense or sparse vector
#[derive(Debug, Clone)]
pub struct LineParser {
    options: AsciiReaderOptions,
}

impl LineParser {
    /// Create a parser
    pub fn new(options: AsciiReaderOptions) -> Self {
        Self { options }
    }

    /// Parser options
    pub fn options(&self) -> &AsciiReaderOptions {
        &self.options
    }

    /// Whether the line carries no example
    pub fn is_skipped(&self, line: &str) -> bool {
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            return self.options.skip_empty_lines;
        }

        self.options
            .comment
            .is_some_and(|comment| trimmed.as_bytes()[0] == comment)
    }

    /// Parse a line of values into a dense vector
    pub fn parse_dense<T: FeatureType>(&self, line: &str, record: u64) -> Result<DenseVector<T>> {
        let values = self
            .fields(line, record)?
            .into_iter()
            .map(|field| parse_value::<T>(field, record))
            .collect::<Result<Vec<_>>>()?;

        Ok(DenseVector::new(values))
    }

    /// Parse a labeled line of values into a dense vector and its label
    pub fn parse_dense_labeled<T: FeatureType>(&self, line: &str, record: u64) -> Result<(DenseVector<T>, f64)> {
        let (label, rest) = self.split_label(line, record)?;
        let values = rest
            .into_iter()
            .map(|field| parse_value::<T>(field, record))
            .collect::<Result<Vec<_>>>()?;

        Ok((DenseVector::new(values), label))
    }

    /// Parse a line of `index:value` pairs into a sparse vector
    pub fn parse_sparse<T: FeatureType>(&self, line: &str, record: u64) -> Result<SparseVector<T>> {
        let fields = self.fields(line, record)?;
        self.sparse_from_fields(&fields, record)
    }

    /// Parse a labeled line of `index:value` pairs into a sparse vector and its label
    pub fn parse_sparse_labeled<T: FeatureType>(&self, line: &str, record: u64) -> Result<(SparseVector<T>, f64)> {
        let (label, rest) = self.split_label(line, record)?;
        Ok((self.sparse_from_fields(&rest, record)?, label))
    }

    /// Split a line into fields; with a byte delimiter an empty field is an error
    fn fields<'a>(&self, line: &'a str, record: u64) -> Result<Vec<&'a str>> {
        let byte = match self.options.delimiter {
            Delimiter::Whitespace => return Ok(line.split_whitespace().collect()),
            Delimiter::Byte(byte) => byte,
        };

        if !byte.is_ascii() {
            return Err(Error::InvalidArgument(format!(
                "delimiter byte {byte:#04x} is not ASCII"
            )));
        }
        let delimiter = char::from(byte);

        // a single trailing delimiter is tolerated
        let line = line.trim();
        let line = line.strip_suffix(delimiter).unwrap_or(line);
        if line.is_empty() {
            return Ok(Vec::new());
        }

        line.split(delimiter)
            .map(str::trim)
            .enumerate()
            .map(|(column, field)| {
                if field.is_empty() {
                    Err(parse_error(record, format!("empty field in column {}", column + 1)))
                } else {
                    Ok(field)
                }
            })
            .collect()
    }

    fn split_label<'a>(&self, line: &'a str, record: u64) -> Result<(f64, Vec<&'a str>)> {
        let mut fields = self.fields(line, record)?;

        let label = match self.options.label_position {
            LabelPosition::First if !fields.is_empty() => Some(fields.remove(0)),
            LabelPosition::Last => fields.pop(),
            LabelPosition::First => None,
        };
        let label = label.ok_or_else(|| parse_error(record, "missing label".to_string()))?;
        let label = label
            .parse::<f64>()
            .map_err(|_| parse_error(record, format!("invalid label '{label}'")))?;

        Ok((label, fields))
    }

    fn sparse_from_fields<T: FeatureType>(&self, fields: &[&str], record: u64) -> Result<SparseVector<T>> {
        let entries = fields
            .iter()
            .map(|field| self.parse_entry::<T>(field, record))
            .collect::<Result<Vec<_>>>()?;

        SparseVector::new(entries).map_err(|err| match err {
            Error::InvalidArgument(message) => parse_error(record, message),
            other => other,
        })
    }

    fn parse_entry<T: FeatureType>(&self, field: &str, record: u64) -> Result<SparseEntry<T>> {
        let (index, value) = field
            .split_once(':')
            .ok_or_else(|| parse_error(record, format!("expected index:value, got '{field}'")))?;

        let index = index
            .parse::<usize>()
            .map_err(|_| parse_error(record, format!("invalid feature index '{index}'")))?;
        let index = index.checked_sub(self.options.index_base).ok_or_else(|| {
            parse_error(
                record,
                format!("feature index {index} is below the base {}", self.options.index_base),
            )
        })?;
        if index == usize::MAX {
            return Err(parse_error(record, format!("feature index {index} is out of range")));
        }

        Ok(SparseEntry::new(index, parse_value::<T>(value, record)?))
    }
}

fn parse_value<T: FeatureType>(field: &str, record: u64) -> Result<T> {
    field
        .parse::<T>()
        .map_err(|_| parse_error(record, format!("invalid {} value '{field}'", T::NAME)))
}

fn parse_error(record: u64, message: String) -> Error {
    Error::Parse { record, message }
}
