//! Line-oriented text readers
//!
//! One example per line. Dense lines hold a plain list of values; sparse
//! lines hold `index:value` pairs in the SVMLight layout. A label, when the
//! stream asks for one, is the first field by default. Comment lines and
//! blank lines are skipped, and decode errors carry the 1-based line number.

mod input;
mod parser;
mod reader;

pub use input::{LineInput, MappedInput, StreamInput};
pub use parser::LineParser;
pub use reader::AsciiReader;
