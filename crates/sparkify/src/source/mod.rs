//! Source side: path patterns and the typed JSON record reader.

mod pattern;
mod reader;

pub use pattern::PathPattern;
pub use reader::{JsonRecordDecoder, RecordReader};
