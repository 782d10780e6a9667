pub mod reader;

pub use reader::{Record, RecordReader, TruncationPolicy};
