pub mod table;

pub use table::{BarcodeEntry, BarcodeTable, SampleOutput, SampleOutputs};
