#[allow(clippy::module_inception)]
pub mod demux;

pub use demux::{demultiplex, DemuxStats, Demultiplexer, SampleCount};
