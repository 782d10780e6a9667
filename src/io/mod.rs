#[allow(clippy::module_inception)]
pub mod io;

pub use io::{create_output, open_input};
