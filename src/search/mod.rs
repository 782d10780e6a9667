pub mod matcher;

pub use matcher::{BarcodeMatcher, MatchResult, Orientation};
