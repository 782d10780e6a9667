pub mod router;
#[allow(clippy::module_inception)]
pub mod trim;

pub use router::RecordRouter;
pub use trim::TrimPolicy;
