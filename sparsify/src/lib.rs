pub mod compact;
pub mod error;
pub mod features;
pub mod sparse;
pub mod tokenizer;
pub mod vocab;

pub use error::{Error, Result};

/// Id returned by the membership oracle for a vocabulary feature. The oracle's
/// range is a minimum-perfect-hash space, so ids are sparse and can be huge.
pub type FeatureId = i64;
/// Small sequential replacement id assigned during compaction, starting at 1.
pub type CompactId = u32;
/// Per-run document id, assigned in first-encounter order starting at 1.
pub type DocId = u32;
pub type Count = u32;
