pub mod citation;
pub mod passage;
pub mod staleness;
pub mod time_serde;

pub use citation::{citation_marker, sanitize_citations};
pub use passage::{Passage, PassageKind, RankedCandidate};
pub use staleness::evidence_is_stale;
