//! Expansion Coordination
//!
//! Request coalescing and result merging for node expansion. The orchestration
//! that ties these to providers and trees lives on
//! [`ObjectExplorer`](crate::explorer::ObjectExplorer).

pub mod merge;
pub mod pending;

pub use merge::{merge_results, MULTIPLE_ERRORS_LABEL};
pub use pending::{ExpansionId, ExpansionOutcome, PendingExpansion, PendingExpansionStatus};
