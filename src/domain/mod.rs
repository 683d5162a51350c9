pub mod changes;
pub mod diff;
pub mod duplicates;
pub mod listing;
pub mod logic;
pub mod snapshot;

pub use changes::{Change, ChangeSet, RunOutcome};
pub use diff::diff;
pub use duplicates::reconcile_set;
pub use listing::Record;
pub use logic::classify_outcome;
pub use snapshot::Snapshot;
