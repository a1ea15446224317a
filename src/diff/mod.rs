//! Change detection between successive snapshots.
//!
//! - `structural`: deep diff of arbitrary JSON snapshots
//! - `notifications`: id-keyed diff of notification lists
//! - `exclude`: path patterns for volatile fields
//! - `path`: addressing of values inside a snapshot

pub mod exclude;
pub mod notifications;
pub mod path;
pub mod structural;

pub use exclude::{ExclusionPattern, ExclusionSet};
pub use notifications::{NotificationDiff, diff_notifications};
pub use path::{Path, Segment};
pub use structural::{
    DEFAULT_MAX_DEPTH, DiffResult, SequenceChange, StructuralDiffer, ValueChange, diff_values,
};
