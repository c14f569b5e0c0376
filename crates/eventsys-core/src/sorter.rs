//! Listener execution order

use std::{cmp::Ordering, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::listener::RegisteredListener;

/// Execution rank of a listener; lower ranks run earlier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Runs before everything else
    First,
    /// Runs early
    High,
    /// Default rank
    #[default]
    Normal,
    /// Runs late
    Low,
    /// Runs after everything else
    Last,
}

impl Priority {
    /// All levels, in execution order
    pub const ALL: [Priority; 5] = [
        Priority::First,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Last,
    ];

    /// Numeric rank (0 runs first)
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::First => "first",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Last => "last",
        };
        f.write_str(name)
    }
}

/// Total, stable order over registered listeners
///
/// Priority first, then registration sequence. Sequence numbers are unique, so no two
/// listeners compare equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrioritySorter;

impl PrioritySorter {
    /// Compare two listeners
    pub fn compare(a: &RegisteredListener, b: &RegisteredListener) -> Ordering {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| a.sequence().cmp(&b.sequence()))
    }

    /// Insert into an already sorted bucket, after every listener of the same or higher rank
    pub fn insert(bucket: &mut Vec<Arc<RegisteredListener>>, entry: Arc<RegisteredListener>) {
        let position = bucket.partition_point(|existing| Self::compare(existing, &entry) != Ordering::Greater);
        bucket.insert(position, entry);
    }

    /// Sort a merged sequence
    pub fn sort(listeners: &mut [Arc<RegisteredListener>]) {
        listeners.sort_by(|a, b| Self::compare(a, b));
    }
}
