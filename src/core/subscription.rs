//! Subscription handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Token a bus hands out on subscribe and accepts back on unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generate a fresh, unique identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Recording state of a recorder: either holding a subscription or not.
///
/// A recorder owns exactly one `Subscription`, so it can never hold two
/// active handles at once.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::core::{Subscription, SubscriptionId};
///
/// let mut subscription = Subscription::Absent;
/// assert!(!subscription.is_present());
///
/// let id = SubscriptionId::new();
/// subscription = Subscription::Present(id);
/// assert_eq!(subscription.take(), Some(id));
/// assert_eq!(subscription, Subscription::Absent);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Subscription {
    /// Not recording
    #[default]
    Absent,
    /// Recording through the given bus subscription
    Present(SubscriptionId),
}

impl Subscription {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The active id, if any.
    pub fn id(&self) -> Option<SubscriptionId> {
        match self {
            Self::Present(id) => Some(*id),
            Self::Absent => None,
        }
    }

    /// Reset to `Absent`, returning the id that was active.
    pub fn take(&mut self) -> Option<SubscriptionId> {
        std::mem::take(self).id()
    }
}
