// ── Watch domain model ──
//
// Typed representation of what travels over the event stream: resource
// kinds, change actions, decoded notifications, and the cache keys they
// invalidate.

pub mod cache_key;
pub mod resource;

// ── Re-exports ──────────────────────────────────────────────────────

pub use cache_key::CacheKey;
pub use resource::{Notification, OwnerRef, ParseTagError, ResourceKind, ResourceRef, WatchAction};
