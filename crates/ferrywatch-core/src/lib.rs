// ferrywatch-core: resource watch domain between ferrywatch-api and consumers (CLI, embedders).

pub mod backoff;
pub mod cache;
pub mod decode;
pub mod error;
pub mod invalidation;
pub mod model;
pub mod probe;
pub mod relations;
pub mod scope;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backoff::{Backoff, ReconnectConfig};
pub use cache::{CacheEntry, Invalidator, QueryCache};
pub use decode::Decoder;
pub use error::{CoreError, DecodeError, InvalidateError, RelationError, SessionError};
pub use invalidation::InvalidationMapper;
pub use probe::probe;
pub use relations::{KeyTemplate, RelationTable};
pub use scope::SubscriptionScope;
pub use session::{SessionConfig, SessionState, SessionStats, WatchSession};

pub use model::{
    CacheKey, Notification, OwnerRef, ParseTagError, ResourceKind, ResourceRef, WatchAction,
};
