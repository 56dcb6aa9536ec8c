//! Polaris persistent state
//!
//! Client-side bookkeeping for centralized sync: which object versions the
//! server has acknowledged, which local changes still need submitting, what
//! the remote tree looks like, which remote changes are deferred, and which
//! remote content versions are known but not yet downloaded.
//!
//! ## Architecture
//!
//! - Every component is a stateless handle over SQLite tables keyed by store
//! - Mutations take the caller's `Transaction`; reads take any `Connection`
//! - Store creation and deletion fan out through [`StoreLifecycle`]
//!
//! ## Invariants
//!
//! 1. Per-store log positions (idx) only grow and are never reused
//! 2. At most one buffered change, one queue entry and one content change per object
//! 3. Deleting a store leaves no rows behind and may be repeated

pub mod conflict_buffer;
pub mod epoch_tracker;
pub mod errors;
pub mod fetch_queue;
pub mod lifecycle;
pub mod local_change_log;
pub mod merge_boundary;
pub mod remote_content_index;
pub mod remote_link_tree;
pub mod storage;
pub mod types;
pub mod version_store;

pub use conflict_buffer::{BufferedChange, ConflictBuffer};
pub use epoch_tracker::EpochTracker;
pub use errors::{PolarisError, PolarisResult};
pub use fetch_queue::{FetchEntry, FetchQueue};
pub use lifecycle::{StoreLifecycle, StoreLifecycleListener, StoreRegistry};
pub use local_change_log::{ContentChange, ContentChangeLog, MetaChange, MetaChangeLog};
pub use merge_boundary::{is_safe_to_apply, merge_boundary};
pub use remote_content_index::{RemoteContent, RemoteContentIndex};
pub use remote_link_tree::{RemoteChild, RemoteLink, RemoteLinkTree};
pub use storage::PolarisDatabase;
pub use types::{ContentHash, Did, ObjectType, Oid, Sidx, Soid};
pub use version_store::VersionStore;
