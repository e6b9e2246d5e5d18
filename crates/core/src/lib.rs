//! LinkSphere core types and utilities

pub mod access;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod payload;
pub mod session;
pub mod storage;
pub mod types;
pub mod validation;

pub use access::{AccessPolicy, AccessState, GuardDecision, Location, Navigation, RouteTable};
pub use config::LinkSphereConfig;
pub use error::{CoreError, CoreResult};
pub use session::{ListenerId, REFRESH_TOKEN_KEY, SessionContext, SessionStore};
pub use storage::{FileStore, KeyValueStore, KeyValueStoreExt, MemoryStore};
pub use types::{Role, Session, UserSummary};
