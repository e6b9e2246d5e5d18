//! Role based route access control
//!
//! Everything here is a pure function of the current [`Session`](crate::Session)
//! and the requested location; nothing is cached between navigations.

pub mod guards;
pub mod paths;
pub mod policies;
pub mod routes;

pub use guards::{
    GuardDecision, Location, NavigationState, Redirect, require_authenticated, require_guest,
    require_role,
};
pub use policies::{AccessPolicy, AccessState, can_access_path, classify, root_path};
pub use routes::{Navigation, Page, Route, RouteAccess, RoutePattern, RouteTable, RouteTarget};
