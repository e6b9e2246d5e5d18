//! Fixed application paths

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const POST_ROOT: &str = "/post";
pub const POST_SUBMIT: &str = "/post/submit";
pub const ADMIN_ROOT: &str = "/admin";
pub const USER_ROOT: &str = "/user";
pub const FORBIDDEN: &str = "/403";
