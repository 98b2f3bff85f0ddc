/// Caller identity and authorization
///
/// Authentication happens before the core is called. This module only carries the
/// authenticated caller around and decides what it may touch.
///
/// # Modules
///
/// - [`context`]: `CallerContext`, the caller id plus its stored role
/// - [`authorization`]: `require_*` capability and ownership checks

pub mod authorization;
pub mod context;

pub use authorization::AuthzError;
pub use context::CallerContext;
