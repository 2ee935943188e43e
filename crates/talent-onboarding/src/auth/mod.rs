//! Session tokens, password hashing, and the request guards built on them.

pub mod middleware;
pub mod ownership;
pub mod password;
pub mod session;

pub use middleware::{require_admin, require_user};
pub use ownership::{can_mutate, ensure_can_mutate};
pub use session::{
    Account, AuthError, Credentials, Principal, PrincipalKind, Session, SessionIssuer, UserId,
};
