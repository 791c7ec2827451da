//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator: bearer token → `AuthUser`
//! 2. Role gate (doctor routes only)
//! 3. Access log: runs after auth, has the user id

pub mod audit;
pub mod auth;
