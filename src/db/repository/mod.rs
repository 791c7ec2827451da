//! Repository layer: entity-scoped queries over a borrowed `Connection`.

mod appointments;
mod doctors;
mod documents;
mod users;

pub use appointments::*;
pub use doctors::*;
pub use documents::*;
pub use users::*;
