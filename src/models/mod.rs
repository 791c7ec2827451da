pub mod appointment;
pub mod doctor;
pub mod document;
pub mod enums;
pub mod user;

pub use appointment::*;
pub use doctor::*;
pub use document::*;
pub use enums::*;
pub use user::*;
