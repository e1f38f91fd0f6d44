pub mod appointment;
pub mod diagnosis;
pub mod enums;
pub mod survey;
pub mod user;

pub use appointment::*;
pub use diagnosis::*;
pub use survey::*;
pub use user::*;
