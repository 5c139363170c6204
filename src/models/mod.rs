pub mod catalog;
pub mod recipe;
pub mod user;

pub use catalog::*;
pub use recipe::*;
pub use user::*;
