pub mod conversation;
pub mod request;

pub use conversation::*;
pub use request::*;
