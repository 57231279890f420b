pub mod client;
pub mod error;
pub mod persist;
pub mod protocol;

pub use client::*;
pub use error::*;
pub use persist::*;
pub use protocol::*;
