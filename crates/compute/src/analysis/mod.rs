pub mod nutrients;
pub mod statistics;

pub use statistics::*;
