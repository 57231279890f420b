pub mod analysis;
pub mod tracker;

pub use analysis::*;
pub use tracker::*;
