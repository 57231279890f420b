pub mod attribute;
pub mod edits;
pub mod feature;
pub mod identity;
pub mod selection;

pub use attribute::*;
pub use edits::*;
pub use feature::*;
pub use identity::*;
pub use selection::*;
