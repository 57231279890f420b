pub mod compose;
pub mod host;
pub mod layer;
pub mod symbology;

pub use compose::*;
pub use host::*;
pub use layer::*;
pub use symbology::*;
