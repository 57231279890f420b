pub mod config;
pub mod console;
pub mod driver;
pub mod error;
pub mod paint;
pub mod session;
pub mod view;

pub use config::*;
pub use error::*;
pub use session::*;
pub use view::*;
