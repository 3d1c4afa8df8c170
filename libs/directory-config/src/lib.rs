pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod property_source;
pub mod shared;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use property_source::*;
pub use shared::*;
