pub mod bar;
pub mod config;
pub mod error;
pub mod plugins;
pub mod registry;
pub mod themes;
pub mod utils;
pub mod worker;

pub use bar::*;
pub use config::*;
pub use error::*;
pub use registry::Registry;
pub use themes::*;
pub use worker::*;
