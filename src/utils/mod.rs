pub mod cache;
pub mod logger;
pub mod paths;
pub mod size;
pub mod template;

pub use cache::*;
pub use paths::*;
pub use size::*;
