mod endpoint;
mod monitor;

pub use endpoint::*;
pub use monitor::*;
