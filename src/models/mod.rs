//! Data models

mod decision;
mod fact;
mod host;
mod node;
mod params;

pub use decision::*;
pub use fact::*;
pub use host::*;
pub use node::*;
pub use params::*;
