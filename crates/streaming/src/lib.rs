pub mod api;
pub mod cache;
pub mod memory;
pub mod pipeline;
pub mod request;

pub use api::*;
pub use cache::*;
pub use memory::*;
pub use pipeline::*;
pub use request::*;
