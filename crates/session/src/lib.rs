pub mod query;
pub mod render;
pub mod surface;
pub mod viewer;
pub mod viewport;

pub use query::*;
pub use render::*;
pub use surface::*;
pub use viewer::*;
pub use viewport::*;
