pub mod layer;
pub mod symbology;
pub mod view;

pub use layer::*;
pub use symbology::*;
pub use view::*;
