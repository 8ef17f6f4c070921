pub mod points;
pub mod wire;

pub use points::*;
pub use wire::*;
