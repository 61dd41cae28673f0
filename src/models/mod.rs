pub mod assistant;
pub mod image;

pub use assistant::*;
pub use image::*;
