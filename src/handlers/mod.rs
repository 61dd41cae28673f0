pub mod assistant;
pub mod image;
