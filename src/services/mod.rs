pub mod assistant;
pub mod image;

pub use assistant::AssistantService;
pub use image::{ImageService, IncomingFile};
