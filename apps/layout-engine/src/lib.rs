pub mod config;
pub mod errors;
pub mod generation;
pub mod layout;
pub mod models;

pub use errors::LayoutError;
pub use layout::{
    generate, generate_blocking, CompressionController, GenerationOutcome, GenerationRequest,
    PageSize,
};
pub use models::{JobKeywordSet, ResumeDocument};
