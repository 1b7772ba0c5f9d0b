pub mod core;
mod loaders;
pub mod models;
pub mod pipelines;

// Re-export core types
pub use self::core::PredictionError;

// Re-export model types for easier access
pub use models::implementations::{MobileNetSize, MobileNetV2Model};
