//! Image classification pipeline for identifying rock types in photos.
//!
//! This module wires a decoded photo through an on-device classifier and
//! turns the ranked predictions into presentation-ready strings: a label,
//! a whole-number confidence percentage, and a climbing safety advisory.
//!
//! ## Main Types
//!
//! - [`ImageClassificationPipeline`] - High-level interface for classifying photos
//! - [`ImageClassificationPipelineBuilder`] - Builder pattern for pipeline configuration
//! - [`ImageClassificationModel`] - Trait for classifier model implementations
//! - [`MobileNetSize`] - Available model width options
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rock_analyzer::pipelines::image_classification_pipeline::*;
//!
//! async fn run() -> anyhow::Result<()> {
//!     // Create an image classification pipeline
//!     let pipeline = ImageClassificationPipelineBuilder::mobilenet_v2(MobileNetSize::Width100)
//!         .build()
//!         .await?;
//!
//!     // Classify a photo
//!     let photo = image::open("granite_face.jpg")?;
//!     if let Some(predictions) = pipeline.predict(photo).await {
//!         for result in format::top_k(&predictions, DEFAULT_PREDICTIONS_TO_SHOW) {
//!             println!("{}: {}", result.label, result.confidence);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod advisory;
pub mod builder;
pub mod format;
pub mod model;
pub mod pipeline;

pub use advisory::{advisory_for, DEFAULT_ADVISORY};
pub use builder::ImageClassificationPipelineBuilder;
pub use format::{top_k, FormattedPrediction};
pub use model::ImageClassificationModel;
pub use pipeline::{
    ImageClassificationPipeline, Prediction, RockReport, DEFAULT_PREDICTIONS_TO_SHOW,
};

pub use crate::core::{ModelOptions, PredictionError};
pub use crate::models::MobileNetSize;

pub use anyhow::Result;
