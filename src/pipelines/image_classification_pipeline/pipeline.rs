use super::advisory::advisory_for;
use super::format::{top_k, FormattedPrediction};
use super::model::ImageClassificationModel;
use crate::core::PredictionError;
use image::DynamicImage;

/// The largest number of predictions shown to the user by default.
pub const DEFAULT_PREDICTIONS_TO_SHOW: usize = 2;

/// One classifier output for a photo.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: String,
    /// In `[0, 1]`.
    pub confidence: f32,
}

/// Everything a screen needs to describe one classified photo.
#[derive(Debug, Clone)]
pub struct RockReport {
    /// Top predictions as display strings, best first.
    pub results: Vec<FormattedPrediction>,
    /// Safety note for the best label.
    pub advisory: &'static str,
}

pub struct ImageClassificationPipeline<M: ImageClassificationModel> {
    pub(crate) model: M,
}

impl<M> ImageClassificationPipeline<M>
where
    M: ImageClassificationModel + Clone + Send + Sync + 'static,
{
    /// Classify a photo on a blocking worker thread.
    ///
    /// Resolves exactly once: with the model's ranked predictions (highest
    /// confidence first, ordering taken from the model and never re-sorted
    /// here), or with `None` when inference fails. Failures are logged, not
    /// propagated. A successful call may yield an empty list when the model
    /// produces no predictions.
    ///
    /// Overlapping calls are independent: nothing cancels in-flight work and
    /// results may resolve out of submission order. Callers that need
    /// last-submission-wins should tag each call with their own request
    /// token and drop stale completions.
    pub async fn predict(&self, image: DynamicImage) -> Option<Vec<Prediction>> {
        match self.run_inference(image).await {
            Ok(predictions) => Some(predictions),
            Err(e) => {
                tracing::error!(error = %e, "image classification failed");
                None
            }
        }
    }

    /// Classify a photo and render the top `k` predictions along with the
    /// advisory for the best label.
    ///
    /// Unlike [`predict`](Self::predict) this keeps the error taxonomy:
    /// a failed inference call surfaces as
    /// [`PredictionError::InferenceFailed`] and an empty prediction list as
    /// [`PredictionError::NoResults`].
    pub async fn analyze(
        &self,
        image: DynamicImage,
        k: usize,
    ) -> Result<RockReport, PredictionError> {
        let predictions = self
            .run_inference(image)
            .await
            .map_err(|e| PredictionError::InferenceFailed(e.to_string()))?;

        let top = predictions.first().ok_or(PredictionError::NoResults)?;

        Ok(RockReport {
            advisory: advisory_for(&top.label),
            results: top_k(&predictions, k),
        })
    }

    async fn run_inference(&self, image: DynamicImage) -> anyhow::Result<Vec<Prediction>> {
        let model = self.model.clone();
        let ranked = tokio::task::spawn_blocking(move || model.classify(&image))
            .await
            .map_err(|e| anyhow::anyhow!("inference worker panicked: {e}"))??;

        Ok(ranked
            .into_iter()
            .map(|(label, confidence)| Prediction { label, confidence })
            .collect())
    }

    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}
