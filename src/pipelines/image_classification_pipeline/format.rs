use super::pipeline::Prediction;

/// A prediction rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPrediction {
    pub label: String,
    /// Confidence as a whole percentage string, e.g. `"87%"`.
    pub confidence: String,
}

/// Render the first `k` predictions as display strings.
///
/// The input arrives ranked by the classifier, so this truncates without
/// re-sorting; output order matches input order. Returns
/// `min(k, predictions.len())` entries.
pub fn top_k(predictions: &[Prediction], k: usize) -> Vec<FormattedPrediction> {
    predictions
        .iter()
        .take(k)
        .map(|prediction| FormattedPrediction {
            label: prediction.label.clone(),
            confidence: format!("{}%", (prediction.confidence * 100.0).round() as i64),
        })
        .collect()
}
