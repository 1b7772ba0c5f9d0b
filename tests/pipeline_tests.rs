// Integration tests for the image classification pipeline, driven through
// the public API with a scripted stand-in model so no weights are downloaded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use candle_core::Device;
use image::{DynamicImage, Rgb, RgbImage};
use rock_analyzer::pipelines::image_classification_pipeline::*;

#[derive(Debug, Clone)]
struct ScriptedOptions {
    key: String,
    ranked: Vec<(String, f32)>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOptions {
    fn returning(key: &str, ranked: &[(&str, f32)]) -> Self {
        Self {
            key: key.to_string(),
            ranked: ranked
                .iter()
                .map(|(label, confidence)| (label.to_string(), *confidence))
                .collect(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ranked: Vec::new(),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ModelOptions for ScriptedOptions {
    fn cache_key(&self) -> String {
        self.key.clone()
    }
}

#[derive(Clone)]
struct ScriptedModel {
    ranked: Vec<(String, f32)>,
    fail: bool,
    calls: Arc<AtomicUsize>,
    device: Device,
}

impl ImageClassificationModel for ScriptedModel {
    type Options = ScriptedOptions;

    fn new(options: Self::Options, device: Device) -> anyhow::Result<Self> {
        Ok(Self {
            ranked: options.ranked,
            fail: options.fail,
            calls: options.calls,
            device,
        })
    }

    fn classify(&self, _image: &DynamicImage) -> anyhow::Result<Vec<(String, f32)>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("scripted inference failure");
        }
        Ok(self.ranked.clone())
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

/// A model whose construction always fails, for exercising load errors.
#[derive(Clone)]
struct UnloadableModel;

impl ImageClassificationModel for UnloadableModel {
    type Options = ScriptedOptions;

    fn new(_options: Self::Options, _device: Device) -> anyhow::Result<Self> {
        anyhow::bail!("weights are gone")
    }

    fn classify(&self, _image: &DynamicImage) -> anyhow::Result<Vec<(String, f32)>> {
        unreachable!("never constructed")
    }

    fn device(&self) -> &Device {
        unreachable!("never constructed")
    }
}

fn photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([120, 110, 100])))
}

#[tokio::test]
async fn granite_photo_end_to_end() -> anyhow::Result<()> {
    let options = ScriptedOptions::returning(
        "granite-end-to-end",
        &[("Granite", 0.91), ("Sandstone", 0.05), ("Basalt", 0.04)],
    );
    let pipeline = ImageClassificationPipelineBuilder::<ScriptedModel>::new(options)
        .cpu()
        .build()
        .await?;

    let predictions = pipeline.predict(photo()).await.expect("inference succeeds");
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0].label, "Granite");

    let formatted = top_k(&predictions, 2);
    assert_eq!(
        formatted,
        vec![
            FormattedPrediction {
                label: "Granite".to_string(),
                confidence: "91%".to_string(),
            },
            FormattedPrediction {
                label: "Sandstone".to_string(),
                confidence: "5%".to_string(),
            },
        ]
    );

    assert_eq!(
        advisory_for(&predictions[0].label),
        "Watch out for polished faces that don't hold cams well!"
    );
    Ok(())
}

#[tokio::test]
async fn analyze_builds_a_full_report() -> anyhow::Result<()> {
    let options = ScriptedOptions::returning(
        "granite-report",
        &[("Granite", 0.91), ("Sandstone", 0.05), ("Basalt", 0.04)],
    );
    let pipeline = ImageClassificationPipelineBuilder::<ScriptedModel>::new(options)
        .cpu()
        .build()
        .await?;

    let report = pipeline
        .analyze(photo(), DEFAULT_PREDICTIONS_TO_SHOW)
        .await?;
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].label, "Granite");
    assert_eq!(report.results[0].confidence, "91%");
    assert!(report.advisory.contains("polished faces"));
    Ok(())
}

#[tokio::test]
async fn failed_inference_resolves_once_with_none() -> anyhow::Result<()> {
    let options = ScriptedOptions::failing("failing-model");
    let calls = options.calls.clone();
    let pipeline = ImageClassificationPipelineBuilder::<ScriptedModel>::new(options)
        .cpu()
        .build()
        .await?;

    assert!(pipeline.predict(photo()).await.is_none());

    // One submission means exactly one inference attempt.
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    match pipeline.analyze(photo(), 2).await {
        Err(PredictionError::InferenceFailed(_)) => {}
        other => panic!("expected InferenceFailed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn empty_predictions_are_a_success_for_predict_but_no_results_for_analyze(
) -> anyhow::Result<()> {
    let pipeline = ImageClassificationPipelineBuilder::<ScriptedModel>::new(
        ScriptedOptions::returning("empty-model", &[]),
    )
    .cpu()
    .build()
    .await?;

    let predictions = pipeline.predict(photo()).await.expect("not a failure");
    assert!(predictions.is_empty());

    match pipeline.analyze(photo(), 2).await {
        Err(PredictionError::NoResults) => {}
        other => panic!("expected NoResults, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unknown_top_label_gets_default_advisory() -> anyhow::Result<()> {
    let pipeline = ImageClassificationPipelineBuilder::<ScriptedModel>::new(
        ScriptedOptions::returning("basalt-model", &[("Basalt", 0.88), ("Granite", 0.12)]),
    )
    .cpu()
    .build()
    .await?;

    let report = pipeline.analyze(photo(), 1).await?;
    assert_eq!(report.advisory, DEFAULT_ADVISORY);
    Ok(())
}

#[tokio::test]
async fn unloadable_model_fails_the_build() {
    let err = match ImageClassificationPipelineBuilder::<UnloadableModel>::new(
        ScriptedOptions::failing("unloadable-model"),
    )
    .cpu()
    .build()
    .await
    {
        Ok(_) => panic!("construction must abort"),
        Err(err) => err,
    };

    match err.downcast_ref::<PredictionError>() {
        Some(PredictionError::ModelUnavailable(_)) => {}
        other => panic!("expected ModelUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_predict_calls_are_independent() -> anyhow::Result<()> {
    let options = ScriptedOptions::returning("concurrent-model", &[("Quartzite", 0.7)]);
    let pipeline = std::sync::Arc::new(
        ImageClassificationPipelineBuilder::<ScriptedModel>::new(options)
            .cpu()
            .build()
            .await?,
    );

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move { pipeline.predict(photo()).await }));
    }
    for handle in handles {
        let predictions = handle.await?.expect("inference succeeds");
        assert_eq!(predictions[0].label, "Quartzite");
    }
    Ok(())
}
