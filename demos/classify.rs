use anyhow::Result;
use rock_analyzer::pipelines::image_classification_pipeline::*;

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "rock.jpg".to_string());

    println!("Building pipeline...");

    let pipeline = ImageClassificationPipelineBuilder::mobilenet_v2(MobileNetSize::Width100)
        .build()
        .await?;

    println!("Pipeline built successfully.");

    let photo = image::open(&path)?;
    let report = pipeline
        .analyze(photo, DEFAULT_PREDICTIONS_TO_SHOW)
        .await?;

    println!("\n=== Rock Analysis Result ===");
    println!("Photo: {path}");
    for result in &report.results {
        println!("{}: {}", result.label, result.confidence);
    }
    println!("Advisory: {}", report.advisory);

    Ok(())
}
