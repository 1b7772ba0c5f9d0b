//! Checkpoint loading utilities for Hugging Face Hub integration.
//!
//! Classifier constructors run inside the model cache's loader closure, so
//! everything here uses the blocking hub API. All loaders share [`HfLoader`],
//! which retries transient hub failures with exponential backoff.

use hf_hub::api::sync::Api;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub fn load(&self) -> anyhow::Result<PathBuf> {
        let hf_api = Api::new()?;
        let hf_repo = hf_api.model(self.repo.clone());

        // Retry lock acquisition failures from concurrent downloads
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 0..max_retries {
            match hf_repo.get(self.filename.as_str()) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let error_msg = e.to_string();
                    if error_msg.contains("Lock acquisition failed") && attempt < max_retries - 1 {
                        let wait_time = std::time::Duration::from_millis(100 * (1 << attempt));
                        tracing::debug!(
                            repo = %self.repo,
                            file = %self.filename,
                            attempt,
                            "retrying hub download"
                        );
                        std::thread::sleep(wait_time);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap().into())
    }
}

/// Loads a safetensors weight file, preferring `model.safetensors` and
/// falling back to the name the checkpoint was uploaded with.
#[derive(Debug, Clone)]
pub struct SafetensorsLoader {
    pub repo: String,
}

impl SafetensorsLoader {
    pub fn new(repo: &str) -> Self {
        Self { repo: repo.into() }
    }

    pub fn load(&self) -> anyhow::Result<PathBuf> {
        HfLoader::new(&self.repo, "model.safetensors").load()
    }
}

#[derive(Deserialize)]
struct RawClassifierConfig {
    id2label: HashMap<String, String>,
}

/// Loads the class label table from a checkpoint's `config.json`.
///
/// The config stores `id2label` keyed by the stringified class index; the
/// loader returns the labels as a vector ordered by index so row `i` of the
/// classifier output maps to `labels[i]`.
pub struct LabelMapLoader {
    config_file_loader: HfLoader,
}

impl LabelMapLoader {
    pub fn new(repo: &str) -> Self {
        Self {
            config_file_loader: HfLoader::new(repo, "config.json"),
        }
    }

    pub fn load(&self) -> anyhow::Result<Vec<String>> {
        let config_file_path = self.config_file_loader.load()?;
        let config_content = std::fs::read_to_string(config_file_path)?;

        let raw: RawClassifierConfig = serde_json::from_str(&config_content)?;

        let mut labels = Vec::with_capacity(raw.id2label.len());
        for index in 0..raw.id2label.len() {
            let label = raw
                .id2label
                .get(&index.to_string())
                .ok_or_else(|| anyhow::anyhow!("id2label is missing class index {index}"))?;
            labels.push(label.clone());
        }

        Ok(labels)
    }
}
