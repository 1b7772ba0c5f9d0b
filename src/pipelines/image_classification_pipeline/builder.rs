use super::model::ImageClassificationModel;
use super::pipeline::ImageClassificationPipeline;
use crate::core::{global_cache, ModelOptions, PredictionError};
use crate::pipelines::utils::{build_cache_key, DeviceRequest};

pub struct ImageClassificationPipelineBuilder<M: ImageClassificationModel> {
    options: M::Options,
    device_request: DeviceRequest,
}

impl<M: ImageClassificationModel> ImageClassificationPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Default,
        }
    }

    pub fn cpu(mut self) -> Self {
        self.device_request = DeviceRequest::Cpu;
        self
    }

    pub fn cuda_device(mut self, index: usize) -> Self {
        self.device_request = DeviceRequest::Cuda(index);
        self
    }

    pub fn device(mut self, device: candle_core::Device) -> Self {
        self.device_request = DeviceRequest::Explicit(device);
        self
    }

    /// Build the pipeline, loading the classifier through the global model
    /// cache so repeated builds of the same checkpoint share one instance.
    ///
    /// A model that cannot be loaded is fatal: this returns
    /// [`PredictionError::ModelUnavailable`] instead of a half-built
    /// pipeline.
    pub async fn build(self) -> anyhow::Result<ImageClassificationPipeline<M>>
    where
        M: Clone + Send + Sync + 'static,
        M::Options: ModelOptions + Clone,
    {
        let device = self.device_request.resolve()?;
        let key = build_cache_key(&self.options, &device);
        let model = global_cache()
            .get_or_create(&key, || M::new(self.options.clone(), device.clone()))
            .await
            .map_err(|e| PredictionError::ModelUnavailable(e.to_string()))?;
        Ok(ImageClassificationPipeline { model })
    }
}

impl ImageClassificationPipelineBuilder<crate::models::implementations::mobilenet::MobileNetV2Model> {
    pub fn mobilenet_v2(size: crate::models::MobileNetSize) -> Self {
        Self::new(size)
    }
}
