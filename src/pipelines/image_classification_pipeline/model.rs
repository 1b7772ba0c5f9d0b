use candle_core::Device;
use image::DynamicImage;

pub trait ImageClassificationModel {
    type Options: std::fmt::Debug + Clone;

    fn new(options: Self::Options, device: Device) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Classify a decoded photo, returning (label, confidence) pairs ranked
    /// by descending confidence. The image is borrowed for this call only.
    ///
    /// `classify` must be safe to call concurrently from multiple threads;
    /// implementations may not mutate model state during inference.
    fn classify(&self, image: &DynamicImage) -> anyhow::Result<Vec<(String, f32)>>;

    fn device(&self) -> &Device;
}
