//! MobileNetV2 image classifier.
//!
//! MobileNetV2 is a small convolutional network built from inverted residual
//! blocks with linear bottlenecks, sized for on-device inference. The
//! checkpoints this loads are fine-tuned on rock-type photos and ship with
//! their class labels in `config.json`.
//!
//! # Quick Start
//! ```rust,no_run
//! use candle_core::Device;
//! use rock_analyzer::models::implementations::mobilenet::{MobileNetSize, MobileNetV2Model};
//! use rock_analyzer::pipelines::image_classification_pipeline::ImageClassificationModel;
//!
//! fn main() -> anyhow::Result<()> {
//!     let model = MobileNetV2Model::new(MobileNetSize::Width100, Device::Cpu)?;
//!     let photo = image::open("granite_face.jpg")?;
//!     let ranked = model.classify(&photo)?;
//!     println!("best guess: {} ({:.3})", ranked[0].0, ranked[0].1);
//!     Ok(())
//! }
//! ```

use crate::core::ModelOptions;
use crate::loaders::{LabelMapLoader, SafetensorsLoader};
use crate::models::components::preprocess::image_to_tensor;
use crate::pipelines::image_classification_pipeline::model::ImageClassificationModel;

use candle_core::{DType, Device, Result, Tensor, D};
use candle_nn::{
    batch_norm, conv2d_no_bias, linear, ops::softmax, BatchNorm, Conv2d, Conv2dConfig, Linear,
    VarBuilder,
};
use image::DynamicImage;

/// Input resolution the checkpoints were trained at.
const RESOLUTION: u32 = 224;
const BN_EPS: f64 = 1e-5;

/// Stage settings: (expansion factor, output channels, repeats, first stride).
const BLOCK_SETTINGS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

/// Width multiplier variants and the checkpoints they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileNetSize {
    Width100,
    Width140,
}

impl MobileNetSize {
    fn repo(&self) -> &'static str {
        match self {
            MobileNetSize::Width100 => "rockanalyzer/mobilenetv2-100-rocks",
            MobileNetSize::Width140 => "rockanalyzer/mobilenetv2-140-rocks",
        }
    }

    fn width_multiplier(&self) -> f64 {
        match self {
            MobileNetSize::Width100 => 1.0,
            MobileNetSize::Width140 => 1.4,
        }
    }
}

impl ModelOptions for MobileNetSize {
    fn cache_key(&self) -> String {
        match self {
            MobileNetSize::Width100 => "mobilenetv2-100".to_string(),
            MobileNetSize::Width140 => "mobilenetv2-140".to_string(),
        }
    }
}

/// Scales a channel count by the width multiplier, rounding to a multiple of
/// eight and never dropping below 90% of the requested width.
fn scale_channels(channels: usize, multiplier: f64) -> usize {
    let scaled = channels as f64 * multiplier;
    let rounded = (((scaled + 4.0) / 8.0).floor() as usize * 8).max(8);
    if (rounded as f64) < 0.9 * scaled {
        rounded + 8
    } else {
        rounded
    }
}

fn relu6(xs: &Tensor) -> Result<Tensor> {
    xs.relu()?.clamp(0f32, 6f32)
}

/// Convolution followed by frozen batch norm, no activation.
#[derive(Debug, Clone)]
struct ConvBn {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBn {
    fn load(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        groups: usize,
        vb: &VarBuilder,
        conv_name: &str,
        bn_name: &str,
    ) -> Result<Self> {
        let cfg = Conv2dConfig {
            padding: (kernel - 1) / 2,
            stride,
            groups,
            ..Default::default()
        };
        Ok(Self {
            conv: conv2d_no_bias(in_channels, out_channels, kernel, cfg, vb.pp(conv_name))?,
            bn: batch_norm(out_channels, BN_EPS, vb.pp(bn_name))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        xs.apply(&self.conv)?.apply_t(&self.bn, false)
    }
}

/// First stage block: depthwise 3x3 then a pointwise projection, no
/// expansion and no residual.
#[derive(Debug, Clone)]
struct DepthwiseSeparable {
    conv_dw: ConvBn,
    conv_pw: ConvBn,
}

impl DepthwiseSeparable {
    fn load(in_channels: usize, out_channels: usize, stride: usize, vb: &VarBuilder) -> Result<Self> {
        Ok(Self {
            conv_dw: ConvBn::load(in_channels, in_channels, 3, stride, in_channels, vb, "conv_dw", "bn1")?,
            conv_pw: ConvBn::load(in_channels, out_channels, 1, 1, 1, vb, "conv_pw", "bn2")?,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = relu6(&self.conv_dw.forward(xs)?)?;
        self.conv_pw.forward(&ys)
    }
}

/// Inverted residual: 1x1 expansion, depthwise 3x3, linear 1x1 projection,
/// with a skip connection when shapes allow.
#[derive(Debug, Clone)]
struct InvertedResidual {
    conv_pw: ConvBn,
    conv_dw: ConvBn,
    conv_pwl: ConvBn,
    has_skip: bool,
}

impl InvertedResidual {
    fn load(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        expansion: usize,
        vb: &VarBuilder,
    ) -> Result<Self> {
        let mid_channels = in_channels * expansion;
        Ok(Self {
            conv_pw: ConvBn::load(in_channels, mid_channels, 1, 1, 1, vb, "conv_pw", "bn1")?,
            conv_dw: ConvBn::load(mid_channels, mid_channels, 3, stride, mid_channels, vb, "conv_dw", "bn2")?,
            conv_pwl: ConvBn::load(mid_channels, out_channels, 1, 1, 1, vb, "conv_pwl", "bn3")?,
            has_skip: stride == 1 && in_channels == out_channels,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = relu6(&self.conv_pw.forward(xs)?)?;
        let ys = relu6(&self.conv_dw.forward(&ys)?)?;
        let ys = self.conv_pwl.forward(&ys)?;
        if self.has_skip {
            xs.add(&ys)
        } else {
            Ok(ys)
        }
    }
}

#[derive(Debug, Clone)]
enum Block {
    DepthwiseSeparable(DepthwiseSeparable),
    InvertedResidual(InvertedResidual),
}

impl Block {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            Block::DepthwiseSeparable(block) => block.forward(xs),
            Block::InvertedResidual(block) => block.forward(xs),
        }
    }
}

/// MobileNetV2 with a classification head, loaded from a Hub checkpoint.
#[derive(Clone)]
pub struct MobileNetV2Model {
    conv_stem: ConvBn,
    blocks: Vec<Block>,
    conv_head: ConvBn,
    classifier: Linear,
    labels: Vec<String>,
    device: Device,
}

impl MobileNetV2Model {
    pub fn new(size: MobileNetSize, device: Device) -> anyhow::Result<Self> {
        let repo = size.repo();

        let labels = LabelMapLoader::new(repo).load()?;
        anyhow::ensure!(
            !labels.is_empty(),
            "checkpoint {repo} defines no class labels"
        );

        let weights_path = SafetensorsLoader::new(repo).load()?;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)?
        };

        Ok(Self::build(vb, size.width_multiplier(), labels, device)?)
    }

    fn build(
        vb: VarBuilder,
        multiplier: f64,
        labels: Vec<String>,
        device: Device,
    ) -> Result<Self> {
        let stem_channels = scale_channels(32, multiplier);
        let conv_stem = ConvBn::load(3, stem_channels, 3, 2, 1, &vb, "conv_stem", "bn1")?;

        let mut blocks = Vec::new();
        let mut in_channels = stem_channels;
        let blocks_vb = vb.pp("blocks");
        for (stage, (expansion, channels, repeats, stride)) in BLOCK_SETTINGS.iter().enumerate() {
            let out_channels = scale_channels(*channels, multiplier);
            let stage_vb = blocks_vb.pp(stage);
            for repeat in 0..*repeats {
                // Only the first block of a stage downsamples.
                let stride = if repeat == 0 { *stride } else { 1 };
                let block_vb = stage_vb.pp(repeat);
                let block = if *expansion == 1 {
                    Block::DepthwiseSeparable(DepthwiseSeparable::load(
                        in_channels,
                        out_channels,
                        stride,
                        &block_vb,
                    )?)
                } else {
                    Block::InvertedResidual(InvertedResidual::load(
                        in_channels,
                        out_channels,
                        stride,
                        *expansion,
                        &block_vb,
                    )?)
                };
                blocks.push(block);
                in_channels = out_channels;
            }
        }

        let head_channels = scale_channels(1280, multiplier);
        let conv_head = ConvBn::load(in_channels, head_channels, 1, 1, 1, &vb, "conv_head", "bn2")?;
        let classifier = linear(head_channels, labels.len(), vb.pp("classifier"))?;

        Ok(Self {
            conv_stem,
            blocks,
            conv_head,
            classifier,
            labels,
            device,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut ys = relu6(&self.conv_stem.forward(xs)?)?;
        for block in &self.blocks {
            ys = block.forward(&ys)?;
        }
        let ys = relu6(&self.conv_head.forward(&ys)?)?;

        // Global average pool over both spatial dims, then classify.
        let pooled = ys.mean(D::Minus1)?.mean(D::Minus1)?;
        pooled.apply(&self.classifier)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl ImageClassificationModel for MobileNetV2Model {
    type Options = MobileNetSize;

    fn new(options: Self::Options, device: Device) -> anyhow::Result<Self> {
        MobileNetV2Model::new(options, device)
    }

    fn classify(&self, image: &DynamicImage) -> anyhow::Result<Vec<(String, f32)>> {
        let input = image_to_tensor(image, RESOLUTION, &self.device)?;
        let logits = self.forward(&input)?;
        let probabilities = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?;

        anyhow::ensure!(
            probabilities.len() == self.labels.len(),
            "model emitted {} scores for {} labels",
            probabilities.len(),
            self.labels.len()
        );

        let mut ranked: Vec<(String, f32)> =
            self.labels.iter().cloned().zip(probabilities).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked)
    }

    fn device(&self) -> &Device {
        self.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_multiplier_scales_to_multiples_of_eight() {
        // 1.0 leaves the reference widths untouched.
        for channels in [16, 24, 32, 64, 96, 160, 320, 1280] {
            assert_eq!(scale_channels(channels, 1.0), channels);
        }

        // 1.4 matches the published wide variant.
        assert_eq!(scale_channels(32, 1.4), 48);
        assert_eq!(scale_channels(16, 1.4), 24);
        assert_eq!(scale_channels(24, 1.4), 32);
        assert_eq!(scale_channels(64, 1.4), 88);
        assert_eq!(scale_channels(320, 1.4), 448);
        assert_eq!(scale_channels(1280, 1.4), 1792);
    }
}
