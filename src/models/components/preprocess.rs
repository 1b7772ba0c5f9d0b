//! Converts decoded images into the tensor layout the classifiers expect.

use candle_core::{DType, Device, Tensor};
use image::{imageops::FilterType, DynamicImage};

/// Per-channel statistics the classifier checkpoints were trained with.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Turns a decoded image into a normalized `(1, 3, res, res)` f32 tensor.
///
/// The image is resized to fill `res` x `res` (center-cropping the longer
/// side), converted to RGB, scaled to `[0, 1]`, and normalized channel-wise
/// with [`IMAGENET_MEAN`] and [`IMAGENET_STD`]. The input is only borrowed;
/// nothing is retained after the call.
pub fn image_to_tensor(
    image: &DynamicImage,
    res: u32,
    device: &Device,
) -> candle_core::Result<Tensor> {
    let rgb = image.resize_to_fill(res, res, FilterType::Triangle).to_rgb8();
    let data = rgb.into_raw();

    let data = Tensor::from_vec(data, (res as usize, res as usize, 3), &Device::Cpu)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(1.0 / 255.0, 0.0)?;

    let mean = Tensor::new(&IMAGENET_MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&IMAGENET_STD, &Device::Cpu)?.reshape((3, 1, 1))?;

    data.broadcast_sub(&mean)?
        .broadcast_div(&std)?
        .unsqueeze(0)?
        .to_device(device)
}
