pub mod components;
pub mod implementations;

pub use implementations::{MobileNetSize, MobileNetV2Model};
