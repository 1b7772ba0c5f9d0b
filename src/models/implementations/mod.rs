pub mod mobilenet;

pub use mobilenet::{MobileNetSize, MobileNetV2Model};
