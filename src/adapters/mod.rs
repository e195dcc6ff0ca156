pub mod artifact;
pub mod http;
pub mod onnx;
pub mod ui;
