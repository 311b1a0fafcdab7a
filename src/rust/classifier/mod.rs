mod adapter;
mod distribution;
mod error;
mod model;
pub mod onnx;

pub use adapter::ClassifierAdapter;
pub use distribution::{LabelDistribution, ANIMAL_LABELS};
pub use error::ClassifierError;
pub use model::SketchModel;
pub use onnx::{OnnxModelBuilder, OnnxModelConfig, OnnxSketchModel, TensorLayout};
