//! Guesses which animal a freehand sketch shows.
//!
//! Strokes are recorded as normalized points, rasterized onto a canvas, scaled
//! to the size the model expects, packed into a raw pixel buffer and handed to
//! an image classifier. The top label of the returned distribution is turned
//! into a short display string.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pictionary::{ClassifierAdapter, ClassifierError, LabelDistribution, PipelineConfig, PixelBuffer, SketchSession};
//!
//! // Any `Fn(&PixelBuffer) -> Result<LabelDistribution, _>` works as a model
//! let model = |_: &PixelBuffer| -> Result<LabelDistribution, ClassifierError> {
//!     Ok(vec![("dog", 0.92f32), ("chicken", 0.05), ("fish", 0.02), ("t-rex", 0.01)]
//!         .into_iter()
//!         .collect())
//! };
//!
//! let mut session = SketchSession::new(PipelineConfig::default(), ClassifierAdapter::new(model))?;
//! session.add_point((0.2, 0.5));
//! session.add_point((0.8, 0.5));
//!
//! let outcome = session.guess();
//! assert_eq!(outcome.display(), "dog 92%");
//! # Ok(())
//! # }
//! ```
//!
//! # ONNX Models
//!
//! A real classifier is loaded from an ONNX file with [`OnnxSketchModel::builder`].
//! A model that fails to load leaves the session usable; every guess then
//! reports [`policy::DEFAULT_NO_MODEL_MESSAGE`].
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pictionary::{ClassifierAdapter, OnnxSketchModel, PipelineConfig, SketchSession, ANIMAL_LABELS};
//!
//! let model = OnnxSketchModel::builder()
//!     .with_model_file("models/animals/model.onnx")?
//!     .with_labels(ANIMAL_LABELS)
//!     .build();
//!
//! let mut session = SketchSession::new(PipelineConfig::default(), ClassifierAdapter::load(model))?;
//! session.add_point((0.1, 0.1));
//! session.add_point((0.9, 0.9));
//! println!("{}", session.guess().display());
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod debug;
pub mod encode;
pub mod model_manager;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod raster;
mod runtime;
pub mod stroke;

pub use classifier::{
    ClassifierAdapter, ClassifierError, LabelDistribution, OnnxModelBuilder, OnnxModelConfig, OnnxSketchModel,
    SketchModel, TensorLayout, ANIMAL_LABELS,
};
pub use debug::{DebugSink, DirectorySink};
pub use encode::{PixelBuffer, PixelEncoder, PixelFormat, RowOrder};
pub use model_manager::{ModelError, ModelManager};
pub use normalize::{ImageNormalizer, ResizeQuality};
pub use pipeline::{PipelineConfig, SketchSession};
pub use policy::{ClassificationResult, ConfidencePolicy, GuessOutcome};
pub use raster::{RasterConfig, RasterImage, Rasterizer};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};
pub use stroke::{StrokeBuffer, StrokePoint};

pub fn init_logger() {
    env_logger::init();
}
