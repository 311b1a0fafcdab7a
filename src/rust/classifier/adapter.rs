use std::fmt;

use log::{debug, error};

use super::distribution::LabelDistribution;
use super::error::ClassifierError;
use super::model::SketchModel;
use crate::encode::PixelBuffer;

enum ModelState {
    Ready(Box<dyn SketchModel>),
    Unavailable(String),
}

/// Owns the classifier for a drawing session and normalizes its failures.
///
/// The model is loaded once, up front. If loading failed the adapter stays
/// usable: every call to [`ClassifierAdapter::predict`] short-circuits with
/// `ModelUnavailable` instead of attempting inference.
pub struct ClassifierAdapter {
    state: ModelState,
}

impl fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ModelState::Ready(_) => f.write_str("ClassifierAdapter(ready)"),
            ModelState::Unavailable(reason) => write!(f, "ClassifierAdapter(unavailable: {})", reason),
        }
    }
}

impl ClassifierAdapter {
    pub fn new(model: impl SketchModel + 'static) -> Self {
        Self::from_boxed(Box::new(model))
    }

    pub fn from_boxed(model: Box<dyn SketchModel>) -> Self {
        Self {
            state: ModelState::Ready(model),
        }
    }

    /// An adapter with no model; every guess reports `ModelUnavailable`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable(reason.into()),
        }
    }

    /// Wraps the result of loading a model, logging a load failure once
    pub fn load<M, E>(loaded: Result<M, E>) -> Self
    where
        M: SketchModel + 'static,
        E: fmt::Display,
    {
        match loaded {
            Ok(model) => Self::new(model),
            Err(e) => {
                error!("Failed to load sketch model, guessing is disabled: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    /// Runs the model on an encoded drawing.
    ///
    /// # Errors
    /// - `ModelUnavailable` if the model never loaded
    /// - `InferenceFailed` for any backend failure or an empty distribution
    pub fn predict(&self, buffer: &PixelBuffer) -> Result<LabelDistribution, ClassifierError> {
        let model = match &self.state {
            ModelState::Ready(model) => model,
            ModelState::Unavailable(reason) => {
                debug!("Skipping inference, no model: {}", reason);
                return Err(ClassifierError::ModelUnavailable(reason.clone()));
            }
        };

        let distribution = model.predict(buffer).map_err(|e| {
            error!("Inference failed: {}", e);
            match e {
                ClassifierError::InferenceFailed(_) => e,
                other => ClassifierError::InferenceFailed(other.to_string()),
            }
        })?;

        if distribution.is_empty() {
            error!("Inference returned an empty label distribution");
            return Err(ClassifierError::InferenceFailed("Empty label distribution".into()));
        }
        debug!("Inference returned {} labels", distribution.len());
        Ok(distribution)
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ClassifierAdapter>();
    }
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::PixelEncoder;
    use crate::raster::{RasterImage, WHITE};

    type ModelResult = Result<LabelDistribution, ClassifierError>;

    fn blank_buffer() -> PixelBuffer {
        PixelEncoder::default()
            .encode(&RasterImage::filled(4, 4, WHITE))
            .expect("Failed to encode test raster")
    }

    #[test]
    fn test_predict_passes_distribution_through() {
        let adapter = ClassifierAdapter::new(|_: &PixelBuffer| -> ModelResult {
            Ok(vec![("dog", 0.9f32), ("fish", 0.1)].into_iter().collect())
        });
        assert!(adapter.is_available());
        let distribution = adapter.predict(&blank_buffer()).unwrap();
        assert_eq!(distribution.top(), Some(("dog", 0.9)));
    }

    #[test]
    fn test_backend_errors_become_inference_failed() {
        let adapter = ClassifierAdapter::new(|_: &PixelBuffer| -> ModelResult {
            Err(ClassifierError::ModelError("backend exploded".into()))
        });
        match adapter.predict(&blank_buffer()) {
            Err(ClassifierError::InferenceFailed(msg)) => assert!(msg.contains("backend exploded")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_distribution_is_a_failure() {
        let adapter = ClassifierAdapter::new(|_: &PixelBuffer| -> ModelResult { Ok(LabelDistribution::new()) });
        assert!(matches!(
            adapter.predict(&blank_buffer()),
            Err(ClassifierError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_failed_load_short_circuits() {
        let adapter = ClassifierAdapter::load::<fn(&PixelBuffer) -> ModelResult, _>(
            Err("missing model.onnx"),
        );
        assert!(!adapter.is_available());
        assert_eq!(
            adapter.predict(&blank_buffer()),
            Err(ClassifierError::ModelUnavailable("missing model.onnx".into()))
        );
    }
}
