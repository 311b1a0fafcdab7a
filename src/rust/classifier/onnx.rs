use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;
use serde::{Deserialize, Serialize};

use super::distribution::LabelDistribution;
use super::error::ClassifierError;
use super::model::SketchModel;
use crate::encode::PixelBuffer;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Axis order of the image tensor fed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorLayout {
    /// `[1, 3, height, width]`
    #[default]
    Nchw,
    /// `[1, height, width, 3]`
    Nhwc,
}

/// How an encoded drawing is turned into model input and how the output is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnnxModelConfig {
    /// Labels in the order of the model's output vector
    pub labels: Vec<String>,
    pub layout: TensorLayout,
    /// Multiplier applied to every 8-bit channel value
    pub input_scale: f32,
    /// Whether the output holds raw logits that still need a softmax
    pub apply_softmax: bool,
}

impl Default for OnnxModelConfig {
    fn default() -> Self {
        Self {
            labels: super::ANIMAL_LABELS.iter().map(|l| l.to_string()).collect(),
            layout: TensorLayout::default(),
            input_scale: 1.0 / 255.0,
            apply_softmax: true,
        }
    }
}

/// A sketch classifier backed by an ONNX Runtime session.
///
/// The session is wrapped in `Arc` and only read after construction, so the
/// model is `Send + Sync` and can be shared across guesses without locking.
#[derive(Debug)]
pub struct OnnxSketchModel {
    model_path: PathBuf,
    session: Arc<Session>,
    input_name: String,
    config: OnnxModelConfig,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxSketchModel>();
    }
};

impl OnnxSketchModel {
    /// Creates a new OnnxModelBuilder for fluent construction
    pub fn builder() -> OnnxModelBuilder {
        OnnxModelBuilder::new()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn labels(&self) -> &[String] {
        &self.config.labels
    }

    pub fn config(&self) -> &OnnxModelConfig {
        &self.config
    }

    /// Builds the image tensor, reading the buffer in drawing order (top row first)
    fn input_array(&self, buffer: &PixelBuffer) -> Result<Array4<f32>, ClassifierError> {
        let (width, height) = (buffer.width() as usize, buffer.height() as usize);
        let scale = self.config.input_scale;
        let shape = match self.config.layout {
            TensorLayout::Nchw => (1, 3, height, width),
            TensorLayout::Nhwc => (1, height, width, 3),
        };

        let mut array = Array4::<f32>::zeros(shape);
        for y in 0..buffer.height() {
            for x in 0..buffer.width() {
                let [_, r, g, b] = buffer.pixel(x, y).ok_or_else(|| {
                    ClassifierError::InferenceFailed(format!("Pixel buffer is missing pixel ({}, {})", x, y))
                })?;
                let (row, col) = (y as usize, x as usize);
                for (channel, value) in [r, g, b].into_iter().enumerate() {
                    let value = value as f32 * scale;
                    match self.config.layout {
                        TensorLayout::Nchw => array[[0, channel, row, col]] = value,
                        TensorLayout::Nhwc => array[[0, row, col, channel]] = value,
                    }
                }
            }
        }
        Ok(array)
    }
}

impl SketchModel for OnnxSketchModel {
    fn predict(&self, buffer: &PixelBuffer) -> Result<LabelDistribution, ClassifierError> {
        let input_array = self.input_array(buffer)?;
        let input_dyn = input_array.into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input)
                .map_err(|e| ClassifierError::InferenceFailed(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self.session.run(input_tensors)
            .map_err(|e| ClassifierError::InferenceFailed(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("Failed to extract output tensor: {}", e)))?;

        let scores: Vec<f32> = output_tensor.iter().copied().collect();
        if scores.len() != self.config.labels.len() {
            return Err(ClassifierError::InferenceFailed(format!(
                "Model produced {} scores for {} labels",
                scores.len(),
                self.config.labels.len()
            )));
        }

        let scores = if self.config.apply_softmax { softmax(&scores) } else { scores };
        Ok(LabelDistribution::from_scores(self.config.labels.iter().cloned(), &scores))
    }
}

/// Numerically stable softmax
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        vec![0.0; logits.len()]
    }
}

/// A builder for constructing an [`OnnxSketchModel`] with a fluent interface.
#[derive(Debug, Default)]
pub struct OnnxModelBuilder {
    model_path: Option<PathBuf>,
    config: OnnxModelConfig,
    runtime_config: RuntimeConfig,
}

impl OnnxModelBuilder {
    /// Creates a builder with the animal labels and default runtime settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the path of the `.onnx` file
    ///
    /// # Errors
    /// `ValidationError` if the path is empty or already set.
    pub fn with_model_file(mut self, path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ClassifierError::ValidationError("Model path cannot be empty".into()));
        }
        if self.model_path.is_some() {
            return Err(ClassifierError::ValidationError("Model path already set".into()));
        }
        self.model_path = Some(path.to_path_buf());
        Ok(self)
    }

    /// Replaces the label list; order must match the model's output vector
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_layout(mut self, layout: TensorLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn with_input_scale(mut self, scale: f32) -> Self {
        self.config.input_scale = scale;
        self
    }

    pub fn with_softmax(mut self, apply: bool) -> Self {
        self.config.apply_softmax = apply;
        self
    }

    /// Replaces every input/output setting at once
    pub fn with_config(mut self, config: OnnxModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the label list:
    /// - at least one label
    /// - no empty label
    /// - no duplicates
    fn validate_labels(labels: &[String]) -> Result<(), ClassifierError> {
        if labels.is_empty() {
            return Err(ClassifierError::ValidationError("At least one label is required".into()));
        }
        if let Some(pos) = labels.iter().position(|l| l.is_empty()) {
            return Err(ClassifierError::ValidationError(format!("Label {} cannot be empty", pos + 1)));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(ClassifierError::ValidationError(format!("Duplicate label '{}'", duplicate)));
        }
        Ok(())
    }

    /// Loads the session and returns the finished model
    ///
    /// # Errors
    /// - `ValidationError` for a bad label list or input scale
    /// - `ModelError` if the file is missing, fails to load, or has no inputs/outputs
    pub fn build(self) -> Result<OnnxSketchModel, ClassifierError> {
        let model_path = self.model_path
            .ok_or_else(|| ClassifierError::ValidationError("Model path must be set".into()))?;
        Self::validate_labels(&self.config.labels)?;
        if !self.config.input_scale.is_finite() {
            return Err(ClassifierError::ValidationError("Input scale must be finite".into()));
        }
        if !model_path.exists() {
            return Err(ClassifierError::ModelError(format!("Model file not found: {}", model_path.display())));
        }

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(&model_path)
            .map_err(|e| {
                error!("Failed to load model {}: {}", model_path.display(), e);
                ClassifierError::ModelError(format!("Failed to load model: {}", e))
            })?;

        let input_name = Self::validate_model(&session)?;
        info!(
            "Loaded sketch model {} (input '{}', {} labels)",
            model_path.display(),
            input_name,
            self.config.labels.len()
        );

        Ok(OnnxSketchModel {
            model_path,
            session: Arc::new(session),
            input_name,
            config: self.config,
        })
    }

    /// Checks the model has an image input and a score output, returning the input name
    fn validate_model(session: &Session) -> Result<String, ClassifierError> {
        let input = session.inputs.first().ok_or_else(|| {
            ClassifierError::ModelError("Model must have at least 1 input for the image".to_string())
        })?;
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for label scores".to_string(),
            ));
        }
        Ok(input.name.clone())
    }
}
