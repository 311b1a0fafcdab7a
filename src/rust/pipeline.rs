use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierAdapter, ClassifierError, LabelDistribution};
use crate::debug::DebugSink;
use crate::encode::{PixelEncoder, RowOrder};
use crate::normalize::{ImageNormalizer, ResizeQuality};
use crate::policy::{ConfidencePolicy, GuessOutcome};
use crate::raster::{RasterConfig, RasterImage, Rasterizer};
use crate::stroke::{StrokeBuffer, StrokePoint};

/// Everything that shapes a guess, end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Size of the raster the strokes are drawn into
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Side of the square image the classifier expects
    pub model_input_size: u32,
    pub raster: RasterConfig,
    pub resize_quality: ResizeQuality,
    pub row_order: RowOrder,
    pub policy: ConfidencePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canvas_width: 360,
            canvas_height: 360,
            model_input_size: 360,
            raster: RasterConfig::default(),
            resize_quality: ResizeQuality::default(),
            row_order: RowOrder::default(),
            policy: ConfidencePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Rejects sizes and settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ClassifierError::ValidationError(format!(
                "Canvas must not be empty ({}x{})",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.model_input_size == 0 {
            return Err(ClassifierError::ValidationError("Model input size must be positive".into()));
        }
        if !self.raster.stroke_width.is_finite() || self.raster.stroke_width <= 0.0 {
            return Err(ClassifierError::ValidationError(format!(
                "Stroke width must be a positive number, got {}",
                self.raster.stroke_width
            )));
        }
        if !(0.0..=1.0).contains(&self.policy.threshold) {
            return Err(ClassifierError::ValidationError(format!(
                "Confidence threshold must be within [0, 1], got {}",
                self.policy.threshold
            )));
        }
        if self.policy.failure_message.is_empty() {
            return Err(ClassifierError::ValidationError("Failure message cannot be empty".into()));
        }
        Ok(())
    }
}

/// One drawing session: the stroke buffer plus the stages that turn it into a guess.
///
/// Guesses are synchronous and run on the caller's thread. Strokes persist
/// across guesses until [`SketchSession::clear`] is called, and no failure
/// ever touches them.
pub struct SketchSession {
    strokes: StrokeBuffer,
    canvas: (u32, u32),
    rasterizer: Rasterizer,
    normalizer: ImageNormalizer,
    encoder: PixelEncoder,
    classifier: ClassifierAdapter,
    policy: ConfidencePolicy,
    debug_sink: Option<Box<dyn DebugSink>>,
    last_display: Option<String>,
}

impl SketchSession {
    /// Creates a session around an already loaded classifier
    ///
    /// # Errors
    /// `ValidationError` if the configuration is unusable.
    pub fn new(config: PipelineConfig, classifier: ClassifierAdapter) -> Result<Self, ClassifierError> {
        config.validate()?;
        let normalizer = ImageNormalizer::square(config.model_input_size)
            .with_quality(config.resize_quality)
            .with_background(config.raster.background);
        info!(
            "Sketch session: canvas {}x{}, model input {}x{}, classifier {}",
            config.canvas_width,
            config.canvas_height,
            config.model_input_size,
            config.model_input_size,
            if classifier.is_available() { "ready" } else { "unavailable" }
        );

        Ok(Self {
            strokes: StrokeBuffer::new(),
            canvas: (config.canvas_width, config.canvas_height),
            rasterizer: Rasterizer::new(config.raster),
            normalizer,
            encoder: PixelEncoder::new(config.row_order),
            classifier,
            policy: config.policy,
            debug_sink: None,
            last_display: None,
        })
    }

    /// Attaches a side channel that receives every normalized raster
    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.debug_sink = Some(Box::new(sink));
        self
    }

    pub fn add_point(&mut self, point: impl Into<StrokePoint>) {
        self.strokes.add_point(point);
    }

    /// Clears the drawing and the last displayed guess
    pub fn clear(&mut self) {
        debug!("Clearing {} point(s)", self.strokes.len());
        self.strokes.clear();
        self.last_display = None;
    }

    pub fn strokes(&self) -> &StrokeBuffer {
        &self.strokes
    }

    pub fn classifier(&self) -> &ClassifierAdapter {
        &self.classifier
    }

    /// The display string of the most recent guess since the last clear
    pub fn last_display(&self) -> Option<&str> {
        self.last_display.as_deref()
    }

    /// Rasterizes the current strokes and scales them to the model input size
    pub fn render(&self) -> RasterImage {
        let (width, height) = self.canvas;
        let raster = self.rasterizer.rasterize(&self.strokes, width, height);
        self.normalizer.normalize(&raster)
    }

    /// Runs the full pipeline and returns the raw distribution
    pub fn predict(&self) -> Result<LabelDistribution, ClassifierError> {
        let image = self.render();
        if let Some(sink) = &self.debug_sink {
            sink.record(&image);
        }
        let buffer = self.encoder.encode(&image)?;
        self.classifier.predict(&buffer)
    }

    /// Handles one press of "Guess"
    pub fn guess(&mut self) -> GuessOutcome {
        self.guess_with_distribution().0
    }

    /// Like [`SketchSession::guess`], also returning the distribution the model produced
    pub fn guess_with_distribution(&mut self) -> (GuessOutcome, Option<LabelDistribution>) {
        debug!("Guessing from {} point(s)", self.strokes.len());
        let result = self.predict();
        let distribution = result.as_ref().ok().cloned();
        let outcome = self.policy.outcome(result);
        self.last_display = Some(outcome.display().to_string());
        (outcome, distribution)
    }
}
