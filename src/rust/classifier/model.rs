use super::distribution::LabelDistribution;
use super::error::ClassifierError;
use crate::encode::PixelBuffer;

/// The single seam between the pipeline and an inference backend.
///
/// Implementations are loaded once and then only read, so one instance can
/// serve every guess of a session. `predict` runs synchronously on the
/// calling thread.
pub trait SketchModel: Send + Sync {
    /// Runs inference on an encoded drawing and returns per-label probabilities
    fn predict(&self, buffer: &PixelBuffer) -> Result<LabelDistribution, ClassifierError>;
}

impl<F> SketchModel for F
where
    F: Fn(&PixelBuffer) -> Result<LabelDistribution, ClassifierError> + Send + Sync,
{
    fn predict(&self, buffer: &PixelBuffer) -> Result<LabelDistribution, ClassifierError> {
        self(buffer)
    }
}
