use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierError, LabelDistribution};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;
pub const DEFAULT_FAILURE_MESSAGE: &str = "YOU SUCK AT ART!!!";
pub const DEFAULT_NO_MODEL_MESSAGE: &str = "NO MODEL";

/// The top label of a distribution and the string shown for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub probability: f32,
    /// True when the probability cleared the threshold and a percentage is shown
    pub confident: bool,
    pub display: String,
}

/// What one press of "Guess" produced.
#[derive(Debug, Clone, PartialEq)]
pub enum GuessOutcome {
    /// The model ran; the result may or may not be confident
    Classified(ClassificationResult),
    /// The guess was aborted by an allocation or inference failure
    Failed { error: ClassifierError, display: String },
    /// No model was loaded, inference was not attempted
    NoModel { display: String },
}

impl GuessOutcome {
    /// The string handed to the presentation layer
    pub fn display(&self) -> &str {
        match self {
            GuessOutcome::Classified(result) => &result.display,
            GuessOutcome::Failed { display, .. } | GuessOutcome::NoModel { display } => display,
        }
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            GuessOutcome::Classified(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, GuessOutcome::Classified(_))
    }
}

/// Turns a label distribution into a display string.
///
/// Above the threshold the label carries a rounded percentage (`"dog 92%"`);
/// at or below it the bare label is shown. Failures get a fixed message that
/// can never be mistaken for a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePolicy {
    pub threshold: f32,
    pub failure_message: String,
    pub no_model_message: String,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
            no_model_message: DEFAULT_NO_MODEL_MESSAGE.to_string(),
        }
    }
}

impl ConfidencePolicy {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn with_no_model_message(mut self, message: impl Into<String>) -> Self {
        self.no_model_message = message.into();
        self
    }

    /// Picks the top label and formats it. `None` for an empty distribution.
    pub fn classify(&self, distribution: &LabelDistribution) -> Option<ClassificationResult> {
        let (label, probability) = distribution.top()?;
        let confident = probability > self.threshold;
        let display = if confident {
            format!("{} {}%", label, (probability * 100.0).round() as i64)
        } else {
            label.to_string()
        };
        debug!("Top label '{}' at {:.3} (confident: {})", label, probability, confident);

        Some(ClassificationResult {
            label: label.to_string(),
            probability,
            confident,
            display,
        })
    }

    /// Maps the result of a pipeline run onto a [`GuessOutcome`]
    pub fn outcome(&self, result: Result<LabelDistribution, ClassifierError>) -> GuessOutcome {
        match result {
            Ok(distribution) => match self.classify(&distribution) {
                Some(result) => {
                    info!("Guess: {}", result.display);
                    GuessOutcome::Classified(result)
                }
                None => self.failed(ClassifierError::InferenceFailed("Empty label distribution".into())),
            },
            Err(ClassifierError::ModelUnavailable(_)) => GuessOutcome::NoModel {
                display: self.no_model_message.clone(),
            },
            Err(error) => self.failed(error),
        }
    }

    fn failed(&self, error: ClassifierError) -> GuessOutcome {
        info!("Guess failed: {}", error);
        GuessOutcome::Failed {
            error,
            display: self.failure_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution(entries: &[(&str, f32)]) -> LabelDistribution {
        entries.iter().map(|&(label, p)| (label, p)).collect()
    }

    #[test]
    fn test_confident_guess_has_percentage() {
        let policy = ConfidencePolicy::default();
        let result = policy
            .classify(&distribution(&[("dog", 0.92), ("chicken", 0.05), ("fish", 0.02), ("t-rex", 0.01)]))
            .unwrap();
        assert_eq!(result.display, "dog 92%");
        assert!(result.confident);
        assert_eq!(result.label, "dog");
    }

    #[test]
    fn test_unsure_guess_is_bare_label() {
        let policy = ConfidencePolicy::default();
        let result = policy
            .classify(&distribution(&[("fish", 0.45), ("dog", 0.40), ("chicken", 0.10), ("t-rex", 0.05)]))
            .unwrap();
        assert_eq!(result.display, "fish");
        assert!(!result.confident);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = ConfidencePolicy::default();
        let at = policy.classify(&distribution(&[("t-rex", 0.8), ("dog", 0.2)])).unwrap();
        assert_eq!(at.display, "t-rex");

        let above = policy.classify(&distribution(&[("t-rex", 0.81), ("dog", 0.19)])).unwrap();
        assert_eq!(above.display, "t-rex 81%");
    }

    #[test]
    fn test_percentage_is_rounded() {
        let policy = ConfidencePolicy::default();
        let result = policy.classify(&distribution(&[("chicken", 0.996)])).unwrap();
        assert_eq!(result.display, "chicken 100%");
        let result = policy.classify(&distribution(&[("chicken", 0.874)])).unwrap();
        assert_eq!(result.display, "chicken 87%");
    }

    #[test]
    fn test_inference_failure_uses_failure_message() {
        let policy = ConfidencePolicy::default();
        let outcome = policy.outcome(Err(ClassifierError::InferenceFailed("boom".into())));
        assert_eq!(outcome.display(), DEFAULT_FAILURE_MESSAGE);
        assert!(!outcome.is_classified());
    }

    #[test]
    fn test_allocation_failure_uses_failure_message() {
        let policy = ConfidencePolicy::default().with_failure_message("nope");
        let outcome = policy.outcome(Err(ClassifierError::AllocationFailed { width: 0, height: 0 }));
        assert_eq!(outcome.display(), "nope");
    }

    #[test]
    fn test_missing_model_has_its_own_message() {
        let policy = ConfidencePolicy::default();
        let outcome = policy.outcome(Err(ClassifierError::ModelUnavailable("no file".into())));
        assert_eq!(outcome, GuessOutcome::NoModel { display: DEFAULT_NO_MODEL_MESSAGE.to_string() });
        assert_ne!(outcome.display(), policy.failure_message);
    }

    #[test]
    fn test_empty_distribution_is_failure() {
        let policy = ConfidencePolicy::default();
        let outcome = policy.outcome(Ok(LabelDistribution::new()));
        assert!(matches!(outcome, GuessOutcome::Failed { .. }));
        assert!(policy.classify(&LabelDistribution::new()).is_none());
    }

    #[test]
    fn test_custom_threshold() {
        let policy = ConfidencePolicy::default().with_threshold(0.3);
        let outcome = policy.outcome(Ok(distribution(&[("fish", 0.45), ("dog", 0.40)])));
        assert_eq!(outcome.display(), "fish 45%");
        assert_eq!(outcome.result().map(|r| r.probability), Some(0.45));
    }
}
