use serde::{Deserialize, Serialize};

use crate::camera::Frame;
use crate::error::ClassificationError;

/// Label and confidence for one capture attempt. Transient; discarded
/// once fed into the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// The item classifier boundary. Inference internals (model format,
/// runtime) live behind this trait; the orchestration calls it
/// synchronously and treats any failure as aborting only the current
/// capture attempt.
pub trait Classifier: Send + Sync {
    fn classify(&self, frame: &Frame) -> Result<Classification, ClassificationError>;
}

/// Bench stand-in that always returns a configured label. Replaced by a
/// model-backed implementation once an inference runtime is wired in.
pub struct FixedClassifier {
    label: String,
    confidence: f32,
}

impl FixedClassifier {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, _frame: &Frame) -> Result<Classification, ClassificationError> {
        Ok(Classification {
            label: self.label.clone(),
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn fixed_classifier_clamps_confidence() {
        let classifier = FixedClassifier::new("apple", 1.7);
        let frame = Frame::new(RgbImage::new(4, 4));
        let result = classifier.classify(&frame).unwrap();
        assert_eq!(result.label, "apple");
        assert_eq!(result.confidence, 1.0);
    }
}
