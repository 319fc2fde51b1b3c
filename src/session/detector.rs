//! Object Detection
//!
//! The detector is an external capability: given a captured image it
//! yields labelled candidates. Model loading and inference live outside
//! this crate.

use async_trait::async_trait;

use crate::game::state::Candidate;

/// Detector errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectorError {
    /// Model not loaded or not available on this device.
    #[error("detector unavailable: {0}")]
    Unavailable(String),

    /// Inference failed for this image.
    #[error("detection failed: {0}")]
    Failed(String),
}

/// Produces candidate labels for an image.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect objects in `image` (encoded image bytes).
    async fn detect(&self, image: &[u8]) -> Result<Vec<Candidate>, DetectorError>;
}

#[async_trait]
impl<'a, D: Detector + ?Sized> Detector for &'a D {
    async fn detect(&self, image: &[u8]) -> Result<Vec<Candidate>, DetectorError> {
        (**self).detect(image).await
    }
}

/// Detector that ignores the image and returns a fixed list.
///
/// Used for demos and tests when no model is available.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedDetector {
    candidates: Vec<Candidate>,
}

impl FixedDetector {
    /// Detector returning `candidates` for every image.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Detector that always sees a single object.
    pub fn seeing(label: &str, confidence: f32) -> Self {
        Self::new(vec![Candidate::new(label, confidence)])
    }

    /// The demo-mode list.
    pub fn demo() -> Self {
        Self::new(vec![
            Candidate::new("person", 0.95),
            Candidate::new("car", 0.87),
            Candidate::new("bottle", 0.82),
            Candidate::new("book", 0.78),
            Candidate::new("phone", 0.75),
        ])
    }

    /// Candidates returned on each call.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

impl Default for FixedDetector {
    fn default() -> Self {
        Self::demo()
    }
}

#[async_trait]
impl Detector for FixedDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<Candidate>, DetectorError> {
        Ok(self.candidates.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Detector that always fails.
    pub(crate) struct Offline;

    #[async_trait]
    impl Detector for Offline {
        async fn detect(&self, _image: &[u8]) -> Result<Vec<Candidate>, DetectorError> {
            Err(DetectorError::Unavailable("model not loaded".into()))
        }
    }

    #[tokio::test]
    async fn test_fixed_detector_ignores_image() {
        let detector = FixedDetector::demo();
        let a = detector.detect(b"first").await.unwrap();
        let b = detector.detect(&[]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a[0], Candidate::new("person", 0.95));
    }

    #[tokio::test]
    async fn test_detector_by_reference() {
        let detector = FixedDetector::seeing("cup", 0.9);
        let by_ref = &detector;
        assert_eq!(by_ref.detect(&[]).await.unwrap(), vec![Candidate::new("cup", 0.9)]);
        assert!(Offline.detect(&[]).await.is_err());
    }
}
