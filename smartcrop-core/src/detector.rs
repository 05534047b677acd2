//! Face detector boundary.
//!
//! The detection model is external. [`FaceDetector`] is the seam it plugs into, and
//! [`DetectionRunner`] calls it on a worker thread so a hung detector can be abandoned
//! after a bounded wait and retried.

use std::{
    sync::{Arc, mpsc},
    thread,
    time::Duration,
};

use image::DynamicImage;
use log::{debug, warn};
use thiserror::Error;

use crate::normalize::RawBoundingBox;

/// One untrusted detector result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// `None` when the detector produced a result without geometry.
    pub bbox: Option<RawBoundingBox>,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(bbox: RawBoundingBox, confidence: f32) -> Self {
        Self {
            bbox: Some(bbox),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("face detector unavailable: {0}")]
    Unavailable(String),
    #[error("face detection timed out after {0:?}")]
    Timeout(Duration),
    #[error("face detection worker stopped without a result")]
    Disconnected,
}

/// Produces raw face boxes for an image.
pub trait FaceDetector: Send + Sync {
    fn detect(
        &self,
        image_id: &str,
        image: &DynamicImage,
    ) -> Result<Vec<RawDetection>, DetectionError>;
}

/// Calls a [`FaceDetector`] with a timeout and bounded retries.
#[derive(Clone)]
pub struct DetectionRunner {
    detector: Arc<dyn FaceDetector>,
    timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl DetectionRunner {
    /// One attempt with a 30 second timeout.
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            detector,
            timeout: Duration::from_secs(30),
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow up to `max_attempts` attempts, sleeping `n * backoff` before retry `n`.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run detection, retrying failed attempts. Returns the last error if all fail.
    ///
    /// A timed-out worker thread is detached, not killed; its late result is discarded.
    pub fn detect(
        &self,
        image_id: &str,
        image: &Arc<DynamicImage>,
    ) -> Result<Vec<RawDetection>, DetectionError> {
        let mut attempt = 1;
        loop {
            match self.attempt(image_id, image) {
                Ok(detections) => {
                    debug!(
                        "{image_id}: detector returned {} result(s) on attempt {attempt}",
                        detections.len()
                    );
                    return Ok(detections);
                }
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        "{image_id}: detection attempt {attempt}/{} failed: {err}",
                        self.max_attempts
                    );
                    thread::sleep(self.backoff * attempt);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn attempt(
        &self,
        image_id: &str,
        image: &Arc<DynamicImage>,
    ) -> Result<Vec<RawDetection>, DetectionError> {
        let (tx, rx) = mpsc::channel();
        let detector = Arc::clone(&self.detector);
        let image = Arc::clone(image);
        let id = image_id.to_string();
        thread::Builder::new()
            .name(format!("detect-{id}"))
            .spawn(move || {
                // The receiver is gone if the caller already timed out.
                let _ = tx.send(detector.detect(&id, &image));
            })
            .map_err(|err| DetectionError::Unavailable(format!("failed to spawn worker: {err}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(DetectionError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DetectionError::Disconnected),
        }
    }
}
