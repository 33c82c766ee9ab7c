//! Errors reported by the survey pipeline.
//!
//! Each stage of the pipeline returns one of these, so that front ends can
//! decide for themselves whether to print a message, return an HTTP error, or
//! exit. Internals still use [`anyhow`] for context chains, and we keep that
//! chain around as the source of the error.

use crate::coords::projection::ProjectionError;

/// Something went wrong while processing a single survey image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// We couldn't read the image, or the OCR engine failed.
    #[error("OCR failed: {0:#}")]
    Ocr(#[source] anyhow::Error),

    /// The OCR text contained no northing/easting pairs.
    #[error("No coordinates found in image")]
    NoCoordinates,

    /// Every pair we found failed to project. The first failure is kept.
    #[error("Failed to convert coordinates")]
    ConversionFailed(#[source] ProjectionError),

    /// We couldn't render a map for the converted points.
    #[error("Failed to create map: {0}")]
    Render(String),
}

impl PipelineError {
    /// A short, stable message suitable for showing to end users.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Ocr(err) => format!("Failed to read image: {err:#}"),
            PipelineError::NoCoordinates => "No coordinates found in image".to_owned(),
            PipelineError::ConversionFailed(_) => {
                "Failed to convert coordinates".to_owned()
            }
            PipelineError::Render(_) => "Failed to create map".to_owned(),
        }
    }
}
