//! OCR engine interface.
//!
//! The pipeline only needs one thing from OCR: the text in an image file. We
//! keep that behind [`OcrEngine`] so the rest of the pipeline can be tested
//! without a real engine installed.

use std::sync::Arc;

use crate::{config::OcrConfig, prelude::*};

pub mod tesseract;

/// Image types we accept as input.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// Interface to an OCR engine.
#[async_trait]
pub trait OcrEngine: Send + Sync + 'static {
    /// Recognize all the text in an image file.
    async fn extract_text(&self, image_path: &Path) -> Result<String>;
}

/// Get the OCR engine described by `config`.
pub fn ocr_engine_for_config(config: &OcrConfig) -> Arc<dyn OcrEngine> {
    Arc::new(tesseract::TesseractOcrEngine::new(config))
}

/// Make sure `path` is a PNG or JPEG that we can actually open, and return its
/// MIME type.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn check_image(path: &Path) -> Result<&'static str> {
    let mime_type = infer::get_from_path(path)
        .with_context(|| format!("cannot read {:?}", path))?
        .ok_or_else(|| anyhow!("unknown file type for {:?}", path))?
        .mime_type();
    if !SUPPORTED_IMAGE_TYPES.contains(&mime_type) {
        return Err(anyhow!(
            "unsupported file type {} for {:?} (expected PNG or JPEG)",
            mime_type,
            path
        ));
    }

    // Guess the format from the content, because uploads have arbitrary names.
    let reader = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .with_context(|| format!("cannot open {:?}", path))?;
    let (width, height) = reader
        .into_dimensions()
        .with_context(|| format!("cannot open {:?} as an image", path))?;
    debug!(mime_type, width, height, "Checked input image");
    Ok(mime_type)
}

/// An engine that "recognizes" the same text in every image.
#[cfg(test)]
pub struct StaticTextOcrEngine {
    pub text: Result<String, String>,
}

#[cfg(test)]
impl StaticTextOcrEngine {
    pub fn new(text: &str) -> Arc<dyn OcrEngine> {
        Arc::new(Self {
            text: Ok(text.to_owned()),
        })
    }

    pub fn failing(msg: &str) -> Arc<dyn OcrEngine> {
        Arc::new(Self {
            text: Err(msg.to_owned()),
        })
    }
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for StaticTextOcrEngine {
    async fn extract_text(&self, _image_path: &Path) -> Result<String> {
        self.text.clone().map_err(|msg| anyhow!(msg))
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn accepts_png_images() -> Result<()> {
        let dir = TempDir::with_prefix("check_image")?;
        let path = dir.path().join("survey.png");
        RgbImage::new(16, 8).save(&path)?;
        assert_eq!(check_image(&path)?, "image/png");
        Ok(())
    }

    #[test]
    fn accepts_jpeg_images() -> Result<()> {
        let dir = TempDir::with_prefix("check_image")?;
        let path = dir.path().join("survey.jpg");
        RgbImage::new(16, 8).save(&path)?;
        assert_eq!(check_image(&path)?, "image/jpeg");
        Ok(())
    }

    #[test]
    fn rejects_text_files() -> Result<()> {
        let dir = TempDir::with_prefix("check_image")?;
        let path = dir.path().join("notes.png");
        std::fs::write(&path, "2615968.84 584283.08")?;
        let err = check_image(&path).unwrap_err();
        assert!(err.to_string().contains("unknown file type"), "{err:#}");
        Ok(())
    }

    #[test]
    fn rejects_other_file_types() -> Result<()> {
        let dir = TempDir::with_prefix("check_image")?;
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n")?;
        let err = check_image(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"), "{err:#}");
        Ok(())
    }

    #[test]
    fn rejects_truncated_images() -> Result<()> {
        let dir = TempDir::with_prefix("check_image")?;
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n\0\0\0")?;
        let err = check_image(&path).unwrap_err();
        assert!(err.to_string().contains("cannot open"), "{err:#}");
        Ok(())
    }

    #[test]
    fn rejects_missing_files() {
        assert!(check_image(Path::new("/nonexistent/survey.png")).is_err());
    }
}
