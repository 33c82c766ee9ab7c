//! Tesseract OCR engine.

use tokio::{fs, process::Command};

use super::{OcrEngine, check_image};
use crate::{
    async_utils::{TESSERACT_ERROR_REGEX, check_for_command_failure},
    config::OcrConfig,
    cpu_limit::with_cpu_semaphore,
    prelude::*,
};

/// OCR engine wrapping the `tesseract` CLI tool.
#[derive(Debug)]
pub struct TesseractOcrEngine {
    /// The executable to run.
    command: PathBuf,
    /// The language to pass with `-l`, if any.
    language: Option<String>,
}

impl TesseractOcrEngine {
    /// Create a new `tesseract` engine.
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcrEngine {
    #[instrument(level = "debug", skip_all, fields(path = %image_path.display()))]
    async fn extract_text(&self, image_path: &Path) -> Result<String> {
        check_image(image_path)?;

        // Tesseract appends `.txt` to the output base name we give it.
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")?;
        let output_base = tmpdir.path().join("output");
        let output_path = tmpdir.path().join("output.txt");

        let mut command = Command::new(&self.command);
        command.arg(image_path).arg(&output_base);
        if let Some(language) = &self.language {
            command.arg("-l").arg(language);
        }
        let program = self.command.display().to_string();
        let output = with_cpu_semaphore(move || async move {
            command
                .output()
                .await
                .with_context(|| format!("cannot run {}", program))
        })
        .await?;
        check_for_command_failure("tesseract", &output, Some(&TESSERACT_ERROR_REGEX))?;

        let text = fs::read_to_string(&output_path)
            .await
            .context("cannot read tesseract output file")?;
        debug!(text_len = text.len(), "Recognized text");
        Ok(text)
    }
}
