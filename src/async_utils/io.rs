//! I/O utilities.
//!
//! This module is responsible for reading config files and text input, and
//! writing JSON and HTML output, to either files or the standard streams.

use tokio::{
    fs::{self, File},
    io::{AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _},
};

use crate::prelude::*;

/// Does this file's name or content suggest JSON rather than TOML?
fn looks_like_json(path: &Path, data: &str) -> bool {
    let ext = path.extension().unwrap_or_default();
    ext == "json" || data.trim_start().starts_with('{')
}

/// Read TOML or JSON from a file.
pub async fn read_json_or_toml<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    // Read all at once because our parsing libraries don't do async I/O.
    let data = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at path: {:?}", path))?;
    if looks_like_json(path, &data) {
        serde_json::from_str(&data).with_context(|| {
            format!("Failed to parse JSON from file at path: {:?}", path)
        })
    } else {
        toml::from_str(&data).with_context(|| {
            format!("Failed to parse TOML from file at path: {:?}", path)
        })
    }
}

/// Read all of a text file, or standard input if `path` is `None`.
pub async fn read_text_from_path_or_stdin(path: Option<&Path>) -> Result<String> {
    let mut text = String::new();
    match path {
        Some(path) => {
            File::open(path)
                .await
                .with_context(|| format!("Failed to open file at path: {:?}", path))?
                .read_to_string(&mut text)
                .await
                .with_context(|| format!("Failed to read file at path: {:?}", path))?;
        }
        None => {
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read standard input")?;
        }
    }
    Ok(text)
}

/// Create an [`AsyncWrite`] for a file or stdout.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write `value` as pretty-printed JSON to a file or stdout.
pub async fn write_json<T>(path: Option<&Path>, value: &T) -> Result<()>
where
    T: Serialize,
{
    let mut json =
        serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    json.push('\n');
    let mut wtr = create_writer(path).await?;
    wtr.write_all(json.as_bytes())
        .await
        .context("Failed to write JSON to output")?;
    wtr.flush().await.context("Failed to flush output")?;
    Ok(())
}

/// Write a text document to `path`, replacing any existing file.
pub async fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write file at path: {:?}", path))
}
