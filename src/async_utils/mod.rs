//! Helpers for async I/O and external commands.

use std::{process::Output, sync::LazyLock};

use regex::Regex;

use crate::prelude::*;

pub mod io;

/// Tesseract reports real failures on stderr with lines like
/// `Error in pixReadStream` or `Error, could not initialize tesseract`.
pub static TESSERACT_ERROR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Error\b").expect("failed to compile regex"));

/// Turn a finished command's [`Output`] into an error if it failed.
///
/// Both output streams are logged at `debug` level, because `tesseract` chats
/// on stderr even when it succeeds. If `error_regex` matches stderr, we treat
/// the run as failed despite a zero exit status.
pub fn check_for_command_failure(
    command_name: &str,
    output: &Output,
    error_regex: Option<&Regex>,
) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(command_name, %stdout, %stderr, status = %output.status, "Command finished");

    match output.status.code() {
        Some(0) if error_regex.is_some_and(|regex| regex.is_match(&stderr)) => {
            Err(anyhow!("{command_name} reported an error:\n{stderr}"))
        }
        Some(0) => Ok(()),
        Some(code) => Err(anyhow!(
            "{command_name} failed with exit code {code}:\n{stderr}"
        )),
        None => Err(anyhow!(
            "{command_name} was killed by a signal:\n{stderr}"
        )),
    }
}
