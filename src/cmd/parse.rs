//! The `parse` subcommand.

use clap::Args;

use crate::{
    async_utils::io::{read_text_from_path_or_stdin, write_json},
    coords::parse::parse_coordinates,
    prelude::*,
};

/// Parse command line arguments.
#[derive(Debug, Args)]
pub struct ParseOpts {
    /// A text file, such as saved OCR output. Defaults to stdin.
    #[clap(value_name = "TEXT_FILE")]
    pub input_path: Option<PathBuf>,

    /// Write the coordinate pairs here instead of stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `parse` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_parse(opts: &ParseOpts) -> Result<()> {
    let text = read_text_from_path_or_stdin(opts.input_path.as_deref()).await?;
    let pairs = parse_coordinates(&text);
    if pairs.is_empty() {
        warn!("No coordinates found");
    }
    write_json(opts.output_path.as_deref(), &pairs).await
}
