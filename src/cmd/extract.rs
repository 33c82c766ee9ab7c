//! The `extract` subcommand.

use clap::Args;

use crate::{
    async_utils::io::write_json,
    config::ConfigOpts,
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// Extract command line arguments.
#[derive(Debug, Args)]
pub struct ExtractOpts {
    #[clap(flatten)]
    pub config: ConfigOpts,

    /// The survey image (PNG or JPEG).
    #[clap(value_name = "IMAGE")]
    pub image_path: PathBuf,

    /// Write the coordinate pairs here instead of stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `extract` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_extract(ui: Ui, opts: &ExtractOpts) -> Result<()> {
    let pipeline = super::load_pipeline(&opts.config).await?;

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🔍",
        msg: "Reading survey image",
        done_msg: "Read survey image",
    });
    let (text, pairs) = pipeline.extract_coordinates(&opts.image_path).await?;
    spinner.finish_using_style();

    info!("Extracted text:\n{}", text);
    if pairs.is_empty() {
        warn!("No coordinates found in {:?}", opts.image_path);
    }
    write_json(opts.output_path.as_deref(), &pairs).await
}
