//! The `map` subcommand.

use clap::Args;
use tokio::fs;

use crate::{
    async_utils::io::write_text,
    config::ConfigOpts,
    data_url::data_url,
    map::{Report, ReportRow},
    ocr::check_image,
    pipeline::{Pipeline, PipelineOutput},
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// Map command line arguments.
#[derive(Debug, Args)]
pub struct MapOpts {
    #[clap(flatten)]
    pub config: ConfigOpts,

    /// The survey image (PNG or JPEG).
    #[clap(value_name = "IMAGE")]
    pub image_path: PathBuf,

    /// Where to write the map.
    #[clap(short = 'o', long = "out")]
    pub output_path: PathBuf,

    /// Add a satellite imagery layer.
    #[clap(long)]
    pub satellite: bool,

    /// Also write a report page showing the image, its text and the map.
    #[clap(long = "report", value_name = "PATH")]
    pub report_path: Option<PathBuf>,
}

/// The `map` subcommand.
#[instrument(level = "debug", skip_all, fields(image = %opts.image_path.display()))]
pub async fn cmd_map(ui: Ui, opts: &MapOpts) -> Result<()> {
    let pipeline = super::load_pipeline(&opts.config).await?;

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🗺️",
        msg: "Mapping survey image",
        done_msg: "Mapped survey image",
    });
    let output = pipeline.run(&opts.image_path, opts.satellite).await?;
    spinner.finish_using_style();

    info!("Extracted text:\n{}", output.text);
    info!(
        "Found {} coordinate pairs, converted {}",
        output.pairs.len(),
        output.conversion.converted.len()
    );
    let center = output.map.center;
    info!("Map centered on {:.8}, {:.8}", center.lat(), center.lon());
    for (raw, point) in &output.conversion.converted {
        info!(
            "{} {} → {:.8}, {:.8}",
            raw.northing,
            raw.easting,
            point.lat(),
            point.lon()
        );
    }

    write_text(&opts.output_path, &output.map.html).await?;
    info!("Wrote map to {:?}", opts.output_path);

    if let Some(report_path) = &opts.report_path {
        let html = render_report(&pipeline, &opts.image_path, &output).await?;
        write_text(report_path, &html).await?;
        info!("Wrote report to {:?}", report_path);
    }
    Ok(())
}

/// Render a report page for `output`, embedding the source image.
async fn render_report(
    pipeline: &Pipeline,
    image_path: &Path,
    output: &PipelineOutput,
) -> Result<String> {
    let mime_type = check_image(image_path)?;
    let image = fs::read(image_path)
        .await
        .with_context(|| format!("cannot read {:?}", image_path))?;
    let source = image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_path.display().to_string());

    let report = Report {
        source: &source,
        image_data_url: Some(data_url(mime_type, &image)),
        text: &output.text,
        rows: output
            .conversion
            .converted
            .iter()
            .map(|&(raw, point)| ReportRow::new(raw, point))
            .collect(),
        skipped: output
            .conversion
            .skipped
            .iter()
            .map(|skipped| {
                format!(
                    "{} {}: {}",
                    skipped.pair.northing, skipped.pair.easting, skipped.reason
                )
            })
            .collect(),
        map_html: &output.map.html,
    };
    pipeline.renderer().render_report(&report)
}
