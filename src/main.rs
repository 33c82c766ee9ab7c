use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod async_utils;
mod cmd;
mod config;
mod coords;
mod cpu_limit;
mod data_url;
mod error;
mod map;
mod ocr;
mod pipeline;
mod prelude;
mod server;
mod ui;

/// Extract UTM coordinates from land-survey images and map them.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - TESSERACT_CMD (optional): The `tesseract` executable to run.
  - RUST_LOG (optional): Log filter, such as `debug` or `survey_mapper=trace`.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// OCR a survey image and print the northing/easting pairs found.
    Extract(cmd::extract::ExtractOpts),
    /// Find northing/easting pairs in text.
    Parse(cmd::parse::ParseOpts),
    /// Convert one northing/easting pair to latitude/longitude.
    Project(cmd::project::ProjectOpts),
    /// OCR a survey image and write a map of its coordinates.
    Map(cmd::map::MapOpts),
    /// Run the upload server.
    Serve(cmd::serve::ServeOpts),
    /// Print schemas for input and output formats.
    Schema(cmd::schema::SchemaOpts),
}

impl Cmd {
    /// Are we using stdout for output?
    fn using_stdout_for_output(&self) -> bool {
        match self {
            Cmd::Extract(opts) => opts.output_path.is_none(),
            Cmd::Parse(opts) => opts.output_path.is_none(),
            Cmd::Project(opts) => opts.output_path.is_none(),
            Cmd::Map(_) | Cmd::Serve(_) => false,
            Cmd::Schema(opts) => opts.output_path.is_none(),
        }
    }
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);
    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Hide the spinners if we're using stdout for output.
    if opts.subcmd.using_stdout_for_output() {
        ui.hide_progress_bars();
    }

    // Run the appropriate subcommand.
    match &opts.subcmd {
        Cmd::Extract(opts) => cmd::extract::cmd_extract(ui, opts).await,
        Cmd::Parse(opts) => cmd::parse::cmd_parse(opts).await,
        Cmd::Project(opts) => cmd::project::cmd_project(opts).await,
        Cmd::Map(opts) => cmd::map::cmd_map(ui, opts).await,
        Cmd::Serve(opts) => cmd::serve::cmd_serve(opts).await,
        Cmd::Schema(opts) => cmd::schema::cmd_schema(opts).await,
    }
}
