//! The `project` subcommand.

use clap::Args;

use crate::{
    async_utils::io::write_json,
    config::ConfigOpts,
    coords::{GeoPoint, RawCoordinatePair, projection::UtmProjection},
    prelude::*,
};

/// Project command line arguments.
#[derive(Debug, Args)]
pub struct ProjectOpts {
    #[clap(flatten)]
    pub config: ConfigOpts,

    /// Northing in meters, or latitude with `--forward`.
    #[clap(allow_negative_numbers = true)]
    pub first: f64,

    /// Easting in meters, or longitude with `--forward`.
    #[clap(allow_negative_numbers = true)]
    pub second: f64,

    /// Convert latitude and longitude to northing and easting instead.
    #[clap(long)]
    pub forward: bool,

    /// Write the result here instead of stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `project` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_project(opts: &ProjectOpts) -> Result<()> {
    let config = opts.config.load().await?;
    let projection = UtmProjection::new(config.projection)?;
    debug!(zone = ?projection.zone(), forward = opts.forward, "Projecting");
    let output = opts.output_path.as_deref();
    if opts.forward {
        let pair = projection.from_geo(GeoPoint(opts.first, opts.second))?;
        write_json(output, &pair).await
    } else {
        let point = projection.to_geo(RawCoordinatePair {
            northing: opts.first,
            easting: opts.second,
        })?;
        write_json(output, &point).await
    }
}
