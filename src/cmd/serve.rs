//! The `serve` subcommand.

use std::{net::SocketAddr, num::NonZeroUsize};

use clap::Args;

use crate::{
    config::ConfigOpts,
    prelude::*,
    server::{self, AppState},
};

/// Serve command line arguments.
#[derive(Debug, Args)]
pub struct ServeOpts {
    #[clap(flatten)]
    pub config: ConfigOpts,

    /// The address to listen on.
    #[clap(long, default_value = "0.0.0.0:5000")]
    pub addr: SocketAddr,

    /// Where to store rendered maps. Defaults to a temporary directory which is
    /// removed on shutdown.
    #[clap(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// How many of the newest maps to keep. Older maps written by this server
    /// are deleted. Files left by earlier runs are not touched.
    #[clap(long, value_name = "COUNT", default_value = "100")]
    pub keep_maps: NonZeroUsize,
}

/// The `serve` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_serve(opts: &ServeOpts) -> Result<()> {
    let pipeline = super::load_pipeline(&opts.config).await?;
    let state = AppState::new(pipeline, opts.data_dir.as_deref(), opts.keep_maps).await?;
    info!(
        "Starting survey-mapper server v{}",
        env!("CARGO_PKG_VERSION")
    );
    server::serve(opts.addr, state).await
}
