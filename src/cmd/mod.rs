//! Command-line entry points.

use crate::{config::ConfigOpts, pipeline::Pipeline, prelude::*};

pub mod extract;
pub mod map;
pub mod parse;
pub mod project;
pub mod schema;
pub mod serve;

/// Load our configuration and build a pipeline from it.
async fn load_pipeline(config_opts: &ConfigOpts) -> Result<Pipeline> {
    let config = config_opts.load().await?;
    Pipeline::new(&config)
}
