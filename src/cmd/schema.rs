//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::{
    async_utils::io::write_json,
    config::PipelineConfig,
    coords::{GeoPoint, RawCoordinatePair},
    prelude::*,
    server::{ErrorResponse, UploadResponse},
};

/// The different schema types we support.
///
/// We parse these as PascalCase, because they represent type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "PascalCase")]
pub enum SchemaType {
    /// A northing/easting pair, as output by `extract` and `parse`.
    RawCoordinatePair,
    /// A `[latitude, longitude]` pair, as output by `project`.
    GeoPoint,
    /// Successful `POST /upload` response.
    UploadResponse,
    /// Error response from the server.
    ErrorResponse,
    /// The `--config` file format.
    PipelineConfig,
}

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The schema type to generate.
    #[clap(value_enum, value_name = "TYPE")]
    pub schema_type: SchemaType,

    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    // Get our schema.
    let schema = match schema_opts.schema_type {
        SchemaType::RawCoordinatePair => schema_for!(RawCoordinatePair),
        SchemaType::GeoPoint => schema_for!(GeoPoint),
        SchemaType::UploadResponse => schema_for!(UploadResponse),
        SchemaType::ErrorResponse => schema_for!(ErrorResponse),
        SchemaType::PipelineConfig => schema_for!(PipelineConfig),
    };

    // Write out our schema.
    write_json(schema_opts.output_path.as_deref(), &schema).await
}
