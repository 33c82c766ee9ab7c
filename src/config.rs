//! Pipeline configuration.
//!
//! Values come from three layers: built-in defaults, an optional TOML or JSON
//! config file, and command-line flags (some of which may also be set through
//! environment variables or a `.env` file).

use clap::Args;
use schemars::JsonSchema;

use crate::{
    async_utils::io::read_json_or_toml,
    coords::projection::{Hemisphere, UtmZone},
    prelude::*,
};

/// Default satellite tile source.
pub const DEFAULT_SATELLITE_TILES: &str = "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

/// Everything needed to build a [`crate::pipeline::Pipeline`].
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// OCR engine settings.
    #[serde(default)]
    pub ocr: OcrConfig,

    /// The UTM zone that coordinates on our documents are in.
    #[serde(default)]
    pub projection: UtmZone,

    /// Map rendering settings.
    #[serde(default)]
    pub map: MapConfig,
}

/// Settings for the `tesseract` OCR engine.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OcrConfig {
    /// The `tesseract` executable. Looked up on `PATH` unless absolute.
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: PathBuf,

    /// Tesseract language code, such as `eng`. Uses Tesseract's default if
    /// unset.
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: default_tesseract_cmd(),
            language: None,
        }
    }
}

fn default_tesseract_cmd() -> PathBuf {
    PathBuf::from("tesseract")
}

/// Settings for rendered maps.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MapConfig {
    /// Initial zoom level.
    #[serde(default = "default_zoom_start")]
    pub zoom_start: u8,

    /// Satellite tile URL template, with `{z}`, `{x}` and `{y}` placeholders.
    #[serde(default = "default_satellite_tiles")]
    pub satellite_tiles: String,

    /// Attribution shown for the satellite layer.
    #[serde(default = "default_satellite_attribution")]
    pub satellite_attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom_start: default_zoom_start(),
            satellite_tiles: default_satellite_tiles(),
            satellite_attribution: default_satellite_attribution(),
        }
    }
}

fn default_zoom_start() -> u8 {
    15
}

fn default_satellite_tiles() -> String {
    DEFAULT_SATELLITE_TILES.to_owned()
}

fn default_satellite_attribution() -> String {
    "Esri".to_owned()
}

/// Command-line options which override [`PipelineConfig`].
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigOpts {
    /// A TOML or JSON config file.
    #[clap(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// The `tesseract` executable to run.
    #[clap(long = "tesseract", env = "TESSERACT_CMD", value_name = "PATH")]
    pub tesseract_cmd: Option<PathBuf>,

    /// Tesseract language code, such as `eng`.
    #[clap(long)]
    pub ocr_language: Option<String>,

    /// The UTM zone number (1-60) of coordinates on the document.
    #[clap(long, value_parser = clap::value_parser!(u8).range(1..=60))]
    pub utm_zone: Option<u8>,

    /// Coordinates use the southern hemisphere's false northing.
    #[clap(long)]
    pub south: bool,
}

impl ConfigOpts {
    /// Load our config file, if any, and apply our overrides.
    #[instrument(level = "debug", skip_all)]
    pub async fn load(&self) -> Result<PipelineConfig> {
        let config = match &self.config_path {
            Some(path) => read_json_or_toml::<PipelineConfig>(path).await?,
            None => PipelineConfig::default(),
        };
        let config = self.apply(config);
        debug!(?config, "Loaded pipeline configuration");
        Ok(config)
    }

    /// Apply command-line overrides to `config`.
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(cmd) = &self.tesseract_cmd {
            config.ocr.tesseract_cmd = cmd.clone();
        }
        if let Some(language) = &self.ocr_language {
            config.ocr.language = Some(language.clone());
        }
        if let Some(number) = self.utm_zone {
            config.projection.number = number;
        }
        if self.south {
            config.projection.hemisphere = Hemisphere::South;
        }
        config
    }
}
