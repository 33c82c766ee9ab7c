//! The survey pipeline: image → text → coordinate pairs → lat/lon → map.
//!
//! Each stage runs to completion before the next starts, and the first stage
//! to fail ends the run.

use std::sync::Arc;

use crate::{
    config::PipelineConfig,
    coords::{
        GeoPoint, RawCoordinatePair,
        parse::parse_coordinates,
        projection::{ProjectionError, UtmProjection},
    },
    error::PipelineError,
    map::{MapDocument, MapRenderer},
    ocr::{OcrEngine, ocr_engine_for_config},
    prelude::*,
};

/// A coordinate pair which could not be projected.
#[derive(Clone, Debug)]
pub struct SkippedPair {
    pub pair: RawCoordinatePair,
    pub reason: ProjectionError,
}

/// The result of projecting a batch of pairs.
#[derive(Clone, Debug, Default)]
pub struct Conversion {
    /// Successfully projected pairs, in input order.
    pub converted: Vec<(RawCoordinatePair, GeoPoint)>,
    /// Pairs we had to skip, in input order.
    pub skipped: Vec<SkippedPair>,
}

impl Conversion {
    /// Just the converted points.
    pub fn points(&self) -> Vec<GeoPoint> {
        self.converted.iter().map(|(_, point)| *point).collect()
    }
}

/// Everything produced by one pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub text: String,
    pub pairs: Vec<RawCoordinatePair>,
    pub conversion: Conversion,
    pub map: MapDocument,
}

/// Our processing pipeline.
pub struct Pipeline {
    engine: Arc<dyn OcrEngine>,
    projection: UtmProjection,
    renderer: MapRenderer,
}

impl Pipeline {
    /// Build a pipeline using the OCR engine described by `config`.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Self::with_engine(config, ocr_engine_for_config(&config.ocr))
    }

    /// Build a pipeline around a specific OCR engine.
    pub fn with_engine(config: &PipelineConfig, engine: Arc<dyn OcrEngine>) -> Result<Self> {
        let projection = UtmProjection::new(config.projection)
            .context("invalid projection configuration")?;
        let renderer = MapRenderer::new(config.map.clone())?;
        Ok(Self {
            engine,
            projection,
            renderer,
        })
    }

    /// Our map renderer.
    pub fn renderer(&self) -> &MapRenderer {
        &self.renderer
    }

    /// Recognize the text in an image.
    #[instrument(level = "debug", skip_all, fields(path = %image_path.display()))]
    pub async fn extract_text(&self, image_path: &Path) -> Result<String, PipelineError> {
        let text = self
            .engine
            .extract_text(image_path)
            .await
            .map_err(PipelineError::Ocr)?;
        debug!(%text, "Extracted text");
        Ok(text)
    }

    /// Recognize the text in an image and find all the coordinate pairs in it.
    /// Finding no pairs is not an error here.
    pub async fn extract_coordinates(
        &self,
        image_path: &Path,
    ) -> Result<(String, Vec<RawCoordinatePair>), PipelineError> {
        let text = self.extract_text(image_path).await?;
        let pairs = parse_coordinates(&text);
        Ok((text, pairs))
    }

    /// Project each pair, skipping (and logging) those that fail.
    #[instrument(level = "debug", skip_all, fields(pairs = pairs.len()))]
    pub fn convert(&self, pairs: &[RawCoordinatePair]) -> Conversion {
        let mut conversion = Conversion::default();
        for &pair in pairs {
            match self.projection.to_geo(pair) {
                Ok(point) => conversion.converted.push((pair, point)),
                Err(reason) => {
                    warn!(
                        northing = pair.northing,
                        easting = pair.easting,
                        %reason,
                        "Skipping coordinate pair"
                    );
                    conversion.skipped.push(SkippedPair { pair, reason });
                }
            }
        }
        conversion
    }

    /// Project `pairs` and render them as a map.
    pub fn map_pairs(
        &self,
        pairs: &[RawCoordinatePair],
        satellite: bool,
    ) -> Result<(Conversion, MapDocument), PipelineError> {
        if pairs.is_empty() {
            return Err(PipelineError::NoCoordinates);
        }
        let conversion = self.convert(pairs);
        if conversion.converted.is_empty() {
            let first = conversion
                .skipped
                .first()
                .map(|skipped| skipped.reason.clone())
                .ok_or(PipelineError::NoCoordinates)?;
            return Err(PipelineError::ConversionFailed(first));
        }
        let map = self.renderer.render(&conversion.points(), satellite)?;
        Ok((conversion, map))
    }

    /// Run the whole pipeline on one image.
    #[instrument(level = "debug", skip_all, fields(path = %image_path.display(), satellite = satellite))]
    pub async fn run(
        &self,
        image_path: &Path,
        satellite: bool,
    ) -> Result<PipelineOutput, PipelineError> {
        let (text, pairs) = self.extract_coordinates(image_path).await?;
        let (conversion, map) = self.map_pairs(&pairs, satellite)?;
        info!(
            found = pairs.len(),
            converted = conversion.converted.len(),
            skipped = conversion.skipped.len(),
            "Mapped survey coordinates"
        );
        Ok(PipelineOutput {
            text,
            pairs,
            conversion,
            map,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ocr::StaticTextOcrEngine;

    use super::*;

    fn pipeline(engine: Arc<dyn OcrEngine>) -> Pipeline {
        Pipeline::with_engine(&PipelineConfig::default(), engine).unwrap()
    }

    // The static engine never opens the image.
    fn image() -> &'static Path {
        Path::new("survey.png")
    }

    #[tokio::test]
    async fn runs_end_to_end() {
        let pipeline = pipeline(StaticTextOcrEngine::new(
            "Plot 12\nA 2615968.84 584283.08\nB 2615990.10 584301.55\n",
        ));
        let output = pipeline.run(image(), false).await.unwrap();
        assert_eq!(output.pairs.len(), 2);
        assert_eq!(output.conversion.converted.len(), 2);
        assert!(output.conversion.skipped.is_empty());
        assert_eq!(output.map.markers.len(), 2);

        let center = output.map.center;
        assert!((center.lat() - 23.65223489035807).abs() < 1e-9);
        assert!((center.lon() - 57.826426702652626).abs() < 1e-9);
        assert_eq!(output.map.html.matches("L.marker(").count(), 2);
    }

    #[tokio::test]
    async fn ocr_failures_are_reported() {
        let pipeline = pipeline(StaticTextOcrEngine::failing("engine exploded"));
        let err = pipeline.run(image(), false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(_)));
        assert!(err.user_message().contains("engine exploded"));
    }

    #[tokio::test]
    async fn text_without_pairs_is_reported() {
        let pipeline = pipeline(StaticTextOcrEngine::new("Scale 1:500\n"));
        let err = pipeline.run(image(), false).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoCoordinates));
        assert_eq!(err.user_message(), "No coordinates found in image");
    }

    #[tokio::test]
    async fn extracting_without_pairs_is_not_an_error() {
        let pipeline = pipeline(StaticTextOcrEngine::new(""));
        let (text, pairs) = pipeline.extract_coordinates(image()).await.unwrap();
        assert!(text.is_empty());
        assert!(pairs.is_empty());
    }

    #[test]
    fn bad_pairs_are_skipped() {
        let pipeline = pipeline(StaticTextOcrEngine::new(""));
        let good = RawCoordinatePair {
            northing: 2615968.84,
            easting: 584283.08,
        };
        let bad = RawCoordinatePair {
            northing: 2615968.84,
            easting: 20_000_000.0,
        };
        let conversion = pipeline.convert(&[bad, good]);
        assert_eq!(conversion.converted.len(), 1);
        assert_eq!(conversion.converted[0].0, good);
        assert_eq!(conversion.skipped.len(), 1);
        assert_eq!(conversion.skipped[0].pair, bad);
        assert!(matches!(
            conversion.skipped[0].reason,
            ProjectionError::OutOfDomain(..)
        ));
    }

    #[test]
    fn all_pairs_failing_is_a_conversion_failure() {
        let pipeline = pipeline(StaticTextOcrEngine::new(""));
        let bad = RawCoordinatePair {
            northing: 2615968.84,
            easting: 20_000_000.0,
        };
        let err = pipeline.map_pairs(&[bad], false).unwrap_err();
        assert!(matches!(err, PipelineError::ConversionFailed(_)));
        assert_eq!(err.user_message(), "Failed to convert coordinates");
    }

    #[test]
    fn invalid_zone_is_rejected() {
        let mut config = PipelineConfig::default();
        config.projection.number = 61;
        assert!(Pipeline::with_engine(&config, StaticTextOcrEngine::new("")).is_err());
    }
}
