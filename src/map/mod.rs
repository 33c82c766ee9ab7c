//! Rendering converted coordinates as an interactive map.
//!
//! Maps are standalone HTML documents which load [Leaflet](https://leafletjs.com/)
//! and tiles from public servers, so they can be opened from disk, served over
//! HTTP, or embedded in an `<iframe>`.

use handlebars::Handlebars;

use crate::{
    config::MapConfig,
    coords::{GeoPoint, RawCoordinatePair},
    error::PipelineError,
    prelude::*,
};

/// Template for the map document.
const MAP_TEMPLATE: &str = include_str!("map.hbs");

/// Template for a full report, including the map.
const REPORT_TEMPLATE: &str = include_str!("report.hbs");

/// A rendered map.
#[derive(Clone, Debug)]
pub struct MapDocument {
    /// Where the map is initially centered. Always the first marker.
    pub center: GeoPoint,
    /// One marker per point, in order.
    pub markers: Vec<GeoPoint>,
    /// The HTML document.
    pub html: String,
}

/// One row of the coordinate table in a report.
#[derive(Clone, Debug, Serialize)]
pub struct ReportRow {
    pub northing: f64,
    pub easting: f64,
    pub lat: f64,
    pub lon: f64,
}

impl ReportRow {
    pub fn new(raw: RawCoordinatePair, point: GeoPoint) -> Self {
        Self {
            northing: raw.northing,
            easting: raw.easting,
            lat: point.lat(),
            lon: point.lon(),
        }
    }
}

/// Everything shown in a report page.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    /// Where the image came from, usually a file name.
    pub source: &'a str,
    /// The source image, as a `data:` URL.
    pub image_data_url: Option<String>,
    /// The OCR output.
    pub text: &'a str,
    /// Converted coordinates.
    pub rows: Vec<ReportRow>,
    /// Descriptions of coordinates we couldn't convert.
    pub skipped: Vec<String>,
    /// The map document to embed.
    pub map_html: &'a str,
}

#[derive(Serialize)]
struct MarkerView {
    lat: f64,
    lon: f64,
    label_js: String,
}

#[derive(Serialize)]
struct TileLayerView {
    url_js: String,
    attribution_js: String,
}

#[derive(Serialize)]
struct MapView {
    center: MarkerView,
    zoom: u8,
    markers: Vec<MarkerView>,
    satellite: Option<TileLayerView>,
}

/// Renders [`MapDocument`]s and reports.
pub struct MapRenderer {
    handlebars: Handlebars<'static>,
    config: MapConfig,
}

impl MapRenderer {
    /// Create a renderer, compiling our templates.
    pub fn new(config: MapConfig) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string("map", MAP_TEMPLATE)
            .context("failed to compile map template")?;
        handlebars
            .register_template_string("report", REPORT_TEMPLATE)
            .context("failed to compile report template")?;
        Ok(Self { handlebars, config })
    }

    /// Render a map with one marker per point, centered on the first point.
    ///
    /// Fails if `points` is empty or contains anything but finite numbers.
    #[instrument(level = "debug", skip_all, fields(points = points.len(), satellite = satellite))]
    pub fn render(
        &self,
        points: &[GeoPoint],
        satellite: bool,
    ) -> Result<MapDocument, PipelineError> {
        let center = *points
            .first()
            .ok_or_else(|| PipelineError::Render("no coordinates to map".to_owned()))?;
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(PipelineError::Render(format!("invalid coordinate {bad:?}")));
        }

        let view = MapView {
            center: marker_view(center),
            zoom: self.config.zoom_start,
            markers: points.iter().copied().map(marker_view).collect(),
            satellite: satellite.then(|| TileLayerView {
                url_js: js_string(&self.config.satellite_tiles),
                attribution_js: js_string(&self.config.satellite_attribution),
            }),
        };
        let html = self
            .handlebars
            .render("map", &view)
            .map_err(|err| PipelineError::Render(err.to_string()))?;
        debug!(center = ?center, "Rendered map");
        Ok(MapDocument {
            center,
            markers: points.to_vec(),
            html,
        })
    }

    /// Render a report page embedding a map at 800×600.
    pub fn render_report(&self, report: &Report<'_>) -> Result<String> {
        self.handlebars
            .render("report", report)
            .context("failed to render report")
    }
}

fn marker_view(point: GeoPoint) -> MarkerView {
    MarkerView {
        lat: point.lat(),
        lon: point.lon(),
        label_js: js_string(&format!("{:.6}, {:.6}", point.lat(), point.lon())),
    }
}

/// Quote `s` as a JavaScript string literal that is safe inside `<script>`.
fn js_string(s: &str) -> String {
    // JSON strings are valid JavaScript. Escaping `<` keeps `</script>` out.
    serde_json::to_string(s)
        .expect("strings always serialize")
        .replace('<', "\\u003c")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> MapRenderer {
        MapRenderer::new(MapConfig::default()).unwrap()
    }

    fn points() -> Vec<GeoPoint> {
        vec![
            GeoPoint(23.65223489035807, 57.826426702652626),
            GeoPoint(23.6525, 57.8266),
            GeoPoint(23.6519, 57.8261),
        ]
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = renderer().render(&[], false).unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let err = renderer()
            .render(&[GeoPoint(23.6, 57.8), GeoPoint(f64::NAN, 57.8)], false)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[test]
    fn one_marker_per_point_centered_on_first() {
        let doc = renderer().render(&points(), false).unwrap();
        assert_eq!(doc.center, points()[0]);
        assert_eq!(doc.markers, points());
        assert_eq!(doc.html.matches("L.marker(").count(), 3);
        assert!(
            doc.html
                .contains("setView([23.65223489035807, 57.826426702652626], 15)"),
            "{}",
            doc.html
        );
        assert!(doc.html.contains("L.marker([23.6519, 57.8261])"));
    }

    #[test]
    fn satellite_layer_is_optional() {
        let plain = renderer().render(&points(), false).unwrap();
        assert!(!plain.html.contains("arcgisonline"));
        assert!(!plain.html.contains("L.control.layers"));

        let satellite = renderer().render(&points(), true).unwrap();
        assert!(satellite.html.contains(
            "\"https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}\""
        ));
        assert!(satellite.html.contains("attribution: \"Esri\""));
        assert!(satellite.html.contains("L.control.layers"));
    }

    #[test]
    fn zoom_comes_from_config() {
        let renderer = MapRenderer::new(MapConfig {
            zoom_start: 12,
            ..MapConfig::default()
        })
        .unwrap();
        let doc = renderer.render(&points()[..1], false).unwrap();
        assert!(doc.html.contains("], 12);"));
    }

    #[test]
    fn js_strings_cannot_close_script_tags() {
        assert_eq!(js_string("a</script>"), "\"a\\u003c/script>\"");
        assert_eq!(js_string("it's \"quoted\""), "\"it's \\\"quoted\\\"\"");
    }

    #[test]
    fn report_embeds_text_table_and_map() {
        let renderer = renderer();
        let doc = renderer.render(&points()[..1], false).unwrap();
        let html = renderer
            .render_report(&Report {
                source: "plot <7>.jpg",
                image_data_url: None,
                text: "Point A 2615968.84 584283.08",
                rows: vec![ReportRow::new(
                    RawCoordinatePair {
                        northing: 2615968.84,
                        easting: 584283.08,
                    },
                    points()[0],
                )],
                skipped: vec![],
                map_html: &doc.html,
            })
            .unwrap();
        assert!(html.contains("plot &lt;7&gt;.jpg"));
        assert!(html.contains("<pre>Point A 2615968.84 584283.08</pre>"));
        assert!(html.contains("<td>2615968.84</td><td>584283.08</td>"));
        assert!(html.contains("width=\"800\" height=\"600\""));
        // The map is escaped into the `srcdoc` attribute.
        assert!(html.contains("srcdoc=\"&lt;!DOCTYPE html&gt;"));
        assert!(!html.contains("Skipped coordinates"));
    }
}
