//! Finding northing/easting pairs in OCR output.

use std::sync::LazyLock;

use regex::Regex;

use super::RawCoordinatePair;
use crate::prelude::*;

/// A 7-digit northing followed by whitespace and a 6-digit easting, both with
/// a fractional part. The leading group stops us from matching the tail end of
/// a longer number.
static PAIR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{7}\.[0-9]+)\s+([0-9]{6}\.[0-9]+)")
        .expect("failed to compile regex")
});

/// Extract every northing/easting pair from `text`, in document order.
///
/// Only the exact 7-digit/6-digit shape used by large UTM values is
/// recognized. Anything else is ignored, and text with no pairs returns an
/// empty list.
#[instrument(level = "debug", skip_all, fields(text_len = text.len()))]
pub fn parse_coordinates(text: &str) -> Vec<RawCoordinatePair> {
    let pairs = PAIR_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            // The regex only admits ASCII digits and a dot, so these can't fail.
            let northing = caps[1].parse::<f64>().ok()?;
            let easting = caps[2].parse::<f64>().ok()?;
            Some(RawCoordinatePair { northing, easting })
        })
        .collect::<Vec<_>>();
    debug!(count = pairs.len(), "Parsed coordinate pairs");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(northing: f64, easting: f64) -> RawCoordinatePair {
        RawCoordinatePair { northing, easting }
    }

    #[test]
    fn finds_single_pair() {
        assert_eq!(
            parse_coordinates("Point A 2615968.84 584283.08"),
            vec![pair(2615968.84, 584283.08)]
        );
    }

    #[test]
    fn returns_empty_without_matches() {
        assert!(parse_coordinates("").is_empty());
        assert!(parse_coordinates("Plot 12, area 450.5 sq m").is_empty());
        assert!(parse_coordinates("2615968 584283").is_empty());
    }

    #[test]
    fn keeps_document_order() {
        let text = "\
STATION  NORTHING     EASTING
P1       2615968.84   584283.08
P2       2615990.10   584301.55
P3       2615950.00   584270.9
";
        assert_eq!(
            parse_coordinates(text),
            vec![
                pair(2615968.84, 584283.08),
                pair(2615990.10, 584301.55),
                pair(2615950.00, 584270.9),
            ]
        );
    }

    #[test]
    fn allows_newlines_between_values() {
        assert_eq!(
            parse_coordinates("2615968.84\n584283.08"),
            vec![pair(2615968.84, 584283.08)]
        );
    }

    #[test]
    fn rejects_wrong_digit_counts() {
        // Six digits in the northing.
        assert!(parse_coordinates("615968.84 584283.08").is_empty());
        // Eight digits in the northing.
        assert!(parse_coordinates("12615968.84 584283.08").is_empty());
        // Seven digits in the easting.
        assert!(parse_coordinates("2615968.84 5842830.08").is_empty());
        // Five digits in the easting.
        assert!(parse_coordinates("2615968.84 84283.08").is_empty());
    }

    #[test]
    fn requires_fractional_parts() {
        assert!(parse_coordinates("2615968. 584283.08").is_empty());
        assert!(parse_coordinates("2615968.84 584283").is_empty());
    }

    #[test]
    fn matches_after_non_digit_prefix() {
        assert_eq!(
            parse_coordinates("N:2615968.84 584283.08"),
            vec![pair(2615968.84, 584283.08)]
        );
    }

    #[test]
    fn adjacent_rows_on_one_line() {
        assert_eq!(
            parse_coordinates("2615968.84 584283.08 2615990.10 584301.55").len(),
            2
        );
    }
}
