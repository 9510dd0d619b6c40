use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::{FILL_OPACITY, STROKE_COLOR, STROKE_WEIGHT};
use crate::feed::{feature_id, EarthquakeRecord, FeatureCollection};
use crate::html_template::popup_html;
use crate::mapper::{DepthColor, MarkerStyle, DEPTH_BANDS};

/// A circle as the map page draws it.
#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub id: Option<String>,
    pub position: (f64, f64),
    pub fill_color: DepthColor,
    /// Radius actually drawn, never below the configured minimum
    pub radius: f64,
    /// Radius straight from the magnitude, before clamping
    pub raw_radius: f64,
    pub magnitude: f64,
    pub depth: f64,
    pub color: &'static str,
    pub weight: f64,
    pub fill_opacity: f64,
    pub popup: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BandCount {
    pub label: &'static str,
    pub color: DepthColor,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    pub total_features: usize,
    pub mapped: usize,
    pub skipped: usize,
    /// Markers whose radius was raised to the minimum
    pub clamped: usize,
    pub bands: Vec<BandCount>,
    pub feed_title: Option<String>,
    pub generated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerSet {
    pub markers: Vec<Marker>,
    pub summary: ProcessingSummary,
}

/// Builds one marker per valid feature, in input order.
/// Invalid features are logged and skipped.
pub fn build_markers(collection: &FeatureCollection, min_radius: f64) -> MarkerSet {
    let total_features = collection.features.len();
    let mut markers = Vec::with_capacity(total_features);
    let mut band_counts = [0usize; DEPTH_BANDS.len()];
    let mut skipped = 0;
    let mut clamped = 0;

    for (index, feature) in collection.features.iter().enumerate() {
        let record = match EarthquakeRecord::try_from_value(feature) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Skipping feature #{} ({}): {:#}",
                    index,
                    feature_id(feature).as_deref().unwrap_or("no id"),
                    e
                );
                skipped += 1;
                continue;
            }
        };

        let marker = marker_for_record(&record, min_radius);
        if marker.radius != marker.raw_radius {
            debug!(
                "Radius for M{} raised from {} to {}",
                record.magnitude, marker.raw_radius, marker.radius
            );
            clamped += 1;
        }
        band_counts[marker.fill_color.band_index()] += 1;
        markers.push(marker);
    }

    let bands = DEPTH_BANDS
        .iter()
        .zip(band_counts)
        .map(|(band, count)| BandCount {
            label: band.label,
            color: band.color,
            count,
        })
        .collect();

    let metadata = collection.metadata.clone().unwrap_or_default();
    let summary = ProcessingSummary {
        total_features,
        mapped: markers.len(),
        skipped,
        clamped,
        bands,
        feed_title: metadata.title,
        generated: metadata
            .generated
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
    };

    info!(
        "Built {} marker(s) from {} feature(s), {} skipped, {} clamped",
        summary.mapped, summary.total_features, summary.skipped, summary.clamped
    );

    MarkerSet { markers, summary }
}

pub fn marker_for_record(record: &EarthquakeRecord, min_radius: f64) -> Marker {
    let style = MarkerStyle::for_record(record);
    Marker {
        id: record.id.clone(),
        position: style.position,
        fill_color: style.color,
        radius: style.radius.max(min_radius),
        raw_radius: style.radius,
        magnitude: record.magnitude,
        depth: record.depth,
        color: STROKE_COLOR,
        weight: STROKE_WEIGHT,
        fill_opacity: FILL_OPACITY,
        popup: popup_html(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_feed;

    fn feature_json(lon: f64, lat: f64, depth: f64, mag: &str) -> String {
        format!(
            r#"{{"type": "Feature", "properties": {{"mag": {}}}, "geometry": {{"type": "Point", "coordinates": [{}, {}, {}]}}}}"#,
            mag, lon, lat, depth
        )
    }

    fn collection(features: &[String]) -> FeatureCollection {
        let body = format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        );
        parse_feed(&body).unwrap()
    }

    #[test]
    fn test_one_marker_per_feature_in_order() {
        let features: Vec<String> = (0..25)
            .map(|i| {
                let i = i as f64;
                feature_json(-120.0 + i, 30.0 + i * 0.5, i * 10.0, "2.5")
            })
            .collect();
        let set = build_markers(&collection(&features), 0.0);

        assert_eq!(set.markers.len(), 25);
        assert_eq!(set.summary.mapped, 25);
        assert_eq!(set.summary.skipped, 0);
        for (i, marker) in set.markers.iter().enumerate() {
            assert_eq!(marker.position, (30.0 + i as f64 * 0.5, -120.0 + i as f64));
        }
    }

    #[test]
    fn test_reference_event() {
        let set = build_markers(&collection(&[feature_json(-100.0, 40.0, 15.0, "3")]), 1000.0);
        let marker = &set.markers[0];
        assert_eq!(marker.fill_color, DepthColor::YellowGreen);
        assert_eq!(marker.radius, 30_000.0);
        assert_eq!(marker.position, (40.0, -100.0));
        assert_eq!(marker.color, "black");
        assert_eq!(marker.weight, 0.5);
        assert_eq!(marker.fill_opacity, 0.5);
    }

    #[test]
    fn test_malformed_features_are_skipped_not_fatal() {
        let features = vec![
            feature_json(1.0, 1.0, 5.0, "1.0"),
            feature_json(2.0, 2.0, 5.0, "null"),
            r#"{"type": "Feature", "properties": {"mag": 2.0}, "geometry": null}"#.to_string(),
            feature_json(3.0, 3.0, 5.0, "2.0"),
        ];
        let set = build_markers(&collection(&features), 0.0);

        assert_eq!(set.summary.total_features, 4);
        assert_eq!(set.summary.mapped, 2);
        assert_eq!(set.summary.skipped, 2);
        assert_eq!(set.markers[0].position, (1.0, 1.0));
        assert_eq!(set.markers[1].position, (3.0, 3.0));
    }

    #[test]
    fn test_non_positive_radius_is_raised_to_minimum() {
        let features = vec![
            feature_json(0.0, 0.0, 1.0, "-0.5"),
            feature_json(0.0, 0.0, 1.0, "0"),
            feature_json(0.0, 0.0, 1.0, "4"),
        ];
        let set = build_markers(&collection(&features), 1000.0);

        assert_eq!(set.markers[0].raw_radius, -5000.0);
        assert_eq!(set.markers[0].radius, 1000.0);
        assert_eq!(set.markers[1].radius, 1000.0);
        assert_eq!(set.markers[2].radius, 40_000.0);
        assert_eq!(set.summary.clamped, 2);
    }

    #[test]
    fn test_band_histogram() {
        let features = vec![
            feature_json(0.0, 0.0, 300.0, "5"),
            feature_json(0.0, 0.0, 120.0, "5"),
            feature_json(0.0, 0.0, 12.0, "5"),
            feature_json(0.0, 0.0, 11.0, "5"),
            feature_json(0.0, 0.0, -1.0, "5"),
        ];
        let set = build_markers(&collection(&features), 0.0);
        let counts: Vec<usize> = set.summary.bands.iter().map(|b| b.count).collect();
        assert_eq!(counts, [1, 1, 0, 0, 2, 1]);
        assert_eq!(set.summary.bands[0].label, "200+");
    }

    #[test]
    fn test_one_bad_feature_never_rejects_the_feed() {
        let good = feature_json(-100.0, 40.0, 15.0, "3");
        let broken = [
            "null",
            r#"{"type": "Feature", "properties": null, "geometry": {"coordinates": [1.0, 2.0, 3.0]}}"#,
            r#"{"type": "Feature", "properties": {"mag": 1.0}, "geometry": {"coordinates": null}}"#,
            r#"{"type": "Feature", "properties": {"mag": "big"}, "geometry": {"coordinates": [1.0, 2.0, 3.0]}}"#,
        ];
        for shape in broken {
            let set = build_markers(&collection(&[good.clone(), shape.to_string()]), 0.0);
            assert_eq!(set.summary.total_features, 2, "{}", shape);
            assert_eq!(set.summary.mapped, 1, "{}", shape);
            assert_eq!(set.summary.skipped, 1, "{}", shape);
            assert_eq!(set.markers[0].position, (40.0, -100.0));
        }

        let mut features = vec![good];
        features.extend(broken.iter().map(|shape| shape.to_string()));
        let set = build_markers(&collection(&features), 0.0);
        assert_eq!(set.summary.mapped, 1);
        assert_eq!(set.summary.skipped, broken.len());
    }

    #[test]
    fn test_loosely_typed_fields_still_map() {
        let features = vec![
            r#"{"type": "Feature", "id": 991, "properties": {"mag": 2.0, "place": 3, "time": 1.5e12}, "geometry": {"coordinates": [5.0, 6.0, 7.0]}}"#.to_string(),
            feature_json(1.0, 2.0, 3.0, "1.0"),
        ];
        let set = build_markers(&collection(&features), 0.0);
        assert_eq!(set.summary.mapped, 2);
        assert_eq!(set.markers[0].id.as_deref(), Some("991"));
    }

    #[test]
    fn test_empty_feed() {
        let set = build_markers(&collection(&[]), 1000.0);
        assert!(set.markers.is_empty());
        assert_eq!(set.summary.total_features, 0);
        assert!(set.summary.feed_title.is_none());
    }
}
