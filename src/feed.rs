use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

// GeoJSON as published by the USGS summary feeds.
// Features stay raw until validation, and every per-feature field is read
// leniently, so one bad feature does not make the whole document unreadable.

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<FeedMetadata>,
    #[serde(default)]
    pub features: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMetadata {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    /// Epoch milliseconds
    #[serde(default, deserialize_with = "lenient")]
    pub generated: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    /// String or number in GeoJSON
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub properties: Option<FeatureProperties>,
    #[serde(default, deserialize_with = "lenient")]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub mag: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub place: Option<String>,
    /// Epoch milliseconds
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geometry {
    /// `[longitude, latitude, depth_km]`
    #[serde(default)]
    pub coordinates: Option<Value>,
}

/// Reads a field that may be null or of the wrong type as `None`.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Display form of a feature id, whether published as a string or a number.
pub fn feature_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// One earthquake, validated and ready for the mapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EarthquakeRecord {
    pub longitude: f64,
    pub latitude: f64,
    /// Kilometers below the surface; negative above sea level
    pub depth: f64,
    pub magnitude: f64,
    pub id: Option<String>,
    pub place: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl EarthquakeRecord {
    /// Validates one raw entry of the `features` array.
    pub fn try_from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            bail!("feature is {}, not an object", json_kind(value));
        }
        let feature = Feature::deserialize(value).context("unreadable feature")?;
        Self::try_from_feature(&feature)
    }

    /// Validates the fields the mapper needs. The error says which one is wrong.
    pub fn try_from_feature(feature: &Feature) -> Result<Self> {
        let coordinates = match feature.geometry.as_ref().and_then(|g| g.coordinates.as_ref()) {
            Some(Value::Array(coordinates)) => coordinates,
            Some(other) => bail!("coordinates are {}, not an array", json_kind(other)),
            None => bail!("feature has no geometry"),
        };
        if coordinates.len() < 3 {
            bail!(
                "expected [lon, lat, depth], got {} coordinate(s)",
                coordinates.len()
            );
        }

        let longitude = finite_number(&coordinates[0]).context("invalid longitude")?;
        let latitude = finite_number(&coordinates[1]).context("invalid latitude")?;
        let depth = finite_number(&coordinates[2]).context("invalid depth")?;

        let properties = match &feature.properties {
            Some(properties) => properties,
            None => bail!("feature has no properties"),
        };
        let magnitude = match &properties.mag {
            Some(value) => finite_number(value).context("invalid magnitude")?,
            None => bail!("magnitude is missing"),
        };

        // Times are whole milliseconds, but accept a fractional value
        let time = properties
            .time
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|ms| ms.is_finite())
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single());

        let id = match &feature.id {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        Ok(Self {
            longitude,
            latitude,
            depth,
            magnitude,
            id,
            place: properties.place.clone(),
            time,
            url: properties.url.clone(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn finite_number(value: &Value) -> Result<f64> {
    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(n),
        Some(n) => bail!("{} is not finite", n),
        None => bail!("{} is not a number", value),
    }
}

pub fn parse_feed(body: &str) -> Result<FeatureCollection> {
    serde_json::from_str(body).context("Failed to decode GeoJSON feed")
}

pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("quakemap/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Fetches the feed once. Non-2xx responses are errors.
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<FeatureCollection> {
    info!("Fetching earthquake feed from {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?
        .error_for_status()
        .with_context(|| format!("Feed request to {} was rejected", url))?;

    let body = response
        .text()
        .await
        .context("Failed to read feed response body")?;
    debug!("Received {} bytes", body.len());

    let collection = parse_feed(&body)?;
    info!("Feed contains {} feature(s)", collection.features.len());
    Ok(collection)
}
