use anyhow::{Context, Result};
use axum::response::Html;
use chrono::SecondsFormat;
use std::path::Path;

use crate::constants::{LEGEND_POSITION, TILE_ATTRIBUTION, TILE_URL};
use crate::feed::EarthquakeRecord;
use crate::mapper::DEPTH_BANDS;
use crate::processing::Marker;
use crate::settings::Settings;
use crate::utils::ensure_directory_exists;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn tooltip_div(title: &str, value: &str) -> String {
    format!(
        "<div class=\"tooltip-div\"><h3>{}</h3><p>{}</p></div>",
        title,
        escape_html(value)
    )
}

/// Popup body for one event: magnitude, depth, latitude, longitude,
/// then place and time when the feed has them.
pub fn popup_html(record: &EarthquakeRecord) -> String {
    let mut html = String::from("<div class=\"tooltip-wrapper\">");
    html.push_str(&tooltip_div("Magnitude", &record.magnitude.to_string()));
    html.push_str(&tooltip_div("Depth", &record.depth.to_string()));
    html.push_str(&tooltip_div("Latitude", &record.latitude.to_string()));
    html.push_str(&tooltip_div("Longitude", &record.longitude.to_string()));
    html.push_str("</div>");

    if let Some(place) = &record.place {
        html.push_str(&format!("<p class=\"tooltip-place\">{}</p>", escape_html(place)));
    }
    if let Some(time) = &record.time {
        html.push_str(&format!(
            "<p class=\"tooltip-time\">{}</p>",
            time.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    html
}

/// Legend list, one entry per depth band in table order.
pub fn legend_html() -> String {
    let items: String = DEPTH_BANDS
        .iter()
        .map(|band| {
            format!(
                "<li class='legend-label'><div class='color-div' style='background-color: {}'></div><p>{}</p></li>",
                band.color.css_name(),
                escape_html(band.label)
            )
        })
        .collect();
    format!("<ul>{}</ul>", items)
}

/// JSON inside a <script> block must not close the block early.
fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Renders the map page. With `inline_markers` the markers are embedded and
/// the page works as a standalone file; otherwise it loads `/api/markers`.
pub fn render_map_page(
    settings: &Settings,
    inline_markers: Option<&[Marker]>,
) -> Result<String> {
    let markers_source = match inline_markers {
        Some(markers) => {
            let json = serde_json::to_string(markers).context("Failed to serialize markers")?;
            format!("Promise.resolve({})", script_safe_json(&json))
        }
        None => "fetch('/api/markers').then((response) => response.json())".to_string(),
    };

    let config = serde_json::json!({
        "center": [settings.center_lat, settings.center_lng],
        "zoom": settings.zoom,
        "tileUrl": TILE_URL,
        "attribution": TILE_ATTRIBUTION,
        "legendPosition": LEGEND_POSITION,
        "legendHtml": legend_html(),
    });

    Ok(MAP_HTML
        .replace("/* MAP_CONFIG */", &script_safe_json(&config.to_string()))
        .replace("/* MARKERS_SOURCE */", &markers_source))
}

pub fn get_map_html(settings: &Settings) -> Result<Html<String>> {
    render_map_page(settings, None).map(Html)
}

/// Writes a standalone copy of the page with the markers embedded.
pub fn export_map_page(settings: &Settings, markers: &[Marker], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory_exists(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let page = render_map_page(settings, Some(markers))?;
    std::fs::write(path, page)
        .with_context(|| format!("Failed to write map page to {}", path.display()))?;
    Ok(())
}

// HTML template for the map page
const MAP_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>QuakeMap - Earthquakes of the Past Week</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <style>
        body { margin: 0; padding: 0; font-family: Arial, sans-serif; }
        #map { height: 100vh; width: 100%; }
        .tooltip-wrapper { display: flex; gap: 12px; }
        .tooltip-div { text-align: center; }
        .tooltip-div h3 { margin: 0 0 4px; font-size: 0.9em; color: #555; }
        .tooltip-div p { margin: 0; font-weight: bold; }
        .tooltip-place, .tooltip-time { margin: 6px 0 0; color: #666; font-size: 0.85em; }
        .legend-div {
            padding: 6px 8px;
            background: rgba(255,255,255,0.9);
            box-shadow: 0 0 15px rgba(0,0,0,0.2);
            border-radius: 5px;
        }
        .legend-div ul { list-style: none; margin: 0; padding: 0; }
        .legend-label { display: flex; align-items: center; gap: 6px; }
        .legend-label p { margin: 2px 0; }
        .color-div { width: 18px; height: 18px; border: 1px solid #333; }
    </style>
</head>
<body>
    <div id="map"></div>
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <script>
        const config = /* MAP_CONFIG */;

        const map = L.map('map', { center: config.center, zoom: config.zoom });
        L.tileLayer(config.tileUrl, { attribution: config.attribution }).addTo(map);

        const legend = L.control({ position: config.legendPosition });
        legend.onAdd = () => {
            const div = L.DomUtil.create('div', 'legend-div');
            div.innerHTML = config.legendHtml;
            return div;
        };
        legend.addTo(map);

        /* MARKERS_SOURCE */.then((markers) => {
            const circles = markers.map((marker) =>
                L.circle(marker.position, {
                    color: marker.color,
                    weight: marker.weight,
                    fillColor: marker.fill_color,
                    fillOpacity: marker.fill_opacity,
                    radius: marker.radius
                }).bindPopup(marker.popup, { maxWidth: 'auto' })
            );
            L.layerGroup(circles).addTo(map);
        }).catch((error) => console.error('Failed to load markers', error));
    </script>
</body>
</html>
"#;
