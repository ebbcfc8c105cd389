// Style documents of the vector-tile service and the request transform applied to its URLs
use serde_json::Value;
use walkers::TileId;
use walkers::sources::{Attribution, TileSource};

use super::AdapterError;

/// Rewrites every style/tile request: host alias first, then the API key.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTransform {
    pub alias_from: String,
    pub alias_to: String,
    pub api_key: String,
}

impl RequestTransform {
    pub fn apply(&self, url: &str) -> String {
        let url = if self.alias_from.is_empty() {
            url.to_string()
        } else {
            url.replacen(&self.alias_from, &self.alias_to, 1)
        };
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}api_key={}", url, separator, self.api_key)
    }
}

/// The parts of a map style the engine needs. The raw document is kept as is.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDocument {
    pub name: Option<String>,
    /// First raster tile template declared by the style
    pub raster_tiles: Option<String>,
    pub tile_size: u32,
    pub max_zoom: u8,
    pub raw: Value,
}

impl StyleDocument {
    pub fn from_value(raw: Value) -> Self {
        let name = raw.get("name").and_then(Value::as_str).map(str::to_string);

        let raster = raw
            .get("sources")
            .and_then(Value::as_object)
            .and_then(|sources| {
                sources.values().find(|s| {
                    s.get("type").and_then(Value::as_str) == Some("raster")
                        && s.get("tiles").and_then(|t| t.get(0)).and_then(Value::as_str).is_some()
                })
            });

        let raster_tiles = raster
            .and_then(|s| s.get("tiles"))
            .and_then(|t| t.get(0))
            .and_then(Value::as_str)
            .map(str::to_string);
        let tile_size = raster
            .and_then(|s| s.get("tileSize"))
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(256);
        let max_zoom = raster
            .and_then(|s| s.get("maxzoom"))
            .and_then(Value::as_u64)
            .map(|z| z.min(22) as u8)
            .unwrap_or(19);

        Self { name, raster_tiles, tile_size, max_zoom, raw }
    }

    pub fn parse(text: &str) -> Result<Self, AdapterError> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|source| AdapterError::Decode { what: "style document", source })?;
        Ok(Self::from_value(raw))
    }
}

/// Blocking fetch of a style document, run on the adapter's startup thread.
pub fn fetch_style(url: &str, transform: &RequestTransform) -> Result<StyleDocument, AdapterError> {
    let client = reqwest::blocking::Client::new();
    let response = client.get(transform.apply(url)).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Status { what: "style", status: status.as_u16() });
    }
    StyleDocument::parse(&response.text()?)
}

/// XYZ tile template (`{z}`, `{x}`, `{y}`), optionally passed through a transform.
pub struct TemplateTiles {
    pub template: String,
    pub transform: Option<RequestTransform>,
    pub tile_size: u32,
    pub max_zoom: u8,
    pub attribution: (&'static str, &'static str),
}

impl TemplateTiles {
    pub fn url_for(&self, zoom: u8, x: u32, y: u32) -> String {
        let url = self
            .template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string());
        match &self.transform {
            Some(t) => t.apply(&url),
            None => url,
        }
    }
}

impl TileSource for TemplateTiles {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.url_for(tile_id.zoom, tile_id.x, tile_id.y)
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: self.attribution.0,
            url: self.attribution.1,
            logo_light: None,
            logo_dark: None,
        }
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> RequestTransform {
        RequestTransform {
            alias_from: "app.olamaps.io".to_string(),
            alias_to: "api.olamaps.io".to_string(),
            api_key: "KEY".to_string(),
        }
    }

    #[test]
    fn test_transform_rewrites_alias_and_appends_key() {
        let t = transform();
        assert_eq!(
            t.apply("https://app.olamaps.io/tiles/vector/v1/styles/x/style.json"),
            "https://api.olamaps.io/tiles/vector/v1/styles/x/style.json?api_key=KEY"
        );
        assert_eq!(
            t.apply("https://api.olamaps.io/tiles/1/2/3.pbf?lang=en"),
            "https://api.olamaps.io/tiles/1/2/3.pbf?lang=en&api_key=KEY"
        );
        // Other hosts keep their name but still get the key
        assert_eq!(t.apply("https://cdn.example.com/a.png"), "https://cdn.example.com/a.png?api_key=KEY");
    }

    #[test]
    fn test_style_picks_first_raster_source() {
        let style = StyleDocument::parse(
            r#"{
                "version": 8,
                "name": "default-light-standard",
                "sources": {
                    "vectordata": {"type": "vector", "url": "https://api.olamaps.io/tiles/vector/v1/data/planet.json"},
                    "basemap": {"type": "raster", "tiles": ["https://app.olamaps.io/tiles/raster/{z}/{x}/{y}.png"], "tileSize": 512, "maxzoom": 18}
                },
                "layers": []
            }"#,
        )
        .unwrap();
        assert_eq!(style.name.as_deref(), Some("default-light-standard"));
        assert_eq!(style.raster_tiles.as_deref(), Some("https://app.olamaps.io/tiles/raster/{z}/{x}/{y}.png"));
        assert_eq!(style.tile_size, 512);
        assert_eq!(style.max_zoom, 18);
    }

    #[test]
    fn test_style_without_raster_source() {
        let style = StyleDocument::parse(r#"{"version": 8, "sources": {"v": {"type": "vector"}}}"#).unwrap();
        assert_eq!(style.raster_tiles, None);
        assert_eq!(style.tile_size, 256);
        assert!(StyleDocument::parse("<html>").is_err());
    }

    #[test]
    fn test_template_tiles_url() {
        let tiles = TemplateTiles {
            template: "https://app.olamaps.io/tiles/raster/{z}/{x}/{y}.png".to_string(),
            transform: Some(transform()),
            tile_size: 256,
            max_zoom: 19,
            attribution: ("Ola Maps", "https://maps.olakrutrim.com"),
        };
        assert_eq!(
            tiles.url_for(14, 11700, 6850),
            "https://api.olamaps.io/tiles/raster/14/11700/6850.png?api_key=KEY"
        );
    }
}
