//! Mount-time configuration of the remote layer.

use std::fmt;

pub const DEFAULT_WMS_URL: &str = "http://localhost:8080/geoserver/wms";
pub const DEFAULT_WMS_LAYER: &str = "cite:example";
pub const DEFAULT_IMAGE_FORMAT: &str = "image/png";

pub const ENV_WMS_URL: &str = "WMS_URL";
pub const ENV_WMS_LAYER: &str = "WMS_LAYER";
pub const ENV_WMS_FORMAT: &str = "WMS_FORMAT";
pub const ENV_WMS_TRANSPARENT: &str = "WMS_TRANSPARENT";
pub const ENV_WMS_VERSION: &str = "WMS_VERSION";

/// Protocol version spoken to the remote service.
///
/// The version decides the name of the CRS parameter (`CRS` vs `SRS`) and of
/// the feature-info pixel parameters (`I`/`J` vs `X`/`Y`).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum WmsVersion {
    V1_1_1,
    #[default]
    V1_3_0,
}

impl WmsVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            WmsVersion::V1_1_1 => "1.1.1",
            WmsVersion::V1_3_0 => "1.3.0",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1.1.1" => Some(WmsVersion::V1_1_1),
            "1.3.0" => Some(WmsVersion::V1_3_0),
            _ => None,
        }
    }
}

impl fmt::Display for WmsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters of the remote map service.
///
/// Immutable once mounted: a surface is rebuilt, never patched, when any field
/// changes, so equality here is the reconstruction trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapConfiguration {
    pub service_endpoint: String,
    pub layer_identifier: String,
    pub image_format: String,
    pub transparent_background: bool,
    pub version: WmsVersion,
}

impl Default for MapConfiguration {
    fn default() -> Self {
        Self {
            service_endpoint: DEFAULT_WMS_URL.to_string(),
            layer_identifier: DEFAULT_WMS_LAYER.to_string(),
            image_format: DEFAULT_IMAGE_FORMAT.to_string(),
            transparent_background: true,
            version: WmsVersion::default(),
        }
    }
}

impl MapConfiguration {
    pub fn new(service_endpoint: impl Into<String>, layer_identifier: impl Into<String>) -> Self {
        Self {
            service_endpoint: service_endpoint.into(),
            layer_identifier: layer_identifier.into(),
            ..Self::default()
        }
    }

    pub fn with_image_format(mut self, image_format: impl Into<String>) -> Self {
        self.image_format = image_format.into();
        self
    }

    pub fn with_transparent_background(mut self, transparent: bool) -> Self {
        self.transparent_background = transparent;
        self
    }

    pub fn with_version(mut self, version: WmsVersion) -> Self {
        self.version = version;
        self
    }

    /// Builds a configuration from a key lookup, falling back to defaults for
    /// unset, blank or unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        let transparent_background = match get(ENV_WMS_TRANSPARENT) {
            Some(v) => parse_bool(&v).unwrap_or_else(|| {
                tracing::warn!("ignoring {ENV_WMS_TRANSPARENT}={v:?}, expected a boolean");
                defaults.transparent_background
            }),
            None => defaults.transparent_background,
        };
        let version = match get(ENV_WMS_VERSION) {
            Some(v) => WmsVersion::parse(&v).unwrap_or_else(|| {
                tracing::warn!("ignoring {ENV_WMS_VERSION}={v:?}, expected 1.1.1 or 1.3.0");
                defaults.version
            }),
            None => defaults.version,
        };

        Self {
            service_endpoint: get(ENV_WMS_URL).unwrap_or(defaults.service_endpoint),
            layer_identifier: get(ENV_WMS_LAYER).unwrap_or(defaults.layer_identifier),
            image_format: get(ENV_WMS_FORMAT).unwrap_or(defaults.image_format),
            transparent_background,
            version,
        }
    }

    /// Reads the process environment once.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{MapConfiguration, WmsVersion};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let cfg = MapConfiguration::from_lookup(lookup(&[]));
        assert_eq!(cfg, MapConfiguration::default());
        assert_eq!(cfg.layer_identifier, "cite:example");
    }

    #[test]
    fn lookup_overrides_and_trims() {
        let cfg = MapConfiguration::from_lookup(lookup(&[
            ("WMS_URL", " https://svc/wms "),
            ("WMS_LAYER", "topp:states"),
            ("WMS_TRANSPARENT", "false"),
            ("WMS_VERSION", "1.1.1"),
        ]));
        assert_eq!(
            cfg,
            MapConfiguration::new("https://svc/wms", "topp:states")
                .with_transparent_background(false)
                .with_version(WmsVersion::V1_1_1)
        );
    }

    #[test]
    fn blank_and_invalid_values_fall_back() {
        let cfg = MapConfiguration::from_lookup(lookup(&[
            ("WMS_LAYER", "   "),
            ("WMS_TRANSPARENT", "maybe"),
            ("WMS_VERSION", "2.0"),
        ]));
        assert_eq!(cfg, MapConfiguration::default());
    }

    #[test]
    fn any_field_change_breaks_equality() {
        let a = MapConfiguration::new("https://svc/wms", "cite:example");
        assert_ne!(a, a.clone().with_image_format("image/jpeg"));
        assert_ne!(a, MapConfiguration::new("https://svc/wms", "cite:other"));
    }
}
