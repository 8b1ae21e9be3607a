//! Remote layer source: request construction for a WMS endpoint.

use std::fmt;

use foundation::bounds::Aabb2;
use foundation::math::MapCoordinate;
use url::Url;

use crate::config::{MapConfiguration, WmsVersion};

/// Pixel size of the window a feature-info request is centred in.
pub const FEATURE_INFO_WINDOW: [u32; 2] = [101, 101];
pub const INFO_FORMAT_JSON: &str = "application/json";
pub const SERVER_TYPE_GEOSERVER: &str = "geoserver";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    MissingEndpoint,
    InvalidEndpoint(String),
    InvalidResolution,
    InvalidCoordinate,
    InvalidSize,
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlError::MissingEndpoint => write!(f, "service endpoint is empty"),
            UrlError::InvalidEndpoint(msg) => write!(f, "invalid service endpoint: {msg}"),
            UrlError::InvalidResolution => write!(f, "resolution must be finite and positive"),
            UrlError::InvalidCoordinate => write!(f, "coordinate must be finite"),
            UrlError::InvalidSize => write!(f, "image size must be non-zero"),
        }
    }
}

impl std::error::Error for UrlError {}

/// Parameters shared by image and feature-info requests.
///
/// Built once from a `MapConfiguration` and shared read-only between the
/// engine's image path and the feature query path.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsSource {
    endpoint: String,
    layers: String,
    format: String,
    transparent: bool,
    version: WmsVersion,
}

impl WmsSource {
    pub fn new(config: &MapConfiguration) -> Self {
        Self {
            endpoint: config.service_endpoint.trim().to_string(),
            layers: config.layer_identifier.clone(),
            format: config.image_format.clone(),
            transparent: config.transparent_background,
            version: config.version,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn layers(&self) -> &str {
        &self.layers
    }

    pub fn version(&self) -> WmsVersion {
        self.version
    }

    /// `LAYERS`/`FORMAT`/`TRANSPARENT`, the parameters an engine needs to
    /// drive its own image requests.
    pub fn image_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("LAYERS", self.layers.clone()),
            ("FORMAT", self.format.clone()),
            ("TRANSPARENT", self.transparent.to_string()),
        ]
    }

    /// GetMap request covering `extent` at `size` pixels.
    pub fn get_map_url(
        &self,
        extent: Aabb2,
        size: [u32; 2],
        projection: &str,
    ) -> Result<String, UrlError> {
        if size[0] == 0 || size[1] == 0 {
            return Err(UrlError::InvalidSize);
        }
        if extent.is_empty() {
            return Err(UrlError::InvalidCoordinate);
        }

        let mut url = self.base_url()?;
        {
            let mut q = url.query_pairs_mut();
            self.append_common(&mut q, "GetMap");
            self.append_view(&mut q, extent, size, projection);
        }
        Ok(url.into())
    }

    /// GetMap request for `extent` rendered at `resolution` map units per
    /// pixel. This is what the engine asks for on every view change.
    pub fn image_url(
        &self,
        extent: Aabb2,
        resolution: f64,
        projection: &str,
    ) -> Result<String, UrlError> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(UrlError::InvalidResolution);
        }
        let size = [
            (extent.width() / resolution).round(),
            (extent.height() / resolution).round(),
        ];
        if !size.iter().all(|v| v.is_finite() && *v >= 1.0 && *v <= f64::from(u32::MAX)) {
            return Err(UrlError::InvalidSize);
        }
        self.get_map_url(extent, size.map(|v| v as u32), projection)
    }

    /// GetFeatureInfo request for the pixel under `coordinate`.
    ///
    /// The request describes a small window centred on the coordinate, so the
    /// queried pixel is the window's centre.
    pub fn feature_info_url(
        &self,
        coordinate: MapCoordinate,
        resolution: f64,
        projection: &str,
        info_format: &str,
    ) -> Result<String, UrlError> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(UrlError::InvalidResolution);
        }
        if !coordinate.is_finite() {
            return Err(UrlError::InvalidCoordinate);
        }

        let extent = Aabb2::from_center(coordinate.to_array(), resolution, FEATURE_INFO_WINDOW);
        let px = ((coordinate.x - extent.min[0]) / resolution).floor() as i64;
        let py = ((extent.max[1] - coordinate.y) / resolution).floor() as i64;
        let (x_key, y_key) = match self.version {
            WmsVersion::V1_3_0 => ("I", "J"),
            WmsVersion::V1_1_1 => ("X", "Y"),
        };

        let mut url = self.base_url()?;
        {
            let mut q = url.query_pairs_mut();
            self.append_common(&mut q, "GetFeatureInfo");
            q.append_pair("QUERY_LAYERS", &self.layers);
            q.append_pair("INFO_FORMAT", info_format);
            self.append_view(&mut q, extent, FEATURE_INFO_WINDOW, projection);
            q.append_pair(x_key, &px.to_string());
            q.append_pair(y_key, &py.to_string());
        }
        Ok(url.into())
    }

    fn base_url(&self) -> Result<Url, UrlError> {
        if self.endpoint.is_empty() {
            return Err(UrlError::MissingEndpoint);
        }
        let url = Url::parse(&self.endpoint).map_err(|e| UrlError::InvalidEndpoint(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(UrlError::InvalidEndpoint(self.endpoint.clone()));
        }
        Ok(url)
    }

    fn append_common(&self, q: &mut url::form_urlencoded::Serializer<'_, url::UrlQuery<'_>>, request: &str) {
        q.append_pair("SERVICE", "WMS");
        q.append_pair("VERSION", self.version.as_str());
        q.append_pair("REQUEST", request);
        for (key, value) in self.image_params() {
            q.append_pair(key, &value);
        }
        q.append_pair("STYLES", "");
    }

    fn append_view(
        &self,
        q: &mut url::form_urlencoded::Serializer<'_, url::UrlQuery<'_>>,
        extent: Aabb2,
        size: [u32; 2],
        projection: &str,
    ) {
        let crs_key = match self.version {
            WmsVersion::V1_3_0 => "CRS",
            WmsVersion::V1_1_1 => "SRS",
        };
        q.append_pair(crs_key, projection);
        q.append_pair("WIDTH", &size[0].to_string());
        q.append_pair("HEIGHT", &size[1].to_string());

        // 1.3.0 uses the CRS's own axis order; geographic 4326 is lat/lon.
        let bbox = if self.version == WmsVersion::V1_3_0 && projection == "EPSG:4326" {
            [extent.min[1], extent.min[0], extent.max[1], extent.max[0]]
        } else {
            [extent.min[0], extent.min[1], extent.max[0], extent.max[1]]
        };
        let bbox = bbox.map(|v| v.to_string()).join(",");
        q.append_pair("BBOX", &bbox);
    }
}

#[cfg(test)]
mod tests {
    use super::{INFO_FORMAT_JSON, UrlError, WmsSource};
    use crate::config::{MapConfiguration, WmsVersion};
    use foundation::bounds::Aabb2;
    use foundation::math::{MapCoordinate, WEB_MERCATOR};
    use pretty_assertions::assert_eq;
    use url::Url;

    fn params(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .expect("url")
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param(url: &str, key: &str) -> Option<String> {
        params(url).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn feature_info_url_carries_layer_and_format() {
        let source = WmsSource::new(&MapConfiguration::new("https://svc/wms", "cite:example"));
        let url = source
            .feature_info_url(MapCoordinate::new(1000.0, 2000.0), 10.0, WEB_MERCATOR, INFO_FORMAT_JSON)
            .expect("url");

        assert!(url.starts_with("https://svc/wms?"));
        assert_eq!(param(&url, "REQUEST").as_deref(), Some("GetFeatureInfo"));
        assert_eq!(param(&url, "QUERY_LAYERS").as_deref(), Some("cite:example"));
        assert_eq!(param(&url, "LAYERS").as_deref(), Some("cite:example"));
        assert_eq!(param(&url, "INFO_FORMAT").as_deref(), Some("application/json"));
        assert_eq!(param(&url, "CRS").as_deref(), Some("EPSG:3857"));
        assert_eq!(param(&url, "WIDTH").as_deref(), Some("101"));
        assert_eq!(param(&url, "I").as_deref(), Some("50"));
        assert_eq!(param(&url, "J").as_deref(), Some("50"));
        assert_eq!(param(&url, "BBOX").as_deref(), Some("495,1495,1505,2505"));
    }

    #[test]
    fn legacy_version_uses_srs_and_xy() {
        let cfg = MapConfiguration::new("https://svc/wms", "cite:example").with_version(WmsVersion::V1_1_1);
        let url = WmsSource::new(&cfg)
            .feature_info_url(MapCoordinate::new(0.0, 0.0), 1.0, WEB_MERCATOR, INFO_FORMAT_JSON)
            .expect("url");
        assert_eq!(param(&url, "VERSION").as_deref(), Some("1.1.1"));
        assert_eq!(param(&url, "SRS").as_deref(), Some("EPSG:3857"));
        assert_eq!(param(&url, "X").as_deref(), Some("50"));
        assert_eq!(param(&url, "Y").as_deref(), Some("50"));
        assert!(param(&url, "CRS").is_none());
    }

    #[test]
    fn endpoint_query_is_preserved() {
        let source = WmsSource::new(&MapConfiguration::new("https://svc/ows?map=roads", "roads"));
        let url = source
            .feature_info_url(MapCoordinate::new(0.0, 0.0), 1.0, WEB_MERCATOR, INFO_FORMAT_JSON)
            .expect("url");
        assert_eq!(params(&url)[0], ("map".to_string(), "roads".to_string()));
    }

    #[test]
    fn unusable_inputs_are_rejected() {
        let missing = WmsSource::new(&MapConfiguration::new("  ", "cite:example"));
        assert_eq!(
            missing.feature_info_url(MapCoordinate::new(0.0, 0.0), 1.0, WEB_MERCATOR, INFO_FORMAT_JSON),
            Err(UrlError::MissingEndpoint)
        );

        let relative = WmsSource::new(&MapConfiguration::new("/geoserver/wms", "cite:example"));
        assert!(matches!(
            relative.feature_info_url(MapCoordinate::new(0.0, 0.0), 1.0, WEB_MERCATOR, INFO_FORMAT_JSON),
            Err(UrlError::InvalidEndpoint(_))
        ));

        let ok = WmsSource::new(&MapConfiguration::new("https://svc/wms", "cite:example"));
        assert_eq!(
            ok.feature_info_url(MapCoordinate::new(0.0, 0.0), 0.0, WEB_MERCATOR, INFO_FORMAT_JSON),
            Err(UrlError::InvalidResolution)
        );
        assert_eq!(
            ok.feature_info_url(MapCoordinate::new(f64::NAN, 0.0), 1.0, WEB_MERCATOR, INFO_FORMAT_JSON),
            Err(UrlError::InvalidCoordinate)
        );
    }

    #[test]
    fn get_map_url_describes_viewport() {
        let source = WmsSource::new(
            &MapConfiguration::new("https://svc/wms", "cite:example").with_transparent_background(false),
        );
        let url = source
            .get_map_url(Aabb2::new([0.0, 0.0], [512.0, 256.0]), [512, 256], WEB_MERCATOR)
            .expect("url");
        assert_eq!(param(&url, "REQUEST").as_deref(), Some("GetMap"));
        assert_eq!(param(&url, "FORMAT").as_deref(), Some("image/png"));
        assert_eq!(param(&url, "TRANSPARENT").as_deref(), Some("false"));
        assert_eq!(param(&url, "BBOX").as_deref(), Some("0,0,512,256"));
        assert_eq!(
            source.get_map_url(Aabb2::new([0.0, 0.0], [1.0, 1.0]), [0, 256], WEB_MERCATOR),
            Err(UrlError::InvalidSize)
        );
    }

    #[test]
    fn geographic_bbox_is_axis_swapped_for_1_3_0() {
        let source = WmsSource::new(&MapConfiguration::new("https://svc/wms", "cite:example"));
        let url = source
            .get_map_url(Aabb2::new([10.0, 40.0], [12.0, 42.0]), [100, 100], "EPSG:4326")
            .expect("url");
        assert_eq!(param(&url, "BBOX").as_deref(), Some("40,10,42,12"));
    }

    #[test]
    fn image_url_sizes_request_from_resolution() {
        let source = WmsSource::new(&MapConfiguration::new("https://svc/wms", "cite:example"));
        let url = source
            .image_url(Aabb2::new([0.0, 0.0], [2_000.0, 1_000.0]), 10.0, WEB_MERCATOR)
            .expect("url");
        assert_eq!(param(&url, "WIDTH").as_deref(), Some("200"));
        assert_eq!(param(&url, "HEIGHT").as_deref(), Some("100"));
        assert_eq!(param(&url, "CRS").as_deref(), Some("EPSG:3857"));
        assert_eq!(param(&url, "LAYERS").as_deref(), Some("cite:example"));

        let extent = Aabb2::new([0.0, 0.0], [2_000.0, 1_000.0]);
        assert_eq!(
            source.image_url(extent, 0.0, WEB_MERCATOR),
            Err(UrlError::InvalidResolution)
        );
        assert_eq!(
            source.image_url(extent, 1e9, WEB_MERCATOR),
            Err(UrlError::InvalidSize)
        );
    }
}
