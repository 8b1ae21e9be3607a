//! Spherical Web Mercator (`EPSG:3857`).
//!
//! All projected coordinates are meters on the sphere of radius `WGS84_A`.

/// WGS84 semi-major axis (meters), used as the sphere radius.
pub const WGS84_A: f64 = 6_378_137.0;

/// Projection identifier of the display projection.
pub const WEB_MERCATOR: &str = "EPSG:3857";

/// Latitude beyond which Web Mercator is undefined.
pub const MAX_LATITUDE_DEG: f64 = 85.051_128_779_806_59;

/// Resolution (meters per pixel) at zoom 0 for a 256 px tile grid.
pub const ZOOM0_RESOLUTION: f64 = 2.0 * std::f64::consts::PI * WGS84_A / 256.0;

/// Geographic coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Projected map coordinate in Web Mercator meters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapCoordinate {
    pub x: f64,
    pub y: f64,
}

impl MapCoordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Projects geographic degrees into Web Mercator. Latitude is clamped to the
/// projection's valid band.
pub fn from_lon_lat(p: LonLat) -> MapCoordinate {
    let lat = p.lat.clamp(-MAX_LATITUDE_DEG, MAX_LATITUDE_DEG);
    let x = WGS84_A * p.lon.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    MapCoordinate::new(x, y)
}

pub fn to_lon_lat(c: MapCoordinate) -> LonLat {
    let lon = (c.x / WGS84_A).to_degrees();
    let lat = (2.0 * (c.y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    LonLat::new(lon, lat)
}

/// Ground resolution of the default tile grid at an integer zoom level.
pub fn resolution_for_zoom(zoom: u8) -> f64 {
    ZOOM0_RESOLUTION / f64::from(2u32.pow(u32::from(zoom.min(30))))
}
