use crate::layer::{BASE_LAYER_ID, Layer, LayerId};

pub const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Base map drawn beneath the remote layer. Always visible.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    id: LayerId,
    pub url_template: String,
    pub attribution: String,
}

impl TileLayer {
    pub fn osm() -> Self {
        Self {
            id: BASE_LAYER_ID,
            url_template: OSM_URL_TEMPLATE.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
        }
    }
}

impl Layer for TileLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn visible(&self) -> bool {
        true
    }
}
