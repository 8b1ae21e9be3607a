use std::rc::Rc;

use crate::layer::{Layer, LayerId, WMS_LAYER_ID};
use crate::wms::{SERVER_TYPE_GEOSERVER, WmsSource};

/// Remote overlay: one server-rendered image per viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    id: LayerId,
    pub source: Rc<WmsSource>,
    pub visible: bool,
    /// Rendered image size relative to the viewport.
    pub ratio: f64,
    pub server_type: &'static str,
}

impl ImageLayer {
    pub fn wms(source: Rc<WmsSource>, visible: bool) -> Self {
        Self {
            id: WMS_LAYER_ID,
            source,
            visible,
            ratio: 1.0,
            server_type: SERVER_TYPE_GEOSERVER,
        }
    }
}

impl Layer for ImageLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn visible(&self) -> bool {
        self.visible
    }
}
