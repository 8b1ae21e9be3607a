#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Stable ids of the two layers a viewer map carries.
pub const BASE_LAYER_ID: LayerId = LayerId(1);
pub const WMS_LAYER_ID: LayerId = LayerId(2);

pub trait Layer {
    fn id(&self) -> LayerId;
    fn visible(&self) -> bool;
}
