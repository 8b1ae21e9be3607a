pub mod config;
pub mod feature;
pub mod image;
pub mod layer;
pub mod tile;
pub mod wms;

pub use config::*;
pub use feature::*;
pub use image::*;
pub use layer::*;
pub use tile::*;
pub use wms::*;
