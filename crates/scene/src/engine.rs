//! Seam between the map surface and the imperative rendering engine.
//!
//! The surface never hands the engine out; everything the rest of the UI
//! does to the map goes through `MapSurface`.

use std::fmt;
use std::rc::Rc;

use foundation::math::{LonLat, MapCoordinate, from_lon_lat, resolution_for_zoom};
use futures_util::future::LocalBoxFuture;
use layers::image::ImageLayer;
use layers::layer::LayerId;
use layers::tile::TileLayer;

/// Invoked by the engine with the projected coordinate of a single click.
pub type ClickHandler = Rc<dyn Fn(MapCoordinate)>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub center: LonLat,
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: LonLat::new(12.5, 41.9),
            zoom: 6,
        }
    }
}

impl Viewport {
    pub fn projected_center(&self) -> MapCoordinate {
        from_lon_lat(self.center)
    }

    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ControlOptions {
    pub zoom: bool,
    pub rotate: bool,
    pub attribution: bool,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            zoom: true,
            rotate: false,
            attribution: true,
        }
    }
}

/// Everything an engine needs to come up: initial view, layer stack
/// (bottom first) and controls.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSpec {
    pub viewport: Viewport,
    pub base: TileLayer,
    pub overlay: ImageLayer,
    pub controls: ControlOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializationError {
    /// The host region is missing or not attached to the document.
    HostUnavailable,
    /// The engine refused to construct.
    EngineFailed(String),
    /// A surface is still live on this mount.
    AlreadyInitialized,
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializationError::HostUnavailable => write!(f, "map host region is unavailable"),
            InitializationError::EngineFailed(msg) => write!(f, "map engine failed: {msg}"),
            InitializationError::AlreadyInitialized => {
                write!(f, "map surface is already initialized")
            }
        }
    }
}

impl std::error::Error for InitializationError {}

pub trait MapEngine {
    /// Current view resolution, `None` until the view is ready.
    fn resolution(&self) -> Option<f64>;
    fn set_layer_visible(&mut self, layer: LayerId, visible: bool);
    /// Replaces the single click binding; `None` removes it.
    fn set_click_handler(&mut self, handler: Option<ClickHandler>);
    /// Detaches from the host region and releases engine resources.
    fn detach(&mut self);
}

/// The host region an engine is mounted into.
pub trait MapHost {
    type Engine: MapEngine;

    fn is_attached(&self) -> bool;
    fn create_engine(&mut self, spec: &EngineSpec) -> Result<Self::Engine, InitializationError>;
}

/// Runs detached tasks on the UI event loop.
pub trait Spawn {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}
