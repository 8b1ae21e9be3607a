//! Declarative wrapper around a map surface.
//!
//! `render` is called with the current props on every host update. A config
//! change rebuilds the surface (teardown, then initialize); a visibility
//! change goes through the synchronizer and never rebuilds.

use layers::config::MapConfiguration;
use tracing::{debug, warn};

use crate::engine::MapHost;
use crate::surface::{MapSurface, SurfaceHandle};
use crate::visibility::VisibilitySynchronizer;

pub struct MapMount<H>
where
    H: MapHost,
    H::Engine: 'static,
{
    surface: MapSurface<H>,
    // Config of the last initialize attempt, successful or not.
    config: Option<MapConfiguration>,
    handle: Option<SurfaceHandle>,
    visibility: VisibilitySynchronizer,
}

impl<H> MapMount<H>
where
    H: MapHost,
    H::Engine: 'static,
{
    pub fn new(surface: MapSurface<H>) -> Self {
        Self {
            surface,
            config: None,
            handle: None,
            visibility: VisibilitySynchronizer::new(),
        }
    }

    pub fn surface(&self) -> &MapSurface<H> {
        &self.surface
    }

    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.handle
    }

    pub fn render(&mut self, config: &MapConfiguration, visible: bool) {
        if self.config.as_ref() != Some(config) {
            self.rebuild(config, visible);
            return;
        }
        if let Some(handle) = self.handle {
            self.visibility.sync(&mut self.surface, handle, visible);
        }
    }

    pub fn unmount(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.surface.teardown(handle);
        }
        self.config = None;
    }

    fn rebuild(&mut self, config: &MapConfiguration, visible: bool) {
        if let Some(handle) = self.handle.take() {
            debug!("config changed, rebuilding map surface");
            self.surface.teardown(handle);
        }
        // Remember failed configs too: the same props must not retry until remounted.
        self.config = Some(config.clone());
        match self.surface.initialize(config, visible) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.visibility.reset(visible);
            }
            Err(err) => warn!("map mount left unloaded: {err}"),
        }
    }
}

impl<H> Drop for MapMount<H>
where
    H: MapHost,
    H::Engine: 'static,
{
    fn drop(&mut self) {
        self.unmount();
    }
}
