//! One-way bridge from externally owned visibility to a live surface.

use crate::engine::MapHost;
use crate::surface::{MapSurface, SurfaceHandle};

/// Anything whose remote-layer flag can be set through a surface handle.
pub trait VisibilityTarget {
    fn set_visibility(&mut self, handle: SurfaceHandle, visible: bool) -> bool;
}

impl<H> VisibilityTarget for MapSurface<H>
where
    H: MapHost,
    H::Engine: 'static,
{
    fn set_visibility(&mut self, handle: SurfaceHandle, visible: bool) -> bool {
        MapSurface::set_visibility(self, handle, visible)
    }
}

/// Forwards a visibility flag only when it differs from the last value
/// applied. Never rebuilds anything.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VisibilitySynchronizer {
    last_applied: Option<bool>,
}

impl VisibilitySynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the value a freshly initialized surface already carries.
    pub fn reset(&mut self, applied: bool) {
        self.last_applied = Some(applied);
    }

    pub fn last_applied(&self) -> Option<bool> {
        self.last_applied
    }

    /// Returns `true` if `set_visibility` was forwarded.
    pub fn sync<T>(&mut self, target: &mut T, handle: SurfaceHandle, visible: bool) -> bool
    where
        T: VisibilityTarget + ?Sized,
    {
        if self.last_applied == Some(visible) {
            return false;
        }
        target.set_visibility(handle, visible);
        self.last_applied = Some(visible);
        true
    }
}
