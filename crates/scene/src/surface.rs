//! Map surface: owns one engine instance per initialize/teardown cycle.
//!
//! Lifecycle contract:
//! - `initialize` constructs the engine and registers exactly one click
//!   handler, or reports an `InitializationError` without constructing one.
//! - `set_visibility` and `teardown` are no-ops on dead handles.
//! - Feature results are delivered asynchronously, at most once per click,
//!   and only for the most recently issued query of a live surface.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use foundation::handles::{Handle, HandleSlot};
use foundation::math::{MapCoordinate, to_lon_lat};
use futures_util::FutureExt as _;
use layers::config::MapConfiguration;
use layers::image::ImageLayer;
use layers::layer::WMS_LAYER_ID;
use layers::tile::TileLayer;
use layers::wms::WmsSource;
use runtime::{Event, EventBus, EventKind};
use streaming::{Fetch, FeatureQueryResult, Request, Sequencer, query_feature_info};
use tracing::{debug, info, warn};

use crate::engine::{
    ClickHandler, ControlOptions, EngineSpec, InitializationError, MapEngine, MapHost, Spawn,
    Viewport,
};

/// Opaque reference to one initialized surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(Handle);

impl SurfaceHandle {
    pub fn generation(&self) -> u32 {
        self.0.generation()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Nothing mounted yet.
    Unloaded,
    Ready,
    /// Initialization failed; the surface stays unloaded until remounted.
    Failed(InitializationError),
    TornDown,
}

/// Receives every accepted query result.
pub type SelectionCallback = Rc<dyn Fn(FeatureQueryResult)>;

struct Active<E> {
    handle: Handle,
    engine: E,
    source: Rc<WmsSource>,
    remote_visible: bool,
}

struct Inner<E> {
    slot: HandleSlot,
    active: Option<Active<E>>,
    status: SurfaceStatus,
    sequencer: Sequencer,
    events: EventBus,
}

pub struct MapSurface<H: MapHost> {
    host: H,
    fetcher: Rc<dyn Fetch>,
    spawner: Rc<dyn Spawn>,
    inner: Rc<RefCell<Inner<H::Engine>>>,
    // Read at delivery time, so swapping the callback never needs a rebuild.
    on_selected: Rc<RefCell<Option<SelectionCallback>>>,
}

impl<H> MapSurface<H>
where
    H: MapHost,
    H::Engine: 'static,
{
    pub fn new(host: H, fetcher: Rc<dyn Fetch>, spawner: Rc<dyn Spawn>) -> Self {
        Self {
            host,
            fetcher,
            spawner,
            inner: Rc::new(RefCell::new(Inner {
                slot: HandleSlot::new(),
                active: None,
                status: SurfaceStatus::Unloaded,
                sequencer: Sequencer::new(),
                events: EventBus::new(),
            })),
            on_selected: Rc::new(RefCell::new(None)),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn status(&self) -> SurfaceStatus {
        self.inner.borrow().status.clone()
    }

    pub fn is_live(&self, handle: SurfaceHandle) -> bool {
        self.inner.borrow().slot.is_live(handle.0)
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.borrow().events.events().cloned().collect()
    }

    pub fn event_count(&self, kind: EventKind) -> usize {
        self.inner.borrow().events.count(kind)
    }

    /// Installs the selection callback, replacing any previous one.
    pub fn on_feature_selected<F>(&self, callback: F)
    where
        F: Fn(FeatureQueryResult) + 'static,
    {
        *self.on_selected.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn clear_feature_callback(&self) {
        *self.on_selected.borrow_mut() = None;
    }

    pub fn initialize(
        &mut self,
        config: &MapConfiguration,
        initial_visibility: bool,
    ) -> Result<SurfaceHandle, InitializationError> {
        let mut guard = self.inner.borrow_mut();
        let s = &mut *guard;

        if s.active.is_some() {
            warn!("initialize called while a surface is live");
            return Err(InitializationError::AlreadyInitialized);
        }

        if !self.host.is_attached() {
            return Err(fail(s, InitializationError::HostUnavailable));
        }

        let source = Rc::new(WmsSource::new(config));
        let spec = EngineSpec {
            viewport: Viewport::default(),
            base: TileLayer::osm(),
            overlay: ImageLayer::wms(source.clone(), initial_visibility),
            controls: ControlOptions::default(),
        };
        let mut engine = match self.host.create_engine(&spec) {
            Ok(engine) => engine,
            Err(err) => return Err(fail(s, err)),
        };

        let handle = s.slot.issue();
        engine.set_click_handler(Some(self.click_handler(handle)));
        s.active = Some(Active {
            handle,
            engine,
            source,
            remote_visible: initial_visibility,
        });
        s.status = SurfaceStatus::Ready;
        s.events.emit(
            handle.generation(),
            EventKind::Initialized,
            format!("{} @ {}", config.layer_identifier, config.service_endpoint),
        );
        info!(
            layer = %config.layer_identifier,
            endpoint = %config.service_endpoint,
            "map surface initialized"
        );
        Ok(SurfaceHandle(handle))
    }

    /// Returns `true` if the engine's layer flag actually changed.
    pub fn set_visibility(&mut self, handle: SurfaceHandle, visible: bool) -> bool {
        let mut guard = self.inner.borrow_mut();
        let s = &mut *guard;
        let Some(active) = s.active.as_mut().filter(|a| a.handle == handle.0) else {
            debug!(generation = handle.generation(), "set_visibility on dead handle");
            return false;
        };
        if active.remote_visible == visible {
            return false;
        }
        active.engine.set_layer_visible(WMS_LAYER_ID, visible);
        active.remote_visible = visible;
        s.events.emit(
            handle.generation(),
            EventKind::Visibility,
            if visible { "shown" } else { "hidden" },
        );
        true
    }

    /// Detaches the engine and invalidates `handle`. Returns `true` only for
    /// the call that actually tore the surface down.
    pub fn teardown(&mut self, handle: SurfaceHandle) -> bool {
        let mut guard = self.inner.borrow_mut();
        let s = &mut *guard;
        if !s.slot.retire(handle.0) {
            return false;
        }
        if let Some(mut active) = s.active.take() {
            active.engine.set_click_handler(None);
            active.engine.detach();
        }
        s.status = SurfaceStatus::TornDown;
        s.events.emit(handle.generation(), EventKind::Teardown, "detached");
        debug!(generation = handle.generation(), "map surface torn down");
        true
    }

    fn click_handler(&self, handle: Handle) -> ClickHandler {
        let inner = Rc::downgrade(&self.inner);
        let fetcher = self.fetcher.clone();
        let spawner = self.spawner.clone();
        let on_selected = self.on_selected.clone();

        Rc::new(move |coordinate: MapCoordinate| {
            let Some(shared) = inner.upgrade() else {
                return;
            };
            let (req, source, resolution) = {
                let mut guard = shared.borrow_mut();
                let s = &mut *guard;
                let Some(active) = s.active.as_ref().filter(|a| a.handle == handle) else {
                    return;
                };
                let source = active.source.clone();
                let resolution = active.engine.resolution();
                let req = s.sequencer.next();
                let at = to_lon_lat(coordinate);
                s.events.emit(
                    handle.generation(),
                    EventKind::QueryIssued,
                    format!("seq {} at {:.5}, {:.5}", req.0, at.lon, at.lat),
                );
                (req, source, resolution)
            };

            let inner = inner.clone();
            let fetcher = fetcher.clone();
            let on_selected = on_selected.clone();
            let task = async move {
                let result = query_feature_info(&*fetcher, &source, coordinate, resolution).await;
                deliver(&inner, &on_selected, handle, req, result);
            };
            spawner.spawn_local(task.boxed_local());
        })
    }
}

impl<H: MapHost> std::fmt::Debug for MapSurface<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.inner.borrow();
        f.debug_struct("MapSurface")
            .field("status", &s.status)
            .field("live", &s.slot.current())
            .finish()
    }
}

fn fail<E>(s: &mut Inner<E>, err: InitializationError) -> InitializationError {
    warn!("map surface initialization failed: {err}");
    s.status = SurfaceStatus::Failed(err.clone());
    s.events.emit(0, EventKind::InitFailed, err.to_string());
    err
}

fn deliver<E>(
    inner: &Weak<RefCell<Inner<E>>>,
    on_selected: &RefCell<Option<SelectionCallback>>,
    handle: Handle,
    req: Request,
    result: FeatureQueryResult,
) {
    let Some(shared) = inner.upgrade() else {
        return;
    };
    {
        let mut s = shared.borrow_mut();
        let live = s.slot.is_live(handle);
        if !(live && s.sequencer.is_latest(req)) {
            let why = if live { "superseded" } else { "surface gone" };
            s.events.emit(
                handle.generation(),
                EventKind::QueryDiscarded,
                format!("seq {}: {why}", req.0),
            );
            return;
        }
        s.events
            .emit(handle.generation(), EventKind::QueryResolved, format!("seq {}", req.0));
    }

    // Clone out so the callback may replace itself.
    let callback = on_selected.borrow().clone();
    if let Some(callback) = callback {
        callback(result);
    }
}
