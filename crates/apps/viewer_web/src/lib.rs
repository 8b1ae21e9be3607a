//! Browser entry point: a `WmsViewer` class driving one OpenLayers map.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use console_error_panic_hook::set_once;
use futures_util::future::LocalBoxFuture;
use layers::config::{
    ENV_WMS_FORMAT, ENV_WMS_LAYER, ENV_WMS_TRANSPARENT, ENV_WMS_URL, ENV_WMS_VERSION,
    MapConfiguration,
};
use scene::{Banner, MapMount, MapSurface, Spawn, ViewerState};
use serde_json::{Value, json};
use streaming::{BrowserFetcher, Fetch};
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

mod console;
mod ol;

pub use ol::{OlEngine, OlHost};

/// Build-time configuration; the page has no process environment.
fn build_config() -> MapConfiguration {
    MapConfiguration::from_lookup(|key| {
        let value = match key {
            ENV_WMS_URL => option_env!("WMS_URL"),
            ENV_WMS_LAYER => option_env!("WMS_LAYER"),
            ENV_WMS_FORMAT => option_env!("WMS_FORMAT"),
            ENV_WMS_TRANSPARENT => option_env!("WMS_TRANSPARENT"),
            ENV_WMS_VERSION => option_env!("WMS_VERSION"),
            _ => None,
        };
        value.map(str::to_string)
    })
}

struct LocalSpawner;

impl Spawn for LocalSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

type Listener = Rc<RefCell<Option<js_sys::Function>>>;

fn snapshot(state: &ViewerState) -> Value {
    let panel = &state.panel;
    json!({
        "layerVisible": state.layer_visible,
        "layerLabel": state.layer_label(),
        "overlay": state.overlay_message(),
        "banner": state.banner.as_ref().map(|b| json!({
            "message": b.message(),
            "dismissible": b.dismissible(),
            "fatal": matches!(b, Banner::InitFailed),
        })),
        "panel": {
            "open": panel.is_open,
            "title": panel.title(),
            "subtitle": panel.subtitle(),
            "rows": panel.rows(),
            "feature": panel.feature,
        },
    })
}

fn to_js(value: &Value) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(&value.to_string())
}

fn notify(listener: &Listener, state: &RefCell<ViewerState>) {
    // Snapshot first so the listener may call back into the viewer.
    let value = snapshot(&state.borrow());
    let Some(callback) = listener.borrow().clone() else {
        return;
    };
    let result = to_js(&value).and_then(|v| callback.call1(&JsValue::NULL, &v));
    if let Err(err) = result {
        warn!("state listener failed: {err:?}");
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    set_once();
    console::init_tracing(option_env!("RUST_LOG").unwrap_or(console::DEFAULT_LOG_FILTER));
}

#[wasm_bindgen]
pub struct WmsViewer {
    mount: MapMount<OlHost>,
    config: MapConfiguration,
    state: Rc<RefCell<ViewerState>>,
    listener: Listener,
    disposed: bool,
}

#[wasm_bindgen]
impl WmsViewer {
    /// Mounts a map into the element with id `host_id`.
    #[wasm_bindgen(constructor)]
    pub fn new(host_id: &str) -> WmsViewer {
        let fetcher: Rc<dyn Fetch> = Rc::new(BrowserFetcher);
        let surface = MapSurface::new(OlHost::new(host_id), fetcher, Rc::new(LocalSpawner));
        let state = Rc::new(RefCell::new(ViewerState::new()));
        let listener: Listener = Rc::new(RefCell::new(None));

        {
            let state = state.clone();
            let listener = listener.clone();
            surface.on_feature_selected(move |result| {
                state.borrow_mut().apply(&result);
                notify(&listener, &state);
            });
        }

        let config = build_config();
        info!(endpoint = %config.service_endpoint, layer = %config.layer_identifier, "viewer configured");
        let mut viewer = WmsViewer {
            mount: MapMount::new(surface),
            config,
            state,
            listener,
            disposed: false,
        };
        viewer.render();
        viewer
    }

    /// Points the overlay at another service or layer. Rebuilds the map
    /// only when something actually changed.
    #[wasm_bindgen(js_name = setLayer)]
    pub fn set_layer(&mut self, service_endpoint: String, layer_identifier: String) {
        self.config = MapConfiguration {
            service_endpoint,
            layer_identifier,
            ..self.config.clone()
        };
        self.render();
    }

    #[wasm_bindgen(js_name = setLayerVisible)]
    pub fn set_layer_visible(&mut self, visible: bool) {
        self.state.borrow_mut().set_layer_visible(visible);
        self.render();
    }

    #[wasm_bindgen(js_name = toggleLayer)]
    pub fn toggle_layer(&mut self) -> bool {
        let visible = !self.state.borrow().layer_visible;
        self.set_layer_visible(visible);
        visible
    }

    /// Registers `callback(state)`, called after every state change.
    #[wasm_bindgen(js_name = onStateChange)]
    pub fn on_state_change(&self, callback: js_sys::Function) {
        *self.listener.borrow_mut() = Some(callback);
        notify(&self.listener, &self.state);
    }

    #[wasm_bindgen(js_name = closePanel)]
    pub fn close_panel(&self) {
        self.state.borrow_mut().close_panel();
        notify(&self.listener, &self.state);
    }

    #[wasm_bindgen(js_name = dismissError)]
    pub fn dismiss_error(&self) {
        self.state.borrow_mut().dismiss_banner();
        notify(&self.listener, &self.state);
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&snapshot(&self.state.borrow()))
    }

    /// Tears the map down. The viewer is inert afterwards.
    pub fn dispose(&mut self) {
        self.mount.surface().clear_feature_callback();
        self.mount.unmount();
        *self.listener.borrow_mut() = None;
        self.disposed = true;
    }

    fn render(&mut self) {
        if self.disposed {
            return;
        }
        let visible = self.state.borrow().layer_visible;
        self.mount.render(&self.config, visible);
        self.state
            .borrow_mut()
            .observe_surface(&self.mount.surface().status());
        notify(&self.listener, &self.state);
    }
}
