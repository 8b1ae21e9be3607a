//! OpenLayers bindings and the `MapHost`/`MapEngine` pair built on them.
//!
//! Expects the full `ol` build to be loaded as a global before the module
//! starts.

use std::rc::Rc;

use foundation::bounds::Aabb2;
use foundation::math::{MapCoordinate, WEB_MERCATOR};
use js_sys::{Array, Function, Object, Reflect};
use layers::layer::{Layer, LayerId};
use layers::wms::WmsSource;
use scene::{ClickHandler, EngineSpec, InitializationError, MapEngine, MapHost};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

const SINGLE_CLICK: &str = "singleclick";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ol)]
    pub type Map;

    #[wasm_bindgen(constructor, js_namespace = ol, catch)]
    pub fn new(options: &Object) -> Result<Map, JsValue>;

    #[wasm_bindgen(method, js_name = getView)]
    pub fn get_view(this: &Map) -> View;

    #[wasm_bindgen(method, js_name = setTarget)]
    pub fn set_target(this: &Map, target: &JsValue);

    /// Returns the listener key to pass to `un_by_key`.
    #[wasm_bindgen(method)]
    pub fn on(this: &Map, kind: &str, listener: &Function) -> JsValue;

    #[wasm_bindgen(js_namespace = ol)]
    pub type View;

    #[wasm_bindgen(constructor, js_namespace = ol, catch)]
    pub fn new(options: &Object) -> Result<View, JsValue>;

    #[wasm_bindgen(method, js_name = getResolution)]
    pub fn get_resolution(this: &View) -> Option<f64>;

    #[wasm_bindgen(js_namespace = ["ol", "layer"], js_name = Base)]
    pub type BaseLayer;

    #[wasm_bindgen(method, js_name = setVisible)]
    pub fn set_visible(this: &BaseLayer, visible: bool);

    #[wasm_bindgen(extends = BaseLayer, js_namespace = ["ol", "layer"], js_name = Tile)]
    pub type TileLayer;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "layer"], js_class = "Tile", catch)]
    pub fn new(options: &Object) -> Result<TileLayer, JsValue>;

    #[wasm_bindgen(extends = BaseLayer, js_namespace = ["ol", "layer"], js_name = Image)]
    pub type ImageLayer;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "layer"], js_class = "Image", catch)]
    pub fn new(options: &Object) -> Result<ImageLayer, JsValue>;

    #[wasm_bindgen(js_namespace = ["ol", "source"], js_name = OSM)]
    pub type OsmSource;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "source"], js_class = "OSM", catch)]
    pub fn new(options: &Object) -> Result<OsmSource, JsValue>;

    #[wasm_bindgen(js_namespace = ["ol", "source"], js_name = ImageWMS)]
    pub type ImageWmsSource;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "source"], js_class = "ImageWMS", catch)]
    pub fn new(options: &Object) -> Result<ImageWmsSource, JsValue>;

    /// Image handed to an `imageLoadFunction`.
    pub type ImageWrapper;

    #[wasm_bindgen(method, js_name = getExtent)]
    pub fn get_extent(this: &ImageWrapper) -> Array;

    #[wasm_bindgen(method, js_name = getResolution)]
    pub fn get_resolution(this: &ImageWrapper) -> JsValue;

    #[wasm_bindgen(method, js_name = getImage)]
    pub fn get_image(this: &ImageWrapper) -> JsValue;

    pub type MapBrowserEvent;

    #[wasm_bindgen(method, getter)]
    pub fn coordinate(this: &MapBrowserEvent) -> Array;

    #[wasm_bindgen(js_namespace = ["ol", "control", "defaults"], js_name = defaults, catch)]
    pub fn control_defaults(options: &Object) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["ol", "Observable"], js_name = unByKey)]
    pub fn un_by_key(key: &JsValue);
}

fn options(entries: &[(&str, JsValue)]) -> Result<Object, JsValue> {
    let obj = Object::new();
    for (key, value) in entries {
        Reflect::set(&obj, &JsValue::from_str(key), value)?;
    }
    Ok(obj)
}

fn engine_failed(err: JsValue) -> InitializationError {
    let msg = err
        .as_string()
        .or_else(|| {
            err.dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{err:?}"));
    InitializationError::EngineFailed(msg)
}

fn image_extent(image: &ImageWrapper) -> Option<Aabb2> {
    let extent = image.get_extent();
    let mut v = [0.0; 4];
    for (i, slot) in v.iter_mut().enumerate() {
        *slot = extent.get(i as u32).as_f64()?;
    }
    Some(Aabb2::new([v[0], v[1]], [v[2], v[3]]))
}

/// Points `image` at the GetMap request built by `source`. Falls back to the
/// engine's own URL when the image geometry cannot be read.
fn load_image(source: &WmsSource, image: &ImageWrapper, engine_src: &str) {
    let url = image_extent(image)
        .zip(image.get_resolution().as_f64())
        .ok_or_else(|| "image has no extent or resolution".to_string())
        .and_then(|(extent, resolution)| {
            source
                .image_url(extent, resolution, WEB_MERCATOR)
                .map_err(|e| e.to_string())
        });
    let src = match url {
        Ok(url) => url,
        Err(err) => {
            warn!("using engine image url: {err}");
            engine_src.to_string()
        }
    };
    match image.get_image().dyn_into::<HtmlImageElement>() {
        Ok(img) => img.set_src(&src),
        Err(_) => warn!("overlay image target is not an <img>"),
    }
}

/// Host element looked up by id on every check, so a re-rendered page
/// region is picked up.
#[derive(Debug, Clone)]
pub struct OlHost {
    element_id: String,
}

impl OlHost {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    fn build(&self, spec: &EngineSpec) -> Result<OlEngine, JsValue> {
        let osm = OsmSource::new(&options(&[
            ("url", JsValue::from_str(&spec.base.url_template)),
            ("attributions", JsValue::from_str(&spec.base.attribution)),
        ])?)?;
        let base = TileLayer::new(&options(&[("source", osm.into())])?)?;

        let wms: &Rc<WmsSource> = &spec.overlay.source;
        let params = Object::new();
        for (key, value) in wms.image_params() {
            Reflect::set(&params, &JsValue::from_str(key), &JsValue::from_str(&value))?;
        }
        Reflect::set(
            &params,
            &JsValue::from_str("VERSION"),
            &JsValue::from_str(wms.version().as_str()),
        )?;
        let image_loader = {
            let wms = wms.clone();
            Closure::<dyn FnMut(ImageWrapper, String)>::new(move |image: ImageWrapper, src: String| {
                load_image(&wms, &image, &src)
            })
        };
        let image_source = ImageWmsSource::new(&options(&[
            ("url", JsValue::from_str(wms.endpoint())),
            ("params", params.into()),
            ("ratio", JsValue::from_f64(spec.overlay.ratio)),
            ("serverType", JsValue::from_str(spec.overlay.server_type)),
            ("imageLoadFunction", image_loader.as_ref().clone()),
        ])?)?;
        let overlay = ImageLayer::new(&options(&[
            ("source", image_source.into()),
            ("visible", JsValue::from_bool(spec.overlay.visible())),
        ])?)?;

        let center = spec.viewport.projected_center();
        let center: Array = [center.x, center.y].iter().map(|v| JsValue::from_f64(*v)).collect();
        let view = View::new(&options(&[
            ("projection", JsValue::from_str(WEB_MERCATOR)),
            ("center", center.into()),
            ("zoom", JsValue::from_f64(f64::from(spec.viewport.zoom))),
        ])?)?;

        let controls = control_defaults(&options(&[
            ("zoom", JsValue::from_bool(spec.controls.zoom)),
            ("rotate", JsValue::from_bool(spec.controls.rotate)),
            ("attribution", JsValue::from_bool(spec.controls.attribution)),
        ])?)?;

        let layer_list = Array::new();
        layer_list.push(&base);
        layer_list.push(&overlay);
        let map = Map::new(&options(&[
            ("target", JsValue::from_str(&self.element_id)),
            ("layers", layer_list.into()),
            ("view", view.clone().into()),
            ("controls", controls),
        ])?)?;

        Ok(OlEngine {
            map,
            view,
            base,
            base_id: spec.base.id(),
            overlay,
            overlay_id: spec.overlay.id(),
            click: None,
            _image_loader: image_loader,
        })
    }
}

impl MapHost for OlHost {
    type Engine = OlEngine;

    fn is_attached(&self) -> bool {
        web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(&self.element_id))
            .is_some_and(|el| el.is_connected())
    }

    fn create_engine(&mut self, spec: &EngineSpec) -> Result<OlEngine, InitializationError> {
        self.build(spec).map_err(engine_failed)
    }
}

struct ClickBinding {
    key: JsValue,
    _closure: Closure<dyn FnMut(MapBrowserEvent)>,
}

pub struct OlEngine {
    map: Map,
    view: View,
    base: TileLayer,
    base_id: LayerId,
    overlay: ImageLayer,
    overlay_id: LayerId,
    click: Option<ClickBinding>,
    // Called by the image source for as long as the map lives.
    _image_loader: Closure<dyn FnMut(ImageWrapper, String)>,
}

impl MapEngine for OlEngine {
    fn resolution(&self) -> Option<f64> {
        self.view.get_resolution()
    }

    fn set_layer_visible(&mut self, layer: LayerId, visible: bool) {
        if layer == self.overlay_id {
            self.overlay.set_visible(visible);
        } else if layer == self.base_id {
            self.base.set_visible(visible);
        } else {
            debug!(layer = layer.0, "visibility change for unknown layer");
        }
    }

    fn set_click_handler(&mut self, handler: Option<ClickHandler>) {
        if let Some(binding) = self.click.take() {
            un_by_key(&binding.key);
        }
        let Some(handler) = handler else {
            return;
        };
        let closure = Closure::<dyn FnMut(MapBrowserEvent)>::new(move |event: MapBrowserEvent| {
            let coordinate = event.coordinate();
            match (coordinate.get(0).as_f64(), coordinate.get(1).as_f64()) {
                (Some(x), Some(y)) => handler(MapCoordinate::new(x, y)),
                _ => warn!("click event without a coordinate"),
            }
        });
        let key = self.map.on(SINGLE_CLICK, closure.as_ref().unchecked_ref());
        self.click = Some(ClickBinding {
            key,
            _closure: closure,
        });
    }

    fn detach(&mut self) {
        self.set_click_handler(None);
        self.map.set_target(&JsValue::UNDEFINED);
    }
}
