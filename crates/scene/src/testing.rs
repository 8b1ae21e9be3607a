//! Stub engine, fetcher and task queue shared by the scene tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use foundation::math::MapCoordinate;
use futures_util::FutureExt as _;
use futures_util::future::LocalBoxFuture;
use layers::config::MapConfiguration;
use layers::layer::LayerId;
use streaming::{FeatureQueryResult, Fetch, FetchError, FetchResponse};

use crate::engine::{ClickHandler, EngineSpec, InitializationError, MapEngine, MapHost, Spawn};
use crate::surface::MapSurface;

pub fn sample_config() -> MapConfiguration {
    MapConfiguration::new("https://svc/wms", "cite:example")
        .with_image_format("image/png")
        .with_transparent_background(true)
}

pub fn feature_body(id: &str, name: &str) -> String {
    format!(
        r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","id":"{id}","geometry":{{"type":"Polygon","coordinates":[]}},"properties":{{"name":"{name}","area":1250.75}}}}]}}"#
    )
}

pub fn empty_body() -> String {
    r#"{"type":"FeatureCollection","features":[]}"#.to_string()
}

/// Everything the stub engine was asked to do.
#[derive(Default)]
pub struct EngineLog {
    pub created: usize,
    pub detached: usize,
    pub handler_sets: usize,
    pub handler_clears: usize,
    pub visibility_calls: Vec<(LayerId, bool)>,
    pub handler: Option<ClickHandler>,
    pub last_spec: Option<EngineSpec>,
    pub resolution: Option<f64>,
    pub fail_create: bool,
}

pub struct StubHost {
    attached: bool,
    log: Rc<RefCell<EngineLog>>,
}

impl MapHost for StubHost {
    type Engine = StubEngine;

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn create_engine(&mut self, spec: &EngineSpec) -> Result<StubEngine, InitializationError> {
        let mut log = self.log.borrow_mut();
        if log.fail_create {
            return Err(InitializationError::EngineFailed("stub refused".into()));
        }
        log.created += 1;
        log.last_spec = Some(spec.clone());
        Ok(StubEngine {
            log: self.log.clone(),
        })
    }
}

pub struct StubEngine {
    log: Rc<RefCell<EngineLog>>,
}

impl MapEngine for StubEngine {
    fn resolution(&self) -> Option<f64> {
        self.log.borrow().resolution
    }

    fn set_layer_visible(&mut self, layer: LayerId, visible: bool) {
        self.log.borrow_mut().visibility_calls.push((layer, visible));
    }

    fn set_click_handler(&mut self, handler: Option<ClickHandler>) {
        let mut log = self.log.borrow_mut();
        match handler {
            Some(_) => log.handler_sets += 1,
            None => log.handler_clears += 1,
        }
        log.handler = handler;
    }

    fn detach(&mut self) {
        self.log.borrow_mut().detached += 1;
    }
}

/// Replies handed out in call order; runs dry into transport errors.
#[derive(Default)]
pub struct ScriptedFetch {
    replies: RefCell<VecDeque<Result<FetchResponse, FetchError>>>,
    urls: RefCell<Vec<String>>,
}

impl ScriptedFetch {
    pub fn push(&self, reply: Result<FetchResponse, FetchError>) {
        self.replies.borrow_mut().push_back(reply);
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.borrow().clone()
    }
}

impl Fetch for ScriptedFetch {
    fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>> {
        self.urls.borrow_mut().push(url.to_string());
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted reply".into())));
        async move { reply }.boxed_local()
    }
}

/// Spawned tasks, run only when the test says so.
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

impl TaskQueue {
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Runs the task at `index` among those still pending.
    pub fn run(&self, index: usize) {
        let task = self.tasks.borrow_mut().remove(index);
        pollster::block_on(task);
    }

    pub fn run_all(&self) {
        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                if tasks.is_empty() {
                    break;
                }
                tasks.remove(0)
            };
            pollster::block_on(next);
        }
    }
}

impl Spawn for TaskQueue {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push(task);
    }
}

pub struct Harness {
    pub log: Rc<RefCell<EngineLog>>,
    pub fetch: Rc<ScriptedFetch>,
    pub tasks: Rc<TaskQueue>,
    pub selected: Rc<RefCell<Vec<FeatureQueryResult>>>,
    attached: bool,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(EngineLog {
                resolution: Some(2_445.984_905_125_64),
                ..EngineLog::default()
            })),
            fetch: Rc::new(ScriptedFetch::default()),
            tasks: Rc::new(TaskQueue::default()),
            selected: Rc::new(RefCell::new(Vec::new())),
            attached: true,
        }
    }

    pub fn detached() -> Self {
        Self {
            attached: false,
            ..Self::new()
        }
    }

    pub fn host(&self) -> StubHost {
        StubHost {
            attached: self.attached,
            log: self.log.clone(),
        }
    }

    /// Surface wired to the stubs, reporting into `selected`.
    pub fn surface(&self) -> MapSurface<StubHost> {
        let surface = MapSurface::new(self.host(), self.fetch.clone(), self.tasks.clone());
        let sink = self.selected.clone();
        surface.on_feature_selected(move |result| sink.borrow_mut().push(result));
        surface
    }

    /// Dispatches a click the way the engine would.
    pub fn click(&self, coordinate: MapCoordinate) {
        let handler = self.log.borrow().handler.clone();
        if let Some(handler) = handler {
            handler(coordinate);
        }
    }
}
