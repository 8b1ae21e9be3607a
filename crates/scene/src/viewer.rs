//! UI-facing state derived from surface status and query results.

use layers::feature::FeatureRecord;
use streaming::{FeatureQueryResult, QueryErrorKind};

use crate::surface::SurfaceStatus;

pub const QUERY_FAILED_MESSAGE: &str = "Failed to fetch feature information";
pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize map";
pub const LOADING_MESSAGE: &str = "Loading map...";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub is_open: bool,
    pub feature: Option<FeatureRecord>,
}

impl PanelState {
    pub fn title(&self) -> Option<String> {
        self.feature
            .as_ref()
            .map(|f| format!("{} Feature", f.geometry_type))
    }

    pub fn subtitle(&self) -> Option<String> {
        self.feature.as_ref().map(|f| format!("ID: {}", f.identifier))
    }

    /// Property rows as display strings, in service order.
    pub fn rows(&self) -> Vec<(String, String)> {
        self.feature
            .iter()
            .flat_map(|f| f.properties.iter())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    /// Network or parse failure; stays until dismissed.
    QueryFailed,
    /// Local guard failure; cleared by the next result.
    Transient(QueryErrorKind),
    /// Whole surface disabled.
    InitFailed,
}

impl Banner {
    pub fn message(&self) -> String {
        match self {
            Banner::QueryFailed => QUERY_FAILED_MESSAGE.to_string(),
            Banner::Transient(kind) => kind.to_string(),
            Banner::InitFailed => INIT_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn dismissible(&self) -> bool {
        !matches!(self, Banner::InitFailed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub layer_visible: bool,
    pub panel: PanelState,
    pub banner: Option<Banner>,
    pub loading: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            layer_visible: true,
            panel: PanelState::default(),
            banner: None,
            loading: true,
        }
    }
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one accepted query result into panel and banner.
    ///
    /// Failures never touch the panel; the selection shown stays the last
    /// successful (or empty) answer.
    pub fn apply(&mut self, result: &FeatureQueryResult) {
        match result {
            FeatureQueryResult::Success(feature) => {
                self.panel = PanelState {
                    is_open: true,
                    feature: Some(feature.clone()),
                };
                self.clear_query_banner();
            }
            FeatureQueryResult::Empty => {
                self.panel = PanelState::default();
                self.clear_query_banner();
            }
            FeatureQueryResult::Failure(kind) if kind.is_guard() => {
                if self.banner != Some(Banner::InitFailed) {
                    self.banner = Some(Banner::Transient(*kind));
                }
            }
            FeatureQueryResult::Failure(_) => {
                if self.banner != Some(Banner::InitFailed) {
                    self.banner = Some(Banner::QueryFailed);
                }
            }
        }
    }

    pub fn observe_surface(&mut self, status: &SurfaceStatus) {
        match status {
            SurfaceStatus::Unloaded => self.loading = true,
            SurfaceStatus::Ready => {
                self.loading = false;
                if self.banner == Some(Banner::InitFailed) {
                    self.banner = None;
                }
            }
            SurfaceStatus::Failed(_) => {
                self.loading = false;
                self.banner = Some(Banner::InitFailed);
            }
            SurfaceStatus::TornDown => {}
        }
    }

    pub fn close_panel(&mut self) {
        self.panel = PanelState::default();
    }

    pub fn dismiss_banner(&mut self) {
        if self.banner.as_ref().is_some_and(Banner::dismissible) {
            self.banner = None;
        }
    }

    pub fn set_layer_visible(&mut self, visible: bool) {
        self.layer_visible = visible;
    }

    pub fn layer_label(&self) -> &'static str {
        if self.layer_visible { "Visible" } else { "Hidden" }
    }

    /// Overlay shown over the map while nothing else is.
    pub fn overlay_message(&self) -> Option<&'static str> {
        (self.loading && self.banner.is_none()).then_some(LOADING_MESSAGE)
    }

    fn clear_query_banner(&mut self) {
        if matches!(self.banner, Some(Banner::QueryFailed | Banner::Transient(_))) {
            self.banner = None;
        }
    }
}
