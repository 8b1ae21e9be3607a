use std::fmt;

use foundation::math::{MapCoordinate, WEB_MERCATOR};
use layers::feature::{FeatureRecord, parse_feature_collection};
use layers::wms::{INFO_FORMAT_JSON, WmsSource};
use tracing::{debug, warn};

use crate::fetch::Fetch;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// The engine had no view resolution yet.
    ResolutionUnavailable,
    UrlConstructionFailed,
    /// Transport failure or a non-2xx status.
    NetworkError,
    ParseError,
}

impl QueryErrorKind {
    /// Guard failures are detected locally and never reach the network.
    pub fn is_guard(self) -> bool {
        matches!(
            self,
            QueryErrorKind::ResolutionUnavailable | QueryErrorKind::UrlConstructionFailed
        )
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::ResolutionUnavailable => write!(f, "map resolution unavailable"),
            QueryErrorKind::UrlConstructionFailed => write!(f, "could not build feature query"),
            QueryErrorKind::NetworkError => write!(f, "feature query failed"),
            QueryErrorKind::ParseError => write!(f, "unreadable feature query response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureQueryResult {
    Success(FeatureRecord),
    Empty,
    Failure(QueryErrorKind),
}

impl FeatureQueryResult {
    pub fn feature(&self) -> Option<&FeatureRecord> {
        match self {
            FeatureQueryResult::Success(f) => Some(f),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<QueryErrorKind> {
        match self {
            FeatureQueryResult::Failure(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Resolves one click into a feature-info result.
///
/// Holds no state between calls; every failure comes back as `Failure`.
pub async fn query_feature_info<F>(
    fetcher: &F,
    source: &WmsSource,
    coordinate: MapCoordinate,
    resolution: Option<f64>,
) -> FeatureQueryResult
where
    F: Fetch + ?Sized,
{
    let Some(resolution) = resolution else {
        debug!("feature query skipped: no view resolution");
        return FeatureQueryResult::Failure(QueryErrorKind::ResolutionUnavailable);
    };

    let url = match source.feature_info_url(coordinate, resolution, WEB_MERCATOR, INFO_FORMAT_JSON)
    {
        Ok(url) => url,
        Err(err) => {
            warn!("feature query url: {err}");
            return FeatureQueryResult::Failure(QueryErrorKind::UrlConstructionFailed);
        }
    };

    debug!(%url, "issuing feature query");
    let resp = match fetcher.get(&url).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!("feature query fetch: {err}");
            return FeatureQueryResult::Failure(QueryErrorKind::NetworkError);
        }
    };

    if !resp.is_success() {
        warn!(status = resp.status, "feature query returned non-success status");
        return FeatureQueryResult::Failure(QueryErrorKind::NetworkError);
    }

    let features = match parse_feature_collection(&resp.body) {
        Ok(features) => features,
        Err(err) => {
            warn!("feature query response: {err}");
            return FeatureQueryResult::Failure(QueryErrorKind::ParseError);
        }
    };

    // First hit wins; the service's order is authoritative.
    match features.into_iter().next() {
        Some(feature) => FeatureQueryResult::Success(feature),
        None => FeatureQueryResult::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureQueryResult, QueryErrorKind, query_feature_info};
    use crate::fetch::{Fetch, FetchError, FetchResponse};
    use foundation::math::MapCoordinate;
    use futures_util::FutureExt as _;
    use futures_util::future::LocalBoxFuture;
    use layers::config::MapConfiguration;
    use layers::feature::PropertyValue;
    use layers::wms::WmsSource;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    struct StubFetch {
        reply: Result<FetchResponse, FetchError>,
        urls: RefCell<Vec<String>>,
    }

    impl StubFetch {
        fn new(reply: Result<FetchResponse, FetchError>) -> Self {
            Self {
                reply,
                urls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetch for StubFetch {
        fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>> {
            self.urls.borrow_mut().push(url.to_string());
            let reply = self.reply.clone();
            async move { reply }.boxed_local()
        }
    }

    fn source() -> WmsSource {
        WmsSource::new(&MapConfiguration::new("https://svc/wms", "cite:example"))
    }

    fn run(fetch: &StubFetch, source: &WmsSource, resolution: Option<f64>) -> FeatureQueryResult {
        pollster::block_on(query_feature_info(
            fetch,
            source,
            MapCoordinate::new(1_391_493.6, 5_146_011.7),
            resolution,
        ))
    }

    #[test]
    fn first_feature_wins() {
        let body = r#"{"features":[
            {"id":"a.1","geometry":{"type":"Polygon"},"properties":{"name":"Sample","area":1250.75}},
            {"id":"a.2","geometry":{"type":"Polygon"},"properties":{"name":"Other"}}
        ]}"#;
        let fetch = StubFetch::new(Ok(FetchResponse::ok(body)));
        let result = run(&fetch, &source(), Some(2445.98));

        let feature = result.feature().expect("success");
        assert_eq!(feature.identifier, "a.1");
        assert_eq!(feature.geometry_type, "Polygon");
        assert_eq!(
            feature.properties,
            vec![
                ("name".to_string(), PropertyValue::from("Sample")),
                ("area".to_string(), PropertyValue::from(1250.75)),
            ]
        );
        let urls = fetch.urls.borrow();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("INFO_FORMAT=application%2Fjson"));
    }

    #[test]
    fn missing_resolution_never_fetches() {
        let fetch = StubFetch::new(Ok(FetchResponse::ok("{}")));
        let result = run(&fetch, &source(), None);
        assert_eq!(
            result,
            FeatureQueryResult::Failure(QueryErrorKind::ResolutionUnavailable)
        );
        assert!(fetch.urls.borrow().is_empty());
    }

    #[test]
    fn unbuildable_url_never_fetches() {
        let fetch = StubFetch::new(Ok(FetchResponse::ok("{}")));
        let no_endpoint = WmsSource::new(&MapConfiguration::new("", "cite:example"));
        let result = run(&fetch, &no_endpoint, Some(10.0));
        assert_eq!(
            result,
            FeatureQueryResult::Failure(QueryErrorKind::UrlConstructionFailed)
        );
        assert!(result.error().is_some_and(QueryErrorKind::is_guard));
        assert!(fetch.urls.borrow().is_empty());
    }

    #[test]
    fn empty_collection_is_not_a_failure() {
        let fetch = StubFetch::new(Ok(FetchResponse::ok(r#"{"features":[]}"#)));
        assert_eq!(run(&fetch, &source(), Some(10.0)), FeatureQueryResult::Empty);
    }

    #[test]
    fn transport_and_status_failures_are_network_errors() {
        let refused = StubFetch::new(Err(FetchError::Transport("connection refused".into())));
        assert_eq!(
            run(&refused, &source(), Some(10.0)),
            FeatureQueryResult::Failure(QueryErrorKind::NetworkError)
        );

        // A parseable body does not rescue a server error.
        let server_error = StubFetch::new(Ok(FetchResponse::new(500, r#"{"features":[]}"#)));
        assert_eq!(
            run(&server_error, &source(), Some(10.0)),
            FeatureQueryResult::Failure(QueryErrorKind::NetworkError)
        );
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let fetch = StubFetch::new(Ok(FetchResponse::ok("<ServiceExceptionReport/>")));
        let result = run(&fetch, &source(), Some(10.0));
        assert_eq!(result, FeatureQueryResult::Failure(QueryErrorKind::ParseError));
        assert!(!QueryErrorKind::ParseError.is_guard());
    }
}
