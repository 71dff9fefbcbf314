//! Scripted in-memory [`Fetcher`] so tests never touch the network.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;
use wms_common::{Credentials, FetchError, FetchResult};
use wms_protocol::Fetcher;

/// One request seen by a [`MockFetcher`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: Url,
    pub credentials: Option<Credentials>,
}

impl RecordedCall {
    /// Value of a query parameter, key compared case-insensitively.
    pub fn param(&self, key: &str) -> Option<String> {
        query_param(&self.url, key)
    }
}

#[derive(Debug, Clone)]
enum Response {
    Body(Bytes),
    Status(u16),
}

#[derive(Debug, Clone)]
struct Route {
    path: String,
    request: String,
    response: Response,
}

/// Answers requests by URL path and WMS `REQUEST` parameter.
///
/// Requests without a matching route fail with a transport error, as an
/// unreachable host would.
///
/// ```ignore
/// let fetcher = MockFetcher::new()
///     .with_capabilities("/ows/demo", fixtures::demo_project_settings())
///     .with_map("/ows/demo", fixtures::PNG_BYTES);
/// ```
#[derive(Debug, Default)]
pub struct MockFetcher {
    routes: Vec<Route>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `REQUEST=GetProjectSettings` on `path` with `xml`.
    pub fn with_capabilities(self, path: &str, xml: impl Into<String>) -> Self {
        let body = Bytes::from(xml.into());
        self.route(path, "GetProjectSettings", Response::Body(body))
    }

    /// Answer `REQUEST=GetMap` on `path` with `image`.
    pub fn with_map(self, path: &str, image: impl Into<Bytes>) -> Self {
        self.route(path, "GetMap", Response::Body(image.into()))
    }

    /// Answer `request` on `path` with an HTTP error status.
    pub fn with_status(self, path: &str, request: &str, status: u16) -> Self {
        self.route(path, request, Response::Status(status))
    }

    fn route(mut self, path: &str, request: &str, response: Response) -> Self {
        self.routes.push(Route {
            path: path.to_string(),
            request: request.to_string(),
            response,
        });
        self
    }

    /// Every request made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Requests made so far with the given `REQUEST` parameter.
    pub fn calls_for(&self, request: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                call.param("REQUEST")
                    .map(|r| r.eq_ignore_ascii_case(request))
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url, credentials: Option<&Credentials>) -> FetchResult<Bytes> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                url: url.clone(),
                credentials: credentials.cloned(),
            });

        let request = query_param(url, "REQUEST").unwrap_or_default();
        let route = self.routes.iter().find(|route| {
            route.path == url.path() && route.request.eq_ignore_ascii_case(&request)
        });

        match route.map(|r| &r.response) {
            Some(Response::Body(body)) => Ok(body.clone()),
            Some(Response::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.into_owned())
}
