use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skiload_http::{HttpClient, HttpRequest, HttpTransportErrorKind, join_url, join_url_segments};

/// Route of the lift-ride write.
pub const LIFT_RIDES_PATH: &str = "/skiers/liftrides";
/// Route template of the per-skier vertical read.
pub const SKIER_DAY_VERTICAL_PATH: &str = "/skiers/{resortID}/days/{dayID}/skiers/{skierID}";

/// Body of `POST /skiers/liftrides`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftRide {
    #[serde(rename = "resortID")]
    pub resort_id: String,
    #[serde(rename = "dayID")]
    pub day_id: u32,
    #[serde(rename = "skierID")]
    pub skier_id: u32,
    pub time: u32,
    #[serde(rename = "liftID")]
    pub lift_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerticalQuery {
    pub resort_id: String,
    pub day_id: u32,
    pub skier_id: u32,
}

impl VerticalQuery {
    /// Unencoded path segments, e.g. `["skiers", "SilverMt", "days", "1", "skiers", "42"]`.
    pub fn path_segments(&self) -> [String; 6] {
        [
            "skiers".to_string(),
            self.resort_id.clone(),
            "days".to_string(),
            self.day_id.to_string(),
            "skiers".to_string(),
            self.skier_id.to_string(),
        ]
    }
}

/// Transport and API schema seam between workers and the service under load.
///
/// Implementations return the response status; an `Err` means no response was received.
/// Latency is measured by the caller.
pub trait RequestExecutor: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write(&self, ride: &LiftRide) -> impl Future<Output = Result<u16, Self::Error>> + Send;

    fn read(&self, query: &VerticalQuery)
    -> impl Future<Output = Result<u16, Self::Error>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Http(#[from] skiload_http::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ExecutorError {
    pub fn transport_error_kind(&self) -> Option<HttpTransportErrorKind> {
        match self {
            Self::Http(err) => Some(err.transport_error_kind()),
            Self::Encode(_) => None,
        }
    }
}

/// [`RequestExecutor`] speaking the lift-ride API over HTTP/1.1.
#[derive(Debug)]
pub struct HttpExecutor {
    client: HttpClient,
    write_url: String,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl HttpExecutor {
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Self {
        Self::with_client(HttpClient::default(), base_url, request_timeout)
    }

    pub fn with_client(client: HttpClient, base_url: &str, request_timeout: Option<Duration>) -> Self {
        Self {
            client,
            write_url: join_url(base_url, LIFT_RIDES_PATH),
            base_url: base_url.to_string(),
            request_timeout,
        }
    }
}

impl RequestExecutor for HttpExecutor {
    type Error = ExecutorError;

    async fn write(&self, ride: &LiftRide) -> Result<u16, Self::Error> {
        let body = serde_json::to_vec(ride)?;
        let req = HttpRequest::post_json(self.write_url.clone(), body)
            .with_timeout(self.request_timeout);
        let res = self.client.request(req).await?;
        Ok(res.status)
    }

    async fn read(&self, query: &VerticalQuery) -> Result<u16, Self::Error> {
        let segments = query.path_segments();
        let url = join_url_segments(&self.base_url, segments.iter().map(String::as_str))?;
        let req = HttpRequest::get(url).with_timeout(self.request_timeout);
        let res = self.client.request(req).await?;
        Ok(res.status)
    }
}
