use std::fmt;
use std::sync::Arc;

/// Status recorded for a request that never produced an HTTP response.
pub const TRANSPORT_ERROR_STATUS: u16 = 0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
}

/// One completed request. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub method: RequestMethod,
    /// Route template (e.g. `/skiers/{resortID}/days/{dayID}/skiers/{skierID}`), not the
    /// concrete URL, so samples group per endpoint.
    pub path: Arc<str>,
    pub start_time_ms: u64,
    pub latency_ms: u64,
    pub status: u16,
}

impl Sample {
    pub fn endpoint(&self) -> EndpointKey {
        EndpointKey {
            method: self.method,
            path: self.path.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_transport_error(&self) -> bool {
        self.status == TRANSPORT_ERROR_STATUS
    }
}

/// `(method, path)` pair statistics are grouped by. Displays as `"POST /skiers/liftrides"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub method: RequestMethod,
    pub path: Arc<str>,
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(method: RequestMethod, path: &str, status: u16) -> Sample {
        Sample {
            method,
            path: Arc::from(path),
            start_time_ms: 1_700_000_000_000,
            latency_ms: 12,
            status,
        }
    }

    #[test]
    fn endpoint_key_renders_method_and_path() {
        let s = sample(RequestMethod::Post, "/skiers/liftrides", 201);
        assert_eq!(s.endpoint().to_string(), "POST /skiers/liftrides");
    }

    #[test]
    fn success_is_2xx_only() {
        assert!(sample(RequestMethod::Get, "/x", 200).is_success());
        assert!(sample(RequestMethod::Get, "/x", 299).is_success());
        assert!(!sample(RequestMethod::Get, "/x", 300).is_success());
        assert!(!sample(RequestMethod::Get, "/x", 404).is_success());

        let failed = sample(RequestMethod::Get, "/x", TRANSPORT_ERROR_STATUS);
        assert!(!failed.is_success());
        assert!(failed.is_transport_error());
    }

    #[test]
    fn methods_parse_from_upper_case() {
        assert_eq!("POST".parse::<RequestMethod>().ok(), Some(RequestMethod::Post));
        assert_eq!(RequestMethod::Get.to_string(), "GET");
        assert!("PATCH".parse::<RequestMethod>().is_err());
    }

    #[test]
    fn endpoint_keys_order_by_method_then_path() {
        let get = sample(RequestMethod::Get, "/b", 200).endpoint();
        let post = sample(RequestMethod::Post, "/a", 200).endpoint();
        assert!(get < post);
    }
}
