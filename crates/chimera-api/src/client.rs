// Device Service HTTP client
//
// Wraps `reqwest::Client` with URL construction under the configured base,
// status handling, and JSON decoding. Every method returns the decoded body
// or a typed `Error`; callers never see a `reqwest::Response`.

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{ActionRequest, Device, DeviceId, DeviceUpdate, ServiceInfo, Summary};
use crate::transport::TransportConfig;

/// FastAPI-style error body: `{"detail": "..."}` or `{"detail": [...]}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Async client for the Device Service REST API.
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl DeviceClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the service root (e.g. `http://192.168.0.103:8000`);
    /// a path prefix is kept, so reverse-proxied mounts work.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: 0,
        }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// List every device.
    ///
    /// `GET /api/devices`
    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        let url = self.api_url("api/devices")?;
        debug!("listing devices");
        self.get(url).await
    }

    /// Fetch aggregate statistics.
    ///
    /// `GET /api/summary`
    pub async fn get_summary(&self) -> Result<Summary, Error> {
        let url = self.api_url("api/summary")?;
        debug!("fetching summary");
        self.get(url).await
    }

    /// Perform an action and return the device as the service now sees it.
    ///
    /// `POST /api/devices/{id}/actions`
    pub async fn perform_action(
        &self,
        id: DeviceId,
        request: &ActionRequest,
    ) -> Result<Device, Error> {
        let url = self.api_url(&format!("api/devices/{id}/actions"))?;
        debug!(device_id = %id, action = %request.action, category = ?request.category, "performing device action");
        self.send(self.http.post(url).json(request)).await
    }

    /// Patch name, group, or blocklist entries of a device.
    ///
    /// `PATCH /api/devices/{id}`
    pub async fn update_device(&self, id: DeviceId, update: &DeviceUpdate) -> Result<Device, Error> {
        let url = self.api_url(&format!("api/devices/{id}"))?;
        debug!(device_id = %id, "updating device");
        self.send(self.http.patch(url).json(update)).await
    }

    /// Service banner.
    ///
    /// `GET /`
    pub async fn service_info(&self) -> Result<ServiceInfo, Error> {
        let url = self.api_url("")?;
        self.get(url).await
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build `{base}/{path}`, keeping any prefix the base URL carries.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        self.send(self.http.get(url)).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, Error> {
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        self.parse_response(resp).await
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() && self.timeout_secs > 0 {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Map non-2xx to `Error::Status`, otherwise decode the JSON body.
    async fn parse_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview = truncate(&body, 200);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

fn error_detail(body: &str) -> Option<String> {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(s)),
        }) => Some(s),
        Ok(ErrorBody {
            detail: Some(other),
        }) => Some(other.to_string()),
        _ if body.trim().is_empty() => None,
        _ => Some(truncate(body, 200).to_owned()),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> DeviceClient {
        DeviceClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn api_url_joins_without_double_slash() {
        let c = client("http://localhost:8000/");
        assert_eq!(
            c.api_url("api/devices").unwrap().as_str(),
            "http://localhost:8000/api/devices"
        );
    }

    #[test]
    fn api_url_keeps_path_prefix() {
        let c = client("https://gw.example.com/chimera");
        assert_eq!(
            c.api_url("api/devices/3/actions").unwrap().as_str(),
            "https://gw.example.com/chimera/api/devices/3/actions"
        );
    }

    #[test]
    fn error_detail_prefers_fastapi_detail() {
        assert_eq!(
            error_detail(r#"{"detail":"Device not found"}"#).as_deref(),
            Some("Device not found")
        );
        assert!(error_detail(r#"{"detail":[{"msg":"bad"}]}"#).unwrap().contains("bad"));
        assert_eq!(error_detail("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_detail("   "), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "ééééé";
        assert_eq!(truncate(s, 3), "é");
        assert_eq!(truncate("short", 200), "short");
    }
}
