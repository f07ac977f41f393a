use crate::proxmox::error::{ProxmoxError, Result};
use crate::proxmox::params::Params;
use log::{debug, info, warn};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

pub const DEFAULT_PORT: u16 = 8006;

/// How requests prove who they are.
#[derive(Clone)]
pub enum Secret {
    /// Exchanged for a session ticket before each call.
    Password(String),
    /// Sent as-is in the `Authorization` header; no ticket involved.
    Token { name: String, value: String },
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Password(_) => f.write_str("Password(***)"),
            Secret::Token { name, .. } => write!(f, "Token {{ name: {:?}, value: *** }}", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub secret: Secret,
    pub verify_tls: bool,
}

impl Credentials {
    pub fn with_password(host: &str, user: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            port: DEFAULT_PORT,
            user: user.to_string(),
            secret: Secret::Password(password.to_string()),
            verify_tls: true,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct Ticket {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken", alias = "csrfToken")]
    pub csrf_token: String,
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ticket(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ApiMethod {
    /// Reads and deletes carry their payload in the query string.
    pub fn sends_query(self) -> bool {
        matches!(self, ApiMethod::Get | ApiMethod::Delete)
    }
}

impl From<ApiMethod> for Method {
    fn from(m: ApiMethod) -> Self {
        match m {
            ApiMethod::Get => Method::GET,
            ApiMethod::Post => Method::POST,
            ApiMethod::Put => Method::PUT,
            ApiMethod::Delete => Method::DELETE,
        }
    }
}

/// Holds at most one ticket for this client's credentials. Disabled unless
/// a TTL is configured, in which case every call logs in again.
struct TicketCache {
    ttl: Option<Duration>,
    slot: Mutex<Option<(Ticket, Instant)>>,
}

impl TicketCache {
    fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl: ttl.filter(|d| !d.is_zero()),
            slot: Mutex::new(None),
        }
    }

    fn get(&self) -> Option<Ticket> {
        let ttl = self.ttl?;
        let guard = self.slot.lock().ok()?;
        match guard.as_ref() {
            Some((ticket, at)) if at.elapsed() < ttl => Some(ticket.clone()),
            _ => None,
        }
    }

    fn put(&self, ticket: &Ticket) {
        if self.ttl.is_none() {
            return;
        }
        if let Ok(mut guard) = self.slot.lock() {
            *guard = Some((ticket.clone(), Instant::now()));
        }
    }

    fn invalidate(&self) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = None;
        }
    }
}

enum Authorization {
    Ticket(Ticket),
    Token(String),
}

#[derive(Clone)]
pub struct ProxmoxClient {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    credentials: Arc<Credentials>,
    tickets: Arc<TicketCache>,
}

/// The two shapes Proxmox uses for `errors`, depending on API version.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    List(Vec<Value>),
    Map(Map<String, Value>),
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        let parts: Vec<String> = match self {
            ErrorBody::List(items) => items.iter().map(value_text).collect(),
            ErrorBody::Map(fields) => fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, value_text(v)))
                .collect(),
        };
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim_end().to_string(),
        other => other.to_string(),
    }
}

/// Turns a raw response into the unwrapped `data` value or a single
/// `Api` error.
pub(crate) fn resolve_response(status: StatusCode, body: &str) -> Result<Value> {
    let parsed: Option<Value> = if body.trim().is_empty() {
        None
    } else {
        serde_json::from_str(body).ok()
    };

    let errors = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .filter(|e| match e {
            Value::Null => false,
            Value::Object(m) => !m.is_empty(),
            Value::Array(a) => !a.is_empty(),
            _ => true,
        });

    if status.as_u16() >= 400 || errors.is_some() {
        let message = errors
            .and_then(|e| serde_json::from_value::<ErrorBody>(e.clone()).ok())
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        return Err(ProxmoxError::api(Some(status), message));
    }

    match parsed {
        Some(mut v) => match v.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Ok(v),
        },
        None if body.trim().is_empty() => Ok(Value::Null),
        None => Err(ProxmoxError::api(
            Some(status),
            "Response body is not valid JSON",
        )),
    }
}

/// Percent-encodes a free-form path segment (volume ids, UPIDs, user ids).
pub(crate) fn seg(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn base_url(host: &str, port: u16) -> Result<Url> {
    let host = host.trim().trim_end_matches('/');
    let with_scheme = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    let mut url = Url::parse(&with_scheme)?;
    if url.port().is_none() {
        url.set_port(Some(port))
            .map_err(|_| ProxmoxError::api(None, format!("Cannot set port on {}", host)))?;
    }
    url.set_path("/api2/json/");
    Ok(url)
}

impl ProxmoxClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let base_url = base_url(&credentials.host, credentials.port)?;

        let client = Client::builder()
            .danger_accept_invalid_certs(!credentials.verify_tls)
            .build()?;

        if !credentials.verify_tls {
            warn!("TLS certificate verification is disabled for {}", base_url);
        }

        Ok(Self {
            client,
            base_url,
            credentials: Arc::new(credentials),
            tickets: Arc::new(TicketCache::new(None)),
        })
    }

    /// Reuse tickets for `ttl` instead of logging in on every call.
    pub fn with_ticket_cache(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            info!("Ticket cache enabled (ttl {}s)", ttl.as_secs());
        }
        self.tickets = Arc::new(TicketCache::new(Some(ttl)));
        self
    }

    /// Unauthenticated `POST access/ticket`. The status code is not trusted
    /// on its own; the body must carry `data` with a ticket.
    pub async fn acquire_ticket(&self) -> Result<Ticket> {
        let password = match &self.credentials.secret {
            Secret::Password(p) => p,
            Secret::Token { .. } => {
                return Err(ProxmoxError::Authentication(
                    "API token credentials do not use session tickets".to_string(),
                ))
            }
        };

        let url = self.base_url.join("access/ticket")?;
        let params = [
            ("username", self.credentials.user.as_str()),
            ("password", password.as_str()),
        ];

        let resp = self.client.post(url).form(&params).send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        let data = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|mut v| v.get_mut("data").map(Value::take))
            .filter(|d| !d.is_null());

        let Some(data) = data else {
            warn!("Login as {} rejected ({})", self.credentials.user, status);
            return Err(ProxmoxError::Authentication(format!(
                "no session ticket returned for {} (status {})",
                self.credentials.user,
                status.as_u16()
            )));
        };

        let ticket: Ticket = serde_json::from_value(data).map_err(|e| {
            ProxmoxError::Authentication(format!("malformed ticket response: {}", e))
        })?;

        debug!("Acquired session ticket for {}", self.credentials.user);
        Ok(ticket)
    }

    async fn authorize(&self) -> Result<Authorization> {
        match &self.credentials.secret {
            Secret::Token { name, value } => Ok(Authorization::Token(format!(
                "PVEAPIToken={}!{}={}",
                self.credentials.user, name, value
            ))),
            Secret::Password(_) => {
                if let Some(ticket) = self.tickets.get() {
                    return Ok(Authorization::Ticket(ticket));
                }
                match self.acquire_ticket().await {
                    Ok(ticket) => {
                        self.tickets.put(&ticket);
                        Ok(Authorization::Ticket(ticket))
                    }
                    Err(e) => {
                        self.tickets.invalidate();
                        Err(e)
                    }
                }
            }
        }
    }

    /// One authenticated round trip. Returns the unwrapped `data` value,
    /// which may be `null`.
    pub async fn request_value(
        &self,
        method: ApiMethod,
        path: &str,
        params: Option<&Params>,
    ) -> Result<Value> {
        let auth = self.authorize().await?;

        let url = self.base_url.join(path)?;
        let mut req = self.client.request(method.into(), url);

        match &auth {
            Authorization::Token(header) => {
                req = req.header("Authorization", header);
            }
            Authorization::Ticket(ticket) => {
                req = req
                    .header("CSRFPreventionToken", &ticket.csrf_token)
                    .header("Cookie", format!("PVEAuthCookie={}", ticket.ticket));
            }
        }

        if let Some(p) = params.filter(|p| !p.is_empty()) {
            req = if method.sends_query() {
                req.query(&p.to_query())
            } else {
                req.json(&p.to_json())
            };
        }

        debug!("{:?} {}", method, path);

        let resp = req.send().await.map_err(|e| {
            warn!("{:?} {} failed: {}", method, path, e);
            ProxmoxError::from(e)
        })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tickets.invalidate();
        }

        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) if status.as_u16() >= 400 => {
                debug!("Failed to read error body: {}", e);
                String::new()
            }
            Err(e) => return Err(e.into()),
        };

        resolve_response(status, &body).inspect_err(|e| {
            debug!("{:?} {} -> {}: {}", method, path, status, e);
        })
    }

    pub(crate) async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: ApiMethod,
        path: &str,
        params: Option<&Params>,
    ) -> Result<T> {
        let value = self.request_value(method, path, params).await?;
        serde_json::from_value(value).map_err(ProxmoxError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_is_unwrapped() {
        for data in [
            json!({ "a": 1 }),
            json!([1, 2]),
            json!("UPID:pve1:0001"),
            json!(42),
            Value::Null,
        ] {
            let body = json!({ "data": data }).to_string();
            assert_eq!(resolve_response(StatusCode::OK, &body).unwrap(), data);
        }
    }

    #[test]
    fn test_empty_success_body_is_null() {
        assert_eq!(resolve_response(StatusCode::OK, "").unwrap(), Value::Null);
    }

    #[test]
    fn test_error_map_is_joined() {
        let body = json!({ "errors": { "vmid": "already exists" } }).to_string();
        let err = resolve_response(StatusCode::BAD_REQUEST, &body).unwrap_err();
        assert_eq!(err.to_string(), "vmid: already exists");

        let body = json!({ "errors": { "a": "x", "b": "y" } }).to_string();
        let err = resolve_response(StatusCode::BAD_REQUEST, &body).unwrap_err();
        assert_eq!(err.to_string(), "a: x; b: y");
    }

    #[test]
    fn test_error_list_is_joined_in_order() {
        let body = json!({ "errors": ["storage not found"] }).to_string();
        let err = resolve_response(StatusCode::INTERNAL_SERVER_ERROR, &body).unwrap_err();
        assert_eq!(err.to_string(), "storage not found");

        let body = json!({ "errors": ["second", "first"] }).to_string();
        let err = resolve_response(StatusCode::BAD_REQUEST, &body).unwrap_err();
        assert_eq!(err.to_string(), "second; first");
    }

    #[test]
    fn test_status_fallback_message() {
        let err = resolve_response(StatusCode::BAD_REQUEST, r#"{"data":null}"#).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 400");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

        let err = resolve_response(StatusCode::BAD_GATEWAY, "<html>oops</html>").unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 502");

        let err = resolve_response(StatusCode::BAD_REQUEST, r#"{"errors":{}}"#).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 400");
    }

    #[test]
    fn test_errors_win_over_data_on_success_status() {
        let body = json!({ "data": null, "errors": { "node": "invalid" } }).to_string();
        let err = resolve_response(StatusCode::OK, &body).unwrap_err();
        assert_eq!(err.to_string(), "node: invalid");
    }

    #[test]
    fn test_empty_errors_on_success_is_ok() {
        for body in [
            r#"{"data":"ok","errors":{}}"#,
            r#"{"data":"ok","errors":[]}"#,
            r#"{"data":"ok","errors":null}"#,
        ] {
            assert_eq!(resolve_response(StatusCode::OK, body).unwrap(), json!("ok"));
        }
    }

    #[test]
    fn test_body_without_data_is_returned_whole() {
        let body = json!({ "success": 1 }).to_string();
        assert_eq!(
            resolve_response(StatusCode::OK, &body).unwrap(),
            json!({ "success": 1 })
        );
    }

    #[test]
    fn test_base_url() {
        assert_eq!(
            base_url("10.0.0.1", 8006).unwrap().as_str(),
            "https://10.0.0.1:8006/api2/json/"
        );
        assert_eq!(
            base_url("http://127.0.0.1:9000/", 8006).unwrap().as_str(),
            "http://127.0.0.1:9000/api2/json/"
        );
        assert_eq!(
            base_url("https://pve.lan", 443).unwrap().as_str(),
            "https://pve.lan/api2/json/"
        );
    }

    #[test]
    fn test_seg_encodes_reserved_chars() {
        assert_eq!(seg("local:iso/debian.iso"), "local%3Aiso%2Fdebian.iso");
        assert_eq!(seg("snap1"), "snap1");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let creds = Credentials::with_password("h", "root@pam", "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
