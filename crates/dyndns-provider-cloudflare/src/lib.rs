// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider for the dyndns system, using
// the client API at `https://www.cloudflare.com/api_json.html`.
//
// ## Operations
//
// Both operations are a POST with every parameter in the query string.
//
// - `a=rec_load_all`: `email`, `tkn`, `z`. Returns
//   `{ "response": { "recs": { "objs": [ { "rec_id", "name", "type", "content" } ] } } }`
// - `a=rec_edit`: `email`, `tkn`, `z`, `type=A`, `name`, `service_mode=0`,
//   `content`, `id`, `ttl`. Any success status means the edit took effect.
//
// ## Constraints
//
// - One HTTP request per call; no retry, no backoff, no caching
// - All errors propagate to the engine
// - The API token never appears in logs or Debug output

use async_trait::async_trait;
use dyndns_core::config::ProviderConfig;
use dyndns_core::http::{HttpRequest, HttpTransport};
use dyndns_core::traits::dns_provider::RECORD_TYPE_A;
use dyndns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord};
use dyndns_core::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare DNS provider bound to one domain and one target record
pub struct CloudflareProvider {
    /// Account e-mail
    email: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone name
    domain: String,

    /// Record name to manage
    target: String,

    /// TTL sent with every edit
    ttl: u32,

    /// API endpoint
    api_url: String,

    /// Dry-run mode: resolve records but skip edits
    dry_run: bool,

    /// HTTP transport
    transport: Arc<dyn HttpTransport>,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("email", &self.email)
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("target", &self.target)
            .field("ttl", &self.ttl)
            .field("api_url", &self.api_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider from configuration and a transport
    pub fn new(config: &ProviderConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;

        let ProviderConfig::Cloudflare {
            email,
            api_token,
            domain,
            target,
            ttl,
            api_url,
            dry_run,
        } = config;

        if *dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            email: email.clone(),
            api_token: api_token.clone(),
            domain: domain.clone(),
            target: target.clone(),
            ttl: *ttl,
            api_url: api_url.clone(),
            dry_run: *dry_run,
            transport,
        })
    }

    /// Whether edits are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Request carrying credentials, action and zone
    fn api_request(&self, action: &str) -> HttpRequest {
        HttpRequest::post(&self.api_url)
            .param("email", &self.email)
            .param("tkn", &self.api_token)
            .param("a", action)
            .param("z", &self.domain)
    }

    /// Build the `rec_load_all` request
    pub fn load_all_request(&self) -> HttpRequest {
        self.api_request("rec_load_all")
    }

    /// Build the `rec_edit` request
    pub fn edit_request(&self, new_ip: &str, record_id: u64) -> HttpRequest {
        self.api_request("rec_edit")
            .param("type", RECORD_TYPE_A)
            .param("name", &self.target)
            .param("service_mode", "0")
            .param("content", new_ip)
            .param("id", record_id.to_string())
            .param("ttl", self.ttl.to_string())
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn get_record(&self) -> Result<DnsRecord> {
        tracing::debug!("POST rec_load_all for zone {}", self.domain);

        let response = self.transport.send(self.load_all_request()).await?;
        if !response.is_success() {
            return Err(Error::bad_status(
                response.status,
                format!("rec_load_all for {} failed", self.domain),
            ));
        }

        let records = parse_load_all(&response.body)?;
        tracing::debug!("Zone {} has {} record(s)", self.domain, records.len());

        find_record(records, &self.target)
    }

    async fn set_record(&self, new_ip: &str, record_id: u64) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would POST rec_edit for {} (id {}): content={} ttl={}",
                self.target,
                record_id,
                new_ip,
                self.ttl
            );
            return Ok(());
        }

        tracing::debug!("POST rec_edit for {} (id {})", self.target, record_id);

        let response = self
            .transport
            .send(self.edit_request(new_ip, record_id))
            .await?;
        if !response.is_success() {
            return Err(Error::bad_status(
                response.status,
                format!("rec_edit for {} failed", self.target),
            ));
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[derive(Debug, Deserialize)]
struct LoadAllResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    response: Option<LoadAllBody>,
}

#[derive(Debug, Deserialize)]
struct LoadAllBody {
    recs: RecordSet,
}

#[derive(Debug, Deserialize)]
struct RecordSet {
    /// Absent when the zone has no records
    #[serde(default)]
    objs: Vec<RawRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRecord {
    rec_id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
}

/// Decode a `rec_load_all` body into its ordered record list
fn parse_load_all(body: &str) -> Result<Vec<RawRecord>> {
    let parsed: LoadAllResponse = serde_json::from_str(body)?;

    if parsed.result.as_deref() == Some("error") {
        return Err(Error::provider(
            PROVIDER_NAME,
            parsed.msg.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    parsed
        .response
        .map(|body| body.recs.objs)
        .ok_or_else(|| Error::decode("rec_load_all response has no records object"))
}

/// First record named `target` with type A, in list order
fn find_record(records: Vec<RawRecord>, target: &str) -> Result<DnsRecord> {
    let raw = records
        .into_iter()
        .find(|r| r.name == target && r.record_type == RECORD_TYPE_A)
        .ok_or_else(|| Error::not_found(format!("{} (type {})", target, RECORD_TYPE_A)))?;

    let id = raw.rec_id.parse::<u64>().map_err(|e| {
        Error::decode(format!("record {} has invalid rec_id {:?}: {}", target, raw.rec_id, e))
    })?;

    // The edit sends the id back as a decimal string; it must match what was read
    if id.to_string() != raw.rec_id {
        return Err(Error::decode(format!(
            "record {} has non-canonical rec_id {:?}",
            target, raw.rec_id
        )));
    }

    Ok(DnsRecord {
        id,
        name: raw.name,
        record_type: raw.record_type,
        content: raw.content,
    })
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory {
    transport: Arc<dyn HttpTransport>,
}

impl CloudflareFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(CloudflareProvider::new(
            config,
            Arc::clone(&self.transport),
        )?))
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust,no_run
/// use dyndns_core::{ProviderRegistry, ReqwestTransport};
/// use std::sync::Arc;
///
/// let registry = ProviderRegistry::new();
/// let transport = Arc::new(ReqwestTransport::new().unwrap());
/// dyndns_provider_cloudflare::register(&registry, transport);
/// ```
pub fn register(registry: &dyndns_core::ProviderRegistry, transport: Arc<dyn HttpTransport>) {
    registry.register_provider(PROVIDER_NAME, Box::new(CloudflareFactory::new(transport)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyndns_core::http::{HttpResponse, Method};
    use std::sync::Mutex;

    /// Replays one canned response per request and records what was sent
    struct ScriptedTransport {
        responses: Mutex<Vec<Result<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<HttpResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            assert!(!responses.is_empty(), "unexpected request");
            responses.remove(0)
        }
    }

    fn config() -> ProviderConfig {
        ProviderConfig::cloudflare(
            "admin@example.com",
            "secret_token_12345",
            "example.com",
            "home.example.com",
        )
    }

    fn provider(transport: Arc<ScriptedTransport>) -> CloudflareProvider {
        CloudflareProvider::new(&config(), transport).unwrap()
    }

    fn load_all_body(records: &[(&str, &str, &str, &str)]) -> String {
        let objs: Vec<serde_json::Value> = records
            .iter()
            .map(|(id, name, kind, content)| {
                serde_json::json!({
                    "rec_id": id,
                    "name": name,
                    "type": kind,
                    "content": content,
                    "ttl": "120",
                })
            })
            .collect();
        serde_json::json!({
            "request": { "act": "rec_load_all" },
            "response": { "recs": { "has_more": false, "count": objs.len(), "objs": objs } },
            "result": "success",
            "msg": null,
        })
        .to_string()
    }

    #[tokio::test]
    async fn get_record_finds_match_among_others() {
        let body = load_all_body(&[
            ("100", "example.com", "A", "10.0.0.1"),
            ("101", "home.example.com", "AAAA", "2001:db8::1"),
            ("102", "www.example.com", "CNAME", "example.com"),
            ("103", "home.example.com", "A", "1.2.3.4"),
            ("104", "home.example.com", "A", "9.9.9.9"),
        ]);
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body))]);
        let provider = provider(transport.clone());

        let record = provider.get_record().await.unwrap();
        assert_eq!(
            record,
            DnsRecord {
                id: 103,
                name: "home.example.com".to_string(),
                record_type: "A".to_string(),
                content: "1.2.3.4".to_string(),
            }
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, dyndns_core::config::DEFAULT_API_URL);
        assert_eq!(
            requests[0].query,
            vec![
                ("email".to_string(), "admin@example.com".to_string()),
                ("tkn".to_string(), "secret_token_12345".to_string()),
                ("a".to_string(), "rec_load_all".to_string()),
                ("z".to_string(), "example.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn get_record_match_in_first_position() {
        let body = load_all_body(&[
            ("7", "home.example.com", "A", "5.6.7.8"),
            ("8", "mail.example.com", "A", "5.6.7.9"),
        ]);
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body))]);

        let record = provider(transport).get_record().await.unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.content, "5.6.7.8");
    }

    #[tokio::test]
    async fn get_record_without_match_is_not_found() {
        let body = load_all_body(&[
            ("1", "example.com", "A", "10.0.0.1"),
            ("2", "home.example.com", "TXT", "hello"),
        ]);
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body))]);

        let err = provider(transport).get_record().await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn get_record_empty_list_is_not_found() {
        let transport =
            ScriptedTransport::new(vec![Ok(HttpResponse::new(200, load_all_body(&[])))]);

        let err = provider(transport).get_record().await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn get_record_bad_status_is_transport_error() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(502, "bad gateway"))]);

        let err = provider(transport).get_record().await.unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(502), .. }));
    }

    #[tokio::test]
    async fn get_record_connection_failure_propagates() {
        let transport =
            ScriptedTransport::new(vec![Err(Error::transport("connection refused"))]);

        let err = provider(transport).get_record().await.unwrap_err();
        assert!(matches!(err, Error::Transport { status: None, .. }));
    }

    #[tokio::test]
    async fn get_record_malformed_json_is_decode_error() {
        let transport =
            ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "<html>oops</html>"))]);

        let err = provider(transport).get_record().await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn get_record_api_error_is_provider_error() {
        let body = r#"{"result":"error","msg":"Invalid token","err_code":"E_UNAUTH"}"#;
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body))]);

        let err = provider(transport).get_record().await.unwrap_err();
        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "cloudflare");
                assert_eq!(message, "Invalid token");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_record_non_numeric_id_is_decode_error() {
        let body = load_all_body(&[("abc", "home.example.com", "A", "1.2.3.4")]);
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body))]);

        let err = provider(transport).get_record().await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn set_record_sends_edit_parameters() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "{}"))]);
        let provider = provider(transport.clone());

        provider.set_record("5.6.7.8", 103).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(
            requests[0].query,
            vec![
                ("email".to_string(), "admin@example.com".to_string()),
                ("tkn".to_string(), "secret_token_12345".to_string()),
                ("a".to_string(), "rec_edit".to_string()),
                ("z".to_string(), "example.com".to_string()),
                ("type".to_string(), "A".to_string()),
                ("name".to_string(), "home.example.com".to_string()),
                ("service_mode".to_string(), "0".to_string()),
                ("content".to_string(), "5.6.7.8".to_string()),
                ("id".to_string(), "103".to_string()),
                ("ttl".to_string(), "120".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn set_record_bad_status_carries_code() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(403, "forbidden"))]);

        let err = provider(transport).set_record("5.6.7.8", 1).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn set_record_ignores_body() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "not json at all"))]);

        assert!(provider(transport).set_record("5.6.7.8", 1).await.is_ok());
    }

    #[tokio::test]
    async fn dry_run_skips_edit() {
        let mut config = config();
        let ProviderConfig::Cloudflare { dry_run, .. } = &mut config;
        *dry_run = true;

        let transport = ScriptedTransport::new(vec![]);
        let provider = CloudflareProvider::new(&config, transport.clone()).unwrap();

        assert!(provider.is_dry_run());
        provider.set_record("5.6.7.8", 1).await.unwrap();
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn record_id_round_trips_through_edit() {
        for raw_id in ["0", "1", "42", "123456789", "18446744073709551615"] {
            let body = load_all_body(&[(raw_id, "home.example.com", "A", "1.2.3.4")]);
            let transport = ScriptedTransport::new(vec![
                Ok(HttpResponse::new(200, body)),
                Ok(HttpResponse::new(200, "")),
            ]);
            let provider = provider(transport.clone());

            let record = provider.get_record().await.unwrap();
            provider.set_record("5.6.7.8", record.id).await.unwrap();

            let edit = &transport.requests()[1];
            assert_eq!(edit.query_value("id"), Some(raw_id));
        }

        // Ids that would not be written back unchanged are rejected up front
        for raw_id in ["+7", "007", " 7", "18446744073709551616"] {
            let body = load_all_body(&[(raw_id, "home.example.com", "A", "1.2.3.4")]);
            let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body))]);

            let err = provider(transport).get_record().await.unwrap_err();
            assert!(matches!(err, Error::Decode(_)), "{raw_id:?} gave {err:?}");
        }
    }

    #[tokio::test]
    async fn get_record_zone_without_objs_is_not_found() {
        let body = r#"{"response":{"recs":{"has_more":false,"count":0}},"result":"success","msg":null}"#;
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body))]);

        let err = provider(transport).get_record().await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_factory_creation() {
        let factory = CloudflareFactory::new(ScriptedTransport::new(vec![]));
        let provider = factory.create(&config()).unwrap();
        assert_eq!(provider.provider_name(), "cloudflare");
    }

    #[test]
    fn test_factory_missing_token() {
        let factory = CloudflareFactory::new(ScriptedTransport::new(vec![]));
        let config = ProviderConfig::cloudflare("admin@example.com", "", "example.com", "x");
        assert!(factory.create(&config).is_err());
    }

    #[test]
    fn test_register() {
        let registry = dyndns_core::ProviderRegistry::new();
        register(&registry, ScriptedTransport::new(vec![]));
        assert!(registry.has_provider("cloudflare"));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let provider = provider(ScriptedTransport::new(vec![]));

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("CloudflareProvider"));
    }
}
