//! Iris HTTP client.
//!
//! Low-level reqwest client for the EduVulcan Iris REST API: account
//! discovery, envelope decoding, pagination and mapping of HTTP failures
//! onto [`ApiErrorKind`].

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use eduvulcan_core::{DateWindow, Feed};

use crate::api::{BoxFuture, IrisApi};
use crate::credential::ValidatedCredential;
use crate::error::{ApiError, ApiErrorKind, ApiResult};
use crate::records::{Account, AccountRecord, EnvelopeResponse, RawRecord};

/// Default Iris host.
pub const DEFAULT_BASE_URL: &str = "https://lekcjaplus.vulcan.net.pl";

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Header carrying the tenant symbol on every request.
const TENANT_HEADER: &str = "X-Tenant";

const REGISTER_ENDPOINT: &str = "mobile/register/hebe";

/// `lastId` of the first page.
const FIRST_LAST_ID: i64 = i32::MIN as i64;

/// Iris only returns records modified after this moment; the epoch asks for all.
const LAST_SYNC_DATE: &str = "1970-01-01 01:00:00";

/// Maximum number of response body characters kept in error messages.
const BODY_SNIPPET_LEN: usize = 200;

/// Configuration for [`IrisClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host of the Iris API; the tenant is appended to it.
    pub base_url: String,
    /// Timeout of a single HTTP request.
    pub timeout: Duration,
    /// Records requested per page.
    pub page_size: usize,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: format!("eduvulcan/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Builder method to set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder method to set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Iris API client bound to one validated credential.
#[derive(Debug)]
pub struct IrisClient {
    http: reqwest::Client,
    config: ClientConfig,
    credential: ValidatedCredential,
    account: OnceCell<Account>,
}

impl IrisClient {
    /// Creates a new client. No request is made until the first fetch.
    ///
    /// # Errors
    ///
    /// Returns a permanent error if the HTTP client cannot be built.
    pub fn new(credential: ValidatedCredential, config: ClientConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ApiError::permanent(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            http,
            config,
            credential,
            account: OnceCell::new(),
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// REST root derived from the tenant.
    fn default_root(&self) -> String {
        format!(
            "{}/{}/api",
            self.config.base_url.trim_end_matches('/'),
            self.credential.tenant()
        )
    }

    /// Returns the pupil account, resolving it on first use.
    pub async fn pupil_account(&self) -> ApiResult<&Account> {
        self.account
            .get_or_try_init(|| self.resolve_account())
            .await
    }

    async fn resolve_account(&self) -> ApiResult<Account> {
        let url = endpoint_url(&self.default_root(), REGISTER_ENDPOINT)?;
        let items = self
            .get_envelope(url, &[("mode", "2".to_string())])
            .await?;

        let count = items.len();
        let record = items
            .into_iter()
            .find_map(|item| match serde_json::from_value::<AccountRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable account entry");
                    None
                }
            })
            .ok_or_else(|| ApiError::permanent("no pupil account returned for this token"))?;

        let account = Account::from(record);
        info!(
            pupil_id = account.pupil_id,
            unit = account.unit_short.as_deref().unwrap_or("-"),
            accounts = count,
            "resolved Iris account"
        );
        Ok(account)
    }

    /// Fetches every record of `feed` within `window`.
    ///
    /// Pages are requested while the previous page came back full, each
    /// one starting after the largest id seen so far.
    pub async fn fetch_feed(&self, feed: Feed, window: &DateWindow) -> ApiResult<Vec<RawRecord>> {
        let account = self.pupil_account().await.map_err(|e| e.with_feed(feed))?;
        let root = account
            .rest_url
            .clone()
            .unwrap_or_else(|| self.default_root());
        let url = endpoint_url(&root, feed_endpoint(feed)).map_err(|e| e.with_feed(feed))?;
        let page_size = self.config.page_size.max(1);

        let mut records = Vec::new();
        let mut last_id = FIRST_LAST_ID;
        let mut dropped = 0usize;
        let mut pages = 0usize;

        loop {
            let query = [
                ("pupilId", account.pupil_id.to_string()),
                ("dateFrom", window.from.format("%Y-%m-%d").to_string()),
                ("dateTo", window.to.format("%Y-%m-%d").to_string()),
                ("lastId", last_id.to_string()),
                ("pageSize", page_size.to_string()),
                ("lastSyncDate", LAST_SYNC_DATE.to_string()),
            ];
            let items = self
                .get_envelope(url.clone(), &query)
                .await
                .map_err(|e| e.with_feed(feed))?;
            pages += 1;

            let full_page = items.len() >= page_size;
            let mut max_id = last_id;
            for item in items {
                if let Some(id) = item_id(&item) {
                    max_id = max_id.max(id);
                }
                match RawRecord::decode(feed, item) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        dropped += 1;
                        warn!(feed = %feed, error = %e, "dropping undecodable record");
                    }
                }
            }

            if !full_page {
                break;
            }
            if max_id <= last_id {
                warn!(feed = %feed, last_id, "full page without newer ids, stopping pagination");
                break;
            }
            last_id = max_id;
        }

        debug!(
            feed = %feed,
            records = records.len(),
            dropped,
            pages,
            "fetched feed"
        );
        Ok(records)
    }

    /// Performs an authenticated GET and unwraps the Iris envelope.
    async fn get_envelope(&self, url: Url, query: &[(&str, String)]) -> ApiResult<Vec<Value>> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.credential.jwt())
            .header(TENANT_HEADER, self.credential.tenant())
            .query(query)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if let Some(kind) = classify_status(status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::new(
                kind,
                format!("HTTP {}: {}", status, snippet(&body)),
            ));
        }

        let body = response.text().await.map_err(|e| {
            ApiError::transient(format!("failed to read response: {}", e)).with_source(e)
        })?;

        let envelope: EnvelopeResponse<Vec<Value>> = serde_json::from_str(&body).map_err(|e| {
            ApiError::permanent(format!("failed to parse envelope: {}", e)).with_source(e)
        })?;

        match (envelope.status, envelope.envelope) {
            (Some(status), _) if status.code != 0 => Err(ApiError::permanent(format!(
                "Iris status {}: {}",
                status.code,
                status.message.unwrap_or_default()
            ))),
            (None, None) => Err(ApiError::permanent("response is not an Iris envelope")),
            (_, items) => Ok(items.unwrap_or_default()),
        }
    }
}

impl IrisApi for IrisClient {
    fn fetch<'a>(
        &'a self,
        feed: Feed,
        window: &'a DateWindow,
    ) -> BoxFuture<'a, ApiResult<Vec<RawRecord>>> {
        Box::pin(self.fetch_feed(feed, window))
    }

    fn account(&self) -> BoxFuture<'_, ApiResult<Option<Account>>> {
        Box::pin(async move { self.pupil_account().await.map(|a| Some(a.clone())) })
    }
}

fn feed_endpoint(feed: Feed) -> &'static str {
    match feed {
        Feed::Lessons => "mobile/schedule/withchanges/byPupil",
        Feed::Homework => "mobile/homework/byPupil",
        Feed::Exams => "mobile/exam/byPupil",
    }
}

fn endpoint_url(root: &str, endpoint: &str) -> ApiResult<Url> {
    let raw = format!("{}/{}", root.trim_end_matches('/'), endpoint);
    Url::parse(&raw)
        .map_err(|e| ApiError::permanent(format!("invalid URL {}: {}", raw, e)).with_source(e))
}

fn item_id(item: &Value) -> Option<i64> {
    match item.get("Id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Maps a non-success HTTP status to an error kind.
pub(crate) fn classify_status(status: StatusCode) -> Option<ApiErrorKind> {
    if status.is_success() {
        None
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Some(ApiErrorKind::Unauthorized)
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Some(ApiErrorKind::Transient)
    } else {
        Some(ApiErrorKind::Permanent)
    }
}

fn map_send_error(e: reqwest::Error) -> ApiError {
    let err = if e.is_timeout() {
        ApiError::transient("request timeout")
    } else if e.is_connect() {
        ApiError::transient(format!("connection failed: {}", e))
    } else if e.is_builder() {
        ApiError::permanent(format!("invalid request: {}", e))
    } else {
        ApiError::transient(format!("request failed: {}", e))
    };
    err.with_source(e)
}

fn snippet(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= BODY_SNIPPET_LEN {
        body.to_string()
    } else {
        let cut: String = body.chars().take(BODY_SNIPPET_LEN).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CredentialBundle, validate};
    use chrono::NaiveDate;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const ACCOUNT_BODY: &str = r#"{
        "Status": { "Code": 0, "Message": "OK" },
        "Envelope": [{
            "Unit": { "Id": 1, "Short": "SP1", "Name": "Szkoła Podstawowa nr 1", "RestURL": null },
            "Pupil": { "Id": 1234, "FirstName": "Jan", "Surname": "Kowalski" }
        }]
    }"#;

    fn credential() -> ValidatedCredential {
        let bundle = CredentialBundle::new("jwt-token", "vulcan").with_payload(json!({
            "name": "Jan Kowalski",
            "uid": "u-1",
            "caps": ["EDUVULCAN_PREMIUM"]
        }));
        validate(&bundle).unwrap()
    }

    fn client_for(server: &Server) -> IrisClient {
        let config = ClientConfig::default().with_base_url(server.url());
        IrisClient::new(credential(), config).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 17).unwrap(),
        )
    }

    fn envelope(items: serde_json::Value) -> String {
        json!({ "Status": { "Code": 0, "Message": "OK" }, "Envelope": items }).to_string()
    }

    async fn mock_account(server: &mut Server) -> mockito::Mock {
        server
            .mock("GET", "/vulcan/api/mobile/register/hebe")
            .match_query(Matcher::UrlEncoded("mode".into(), "2".into()))
            .match_header("authorization", "Bearer jwt-token")
            .match_header("x-tenant", "vulcan")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ACCOUNT_BODY)
            .create_async()
            .await
    }

    #[test]
    fn status_classification() {
        let cases = [
            (200, None),
            (401, Some(ApiErrorKind::Unauthorized)),
            (403, Some(ApiErrorKind::Unauthorized)),
            (429, Some(ApiErrorKind::Transient)),
            (500, Some(ApiErrorKind::Transient)),
            (503, Some(ApiErrorKind::Transient)),
            (400, Some(ApiErrorKind::Permanent)),
            (404, Some(ApiErrorKind::Permanent)),
        ];
        for (code, expected) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(classify_status(status), expected, "status {}", code);
        }
    }

    #[test]
    fn default_root_uses_tenant() {
        let config = ClientConfig::default().with_base_url("https://iris.example/");
        let client = IrisClient::new(credential(), config).unwrap();
        assert_eq!(client.default_root(), "https://iris.example/vulcan/api");
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        assert_eq!(snippet("  short  "), "short");
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), BODY_SNIPPET_LEN + 3);
    }

    #[tokio::test]
    async fn fetch_homework_sends_query_and_drops_bad_items() {
        let mut server = Server::new_async().await;
        let account = mock_account(&mut server).await;
        let homework = server
            .mock("GET", "/vulcan/api/mobile/homework/byPupil")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pupilId".into(), "1234".into()),
                Matcher::UrlEncoded("dateFrom".into(), "2024-03-04".into()),
                Matcher::UrlEncoded("dateTo".into(), "2024-03-17".into()),
                Matcher::UrlEncoded("lastId".into(), "-2147483648".into()),
                Matcher::UrlEncoded("pageSize".into(), "500".into()),
                Matcher::UrlEncoded("lastSyncDate".into(), "1970-01-01 01:00:00".into()),
            ]))
            .match_header("authorization", "Bearer jwt-token")
            .match_header("x-tenant", "vulcan")
            .with_status(200)
            .with_body(envelope(json!([
                { "Id": 42, "Subject": { "Name": "Math" }, "Deadline": "2024-03-10" },
                { "Subject": { "Name": "No id" } }
            ])))
            .create_async()
            .await;

        let client = client_for(&server);
        let records = client.fetch(Feed::Homework, &window()).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id().to_string(), "42");
        assert_eq!(records[0].feed(), Feed::Homework);
        account.assert_async().await;
        homework.assert_async().await;
    }

    #[tokio::test]
    async fn account_is_resolved_once() {
        let mut server = Server::new_async().await;
        let account = server
            .mock("GET", "/vulcan/api/mobile/register/hebe")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(ACCOUNT_BODY)
            .expect(1)
            .create_async()
            .await;
        for path in [
            "/vulcan/api/mobile/schedule/withchanges/byPupil",
            "/vulcan/api/mobile/exam/byPupil",
        ] {
            server
                .mock("GET", path)
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(envelope(json!([])))
                .create_async()
                .await;
        }

        let client = client_for(&server);
        let window = window();
        let (lessons, exams) = tokio::join!(
            client.fetch(Feed::Lessons, &window),
            client.fetch(Feed::Exams, &window)
        );
        assert!(lessons.unwrap().is_empty());
        assert!(exams.unwrap().is_empty());

        let resolved = client.account().await.unwrap().unwrap();
        assert_eq!(resolved.pupil_name, "Jan Kowalski");
        account.assert_async().await;
    }

    #[tokio::test]
    async fn unit_rest_url_overrides_default_root() {
        let mut server = Server::new_async().await;
        let body = json!({
            "Status": { "Code": 0 },
            "Envelope": [{
                "Unit": { "Short": "SP1", "RestURL": format!("{}/vulcan/000001/api", server.url()) },
                "Pupil": { "Id": 77, "FirstName": "Ala", "Surname": "Nowak" }
            }]
        });
        server
            .mock("GET", "/vulcan/api/mobile/register/hebe")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;
        let exams = server
            .mock("GET", "/vulcan/000001/api/mobile/exam/byPupil")
            .match_query(Matcher::UrlEncoded("pupilId".into(), "77".into()))
            .with_status(200)
            .with_body(envelope(json!([{ "Id": 7, "Type": "Sprawdzian", "Deadline": "2024-03-12" }])))
            .create_async()
            .await;

        let client = client_for(&server);
        let records = client.fetch(Feed::Exams, &window()).await.unwrap();
        assert_eq!(records.len(), 1);
        exams.assert_async().await;
    }

    #[tokio::test]
    async fn follows_full_pages() {
        let mut server = Server::new_async().await;
        mock_account(&mut server).await;
        let path = "/vulcan/api/mobile/exam/byPupil";
        let first = server
            .mock("GET", path)
            .match_query(Matcher::UrlEncoded("lastId".into(), "-2147483648".into()))
            .with_status(200)
            .with_body(envelope(json!([
                { "Id": 2, "Deadline": "2024-03-05" },
                { "Id": 1, "Deadline": "2024-03-06" }
            ])))
            .create_async()
            .await;
        let second = server
            .mock("GET", path)
            .match_query(Matcher::UrlEncoded("lastId".into(), "2".into()))
            .with_status(200)
            .with_body(envelope(json!([{ "Id": 3, "Deadline": "2024-03-07" }])))
            .create_async()
            .await;

        let config = ClientConfig::default()
            .with_base_url(server.url())
            .with_page_size(2);
        let client = IrisClient::new(credential(), config).unwrap();
        let records = client.fetch(Feed::Exams, &window()).await.unwrap();

        let ids: Vec<String> = records.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_token_is_unauthorized() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/vulcan/api/mobile/register/hebe")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("token revoked")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.fetch(Feed::Lessons, &window()).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert_eq!(err.feed(), Some(Feed::Lessons));
        assert!(err.message().contains("token revoked"));
    }

    #[tokio::test]
    async fn feed_http_errors_are_classified() {
        let cases = [
            (403, ApiErrorKind::Unauthorized),
            (503, ApiErrorKind::Transient),
            (429, ApiErrorKind::Transient),
            (404, ApiErrorKind::Permanent),
        ];
        for (code, expected) in cases {
            let mut server = Server::new_async().await;
            mock_account(&mut server).await;
            server
                .mock("GET", "/vulcan/api/mobile/homework/byPupil")
                .match_query(Matcher::Any)
                .with_status(code)
                .create_async()
                .await;

            let client = client_for(&server);
            let err = client.fetch(Feed::Homework, &window()).await.unwrap_err();
            assert_eq!(err.kind(), expected, "status {}", code);
            assert_eq!(err.feed(), Some(Feed::Homework));
        }
    }

    #[tokio::test]
    async fn malformed_bodies_are_permanent() {
        let bodies = [
            "not json".to_string(),
            "[1, 2, 3]".to_string(),
            "{}".to_string(),
            json!({ "Status": { "Code": 108, "Message": "Unknown pupil" }, "Envelope": null })
                .to_string(),
        ];
        for body in bodies {
            let mut server = Server::new_async().await;
            mock_account(&mut server).await;
            server
                .mock("GET", "/vulcan/api/mobile/exam/byPupil")
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(body.clone())
                .create_async()
                .await;

            let client = client_for(&server);
            let err = client.fetch(Feed::Exams, &window()).await.unwrap_err();
            assert_eq!(err.kind(), ApiErrorKind::Permanent, "body {}", body);
        }
    }

    #[tokio::test]
    async fn empty_account_list_is_permanent() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/vulcan/api/mobile/register/hebe")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(envelope(json!([])))
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.account().await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Permanent);
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ClientConfig::default()
            .with_base_url(format!("http://127.0.0.1:{}", port))
            .with_timeout(Duration::from_secs(5));
        let client = IrisClient::new(credential(), config).unwrap();

        let err = client.fetch(Feed::Lessons, &window()).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Transient);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn request_timeout_is_transient() {
        // Connections queue in the backlog and never get an answer
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ClientConfig::default()
            .with_base_url(format!("http://127.0.0.1:{}", port))
            .with_timeout(Duration::from_millis(200));
        let client = IrisClient::new(credential(), config).unwrap();

        let err = client.fetch(Feed::Homework, &window()).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Transient);
        assert!(err.message().contains("timeout"), "{}", err);
        drop(listener);
    }
}
