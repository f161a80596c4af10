use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;

/// Photos per listing page on the gallery.
pub const PAGE_SIZE: u32 = 15;
const PAGINATION_PARAM: &str = "b_start:int";

/// Why a page yielded no content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not authorized")]
    Unauthorized,
    #[error("page not found")]
    NotFound,
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
            StatusCode::NOT_FOUND => FetchError::NotFound,
            StatusCode::SERVICE_UNAVAILABLE => FetchError::ServiceUnavailable,
            other => FetchError::Status(other.as_u16()),
        }
    }
}

/// One listing page to request. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub start_date: Option<String>,
}

impl PageRequest {
    pub fn new(page: u32, start_date: Option<&str>) -> Self {
        Self {
            page: page.max(1),
            start_date: start_date.map(str::to_string),
        }
    }

    pub fn offset(&self) -> u32 {
        PAGE_SIZE * (self.page - 1)
    }

    /// Publication-date filter, empty when no start date is set.
    pub fn date_range_clause(&self) -> String {
        match &self.start_date {
            Some(date) => format!(
                "getDataPublicacao:date:list={}+23:59:59&getDataPublicacao_usage=range:max",
                date
            ),
            None => String::new(),
        }
    }

    pub fn url(&self, gallery_url: &str) -> String {
        format!(
            "{}?{}&{}={}",
            gallery_url,
            self.date_range_clause(),
            PAGINATION_PARAM,
            self.offset()
        )
    }
}

/// Blocking HTTP client for listing and detail pages. One attempt per call.
pub struct Fetcher {
    client: Client,
    settings: Settings,
}

impl Fetcher {
    pub fn new(settings: Settings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fetch one listing page.
    pub fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        debug!(
            page = request.page,
            start_date = request.start_date.as_deref().unwrap_or("-"),
            "fetching listing page"
        );
        self.fetch_url(&request.url(&self.settings.gallery_url))
    }

    /// Fetch any page by URL, returning its body text.
    pub fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        debug!("Accessing {}", url);
        let result = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))
            .and_then(|resp| -> Result<String, FetchError> {
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::from_status(status));
                }
                let content_type = resp
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = resp
                    .bytes()
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                Ok(decode_body(&bytes, content_type.as_deref()))
            });

        match &result {
            Ok(body) => debug!(bytes = body.len(), "Success"),
            Err(e) => warn!("{}: {}", url, e),
        }
        result
    }
}

/// Decode a response body without losing bytes.
///
/// A charset declared in `Content-Type` wins. Otherwise the body is taken as
/// UTF-8 when it is valid UTF-8 and as ISO-8859-1 when it is not.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(|ct| {
            ct.split(';')
                .skip(1)
                .filter_map(|param| param.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        })
        .and_then(|(_, label)| Encoding::for_label(label.trim().trim_matches('"').as_bytes()));

    let encoding = match declared {
        Some(enc) => enc,
        None if std::str::from_utf8(bytes).is_ok() => UTF_8,
        // WHATWG maps the ISO-8859-1 label here; every byte decodes
        None => WINDOWS_1252,
    };
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(encoding = used.name(), "body had undecodable bytes");
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> Settings {
        Settings::with_gallery_url(format!("{}/imagens/lista", server.uri()))
    }

    // The blocking client owns a runtime of its own, so build and drop it
    // off the async test runtime.
    async fn fetch_blocking(
        settings: Settings,
        request: PageRequest,
    ) -> Result<String, FetchError> {
        tokio::task::spawn_blocking(move || -> Result<String, FetchError> {
            Fetcher::new(settings)?.fetch(&request)
        })
        .await
        .unwrap()
    }

    async fn mount_status(server: &MockServer, status: u16) {
        Mock::given(method("GET"))
            .and(path("/imagens/lista"))
            .respond_with(ResponseTemplate::new(status).set_body_string("erro"))
            .mount(server)
            .await;
    }

    #[test]
    fn offsets_follow_page_size() {
        for page in 1..=20u32 {
            assert_eq!(PageRequest::new(page, None).offset(), 15 * (page - 1));
        }
    }

    #[test]
    fn page_zero_is_clamped_to_first_page() {
        assert_eq!(PageRequest::new(0, None).offset(), 0);
    }

    #[test]
    fn url_without_date() {
        let url = PageRequest::new(3, None).url("http://host/lista");
        assert_eq!(url, "http://host/lista?&b_start:int=30");
    }

    #[test]
    fn url_with_date() {
        let url = PageRequest::new(1, Some("2009/01/01")).url("http://host/lista");
        assert_eq!(
            url,
            "http://host/lista?getDataPublicacao:date:list=2009/01/01+23:59:59\
             &getDataPublicacao_usage=range:max&b_start:int=0"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn returns_document_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/imagens/lista"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let body = fetch_blocking(settings_for(&server), PageRequest::new(1, None))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_document_is_not_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let body = fetch_blocking(settings_for(&server), PageRequest::new(1, None)).await;
        assert_eq!(body.unwrap(), "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn classifies_http_failures() {
        for (status, expected) in [
            (401u16, "not authorized"),
            (404, "page not found"),
            (503, "service unavailable"),
            (500, "unexpected HTTP status 500"),
        ] {
            let server = MockServer::start().await;
            mount_status(&server, status).await;

            let err = fetch_blocking(settings_for(&server), PageRequest::new(2, None))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_variants_are_distinct() {
        let server = MockServer::start().await;
        mount_status(&server, 401).await;
        let err = fetch_blocking(settings_for(&server), PageRequest::new(1, None)).await;
        assert!(matches!(err, Err(FetchError::Unauthorized)));

        let server = MockServer::start().await;
        mount_status(&server, 404).await;
        let err = fetch_blocking(settings_for(&server), PageRequest::new(1, None)).await;
        assert!(matches!(err, Err(FetchError::NotFound)));

        let server = MockServer::start().await;
        mount_status(&server, 503).await;
        let err = fetch_blocking(settings_for(&server), PageRequest::new(1, None)).await;
        assert!(matches!(err, Err(FetchError::ServiceUnavailable)));
    }

    #[test]
    fn decodes_utf8_without_charset() {
        assert_eq!(decode_body("São Paulo".as_bytes(), Some("text/html")), "São Paulo");
        assert_eq!(decode_body(b"", None), "");
    }

    #[test]
    fn latin1_bytes_without_charset_are_not_replaced() {
        let text = decode_body(b"<p>S\xe3o Paulo \xe9 \xe7</p>", Some("text/html"));
        assert_eq!(text, "<p>São Paulo é ç</p>");
        assert!(!text.contains('\u{FFFD}'));
    }

    #[test]
    fn declared_charset_wins() {
        let ct = Some("text/html; charset=\"ISO-8859-1\"");
        assert_eq!(decode_body(b"Bras\xedlia", ct), "Brasília");
        let ct = Some("text/html;charset=utf-8");
        assert_eq!(decode_body("Brasília".as_bytes(), ct), "Brasília");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn latin1_page_keeps_accents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/imagens/lista"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"<p>S\xe3o Paulo</p>".to_vec(), "text/html"),
            )
            .mount(&server)
            .await;

        let body = fetch_blocking(settings_for(&server), PageRequest::new(1, None))
            .await
            .unwrap();
        assert_eq!(body, "<p>São Paulo</p>");
        assert!(!body.contains('\u{FFFD}'));
    }

    #[test]
    fn connection_refused_is_transport_error() {
        // Nothing listens on port 1.
        let fetcher = Fetcher::new(Settings::with_gallery_url("http://127.0.0.1:1/lista")).unwrap();
        let err = fetcher.fetch(&PageRequest::new(1, None)).unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(err.to_string().starts_with("transport error"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sequential_pages_carry_date_and_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/imagens/lista"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(2)
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        tokio::task::spawn_blocking(move || {
            let fetcher = Fetcher::new(settings).unwrap();
            for page in 1..=2 {
                fetcher
                    .fetch(&PageRequest::new(page, Some("2009/01/01")))
                    .unwrap();
            }
        })
        .await
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        let queries: Vec<String> = requests
            .iter()
            .map(|r| r.url.query().unwrap_or_default().to_string())
            .collect();
        assert_eq!(queries.len(), 2);
        for (query, offset) in queries.iter().zip(["0", "15"]) {
            assert!(query.contains("getDataPublicacao:date:list=2009/01/01+23:59:59"));
            assert!(query.contains("getDataPublicacao_usage=range:max"));
            assert!(query.ends_with(&format!("b_start:int={}", offset)));
        }
    }
}
