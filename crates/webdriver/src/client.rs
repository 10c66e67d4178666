//! Minimal W3C WebDriver client over HTTP.

use crate::locators::Locator;
use crate::protocol::{
    self, ElementRef, NewSession, Reply, WebDriverError, WireError, CHECKED_SCRIPT,
    PAGE_TEXT_SCRIPT, SELECT_ALL_DELETE,
};
use dual_invest_core::BrowserConfig;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for a single driver command. Page loads are the slow case.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// One browser session on a WebDriver server.
pub struct WebDriverClient {
    http: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverClient {
    /// Opens a new browser session.
    ///
    /// # Errors
    /// Returns an error if the driver is unreachable or refuses the session.
    pub async fn start(config: &BrowserConfig) -> Result<Self, WebDriverError> {
        let http = Client::builder().timeout(COMMAND_TIMEOUT).build()?;
        let base_url = config.webdriver_url.trim_end_matches('/').to_string();

        let response = http
            .post(format!("{base_url}/session"))
            .json(&protocol::capabilities(config))
            .send()
            .await?;
        let session: NewSession = decode(response).await?;

        info!(
            session_id = %session.session_id,
            driver = %base_url,
            background = config.background,
            "Browser session started"
        );

        Ok(Self {
            http,
            base_url,
            session_id: session.session_id,
        })
    }

    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, WebDriverError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        debug!(%method, %path, "WebDriver command");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        decode(request.send().await?).await
    }

    async fn post_unit(&self, path: &str, body: Value) -> Result<(), WebDriverError> {
        let _: Value = self.command(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        self.post_unit("/url", json!({ "url": url })).await
    }

    /// All elements matching `locator` on the page. No match is an empty vec.
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<String>, WebDriverError> {
        self.find_at("/elements", locator).await
    }

    /// All elements matching `locator` under element `parent`.
    pub async fn find_elements_from(
        &self,
        parent: &str,
        locator: &Locator,
    ) -> Result<Vec<String>, WebDriverError> {
        self.find_at(&format!("/element/{parent}/elements"), locator)
            .await
    }

    async fn find_at(&self, path: &str, locator: &Locator) -> Result<Vec<String>, WebDriverError> {
        let body = json!({
            "using": locator.strategy.as_str(),
            "value": locator.value,
        });
        let refs: Vec<ElementRef> = self.command(Method::POST, path, Some(body)).await?;
        Ok(refs.into_iter().map(|r| r.id).collect())
    }

    pub async fn click(&self, element: &str) -> Result<(), WebDriverError> {
        self.post_unit(&format!("/element/{element}/click"), json!({}))
            .await
    }

    /// Clears the input and types `text` into it.
    pub async fn replace_value(&self, element: &str, text: &str) -> Result<(), WebDriverError> {
        if let Err(e) = self
            .post_unit(&format!("/element/{element}/clear"), json!({}))
            .await
        {
            // React-controlled inputs sometimes reject clear; keyboard fallback below.
            warn!(error = %e, "Clear command rejected");
        }
        let keys = format!("{SELECT_ALL_DELETE}{text}");
        self.post_unit(&format!("/element/{element}/value"), json!({ "text": keys }))
            .await
    }

    pub async fn value(&self, element: &str) -> Result<String, WebDriverError> {
        let value: Option<String> = self
            .command(
                Method::GET,
                &format!("/element/{element}/property/value"),
                None,
            )
            .await?;
        Ok(value.unwrap_or_default())
    }

    /// Checked state, also for wrappers around a checkbox input.
    pub async fn is_checked(&self, element: &str) -> Result<bool, WebDriverError> {
        let checked: Option<bool> = self
            .execute(CHECKED_SCRIPT, vec![protocol::element_arg(element)])
            .await?;
        Ok(checked.unwrap_or(false))
    }

    pub async fn is_displayed(&self, element: &str) -> Result<bool, WebDriverError> {
        self.command(Method::GET, &format!("/element/{element}/displayed"), None)
            .await
    }

    pub async fn is_enabled(&self, element: &str) -> Result<bool, WebDriverError> {
        self.command(Method::GET, &format!("/element/{element}/enabled"), None)
            .await
    }

    pub async fn text(&self, element: &str) -> Result<String, WebDriverError> {
        self.command(Method::GET, &format!("/element/{element}/text"), None)
            .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<T, WebDriverError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    pub async fn page_text(&self) -> Result<String, WebDriverError> {
        let text: Option<String> = self.execute(PAGE_TEXT_SCRIPT, Vec::new()).await?;
        Ok(text.unwrap_or_default())
    }

    pub async fn press_key(&self, key: &str) -> Result<(), WebDriverError> {
        self.post_unit("/actions", protocol::key_press(key)).await
    }

    /// Ends the session and closes the browser.
    pub async fn quit(&self) -> Result<(), WebDriverError> {
        let _: Value = self.command(Method::DELETE, "", None).await?;
        info!(session_id = %self.session_id, "Browser session closed");
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, WebDriverError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<Reply<WireError>>(&body) {
            Ok(reply) => WebDriverError::Protocol {
                error: reply.value.error,
                message: reply.value.message,
            },
            Err(_) => WebDriverError::Decode(format!("HTTP {}: {body}", status.as_u16())),
        });
    }

    serde_json::from_str::<Reply<T>>(&body)
        .map(|reply| reply.value)
        .map_err(|e| WebDriverError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locators::Strategy;
    use crate::protocol::ELEMENT_KEY;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn started(mock_server: &MockServer) -> WebDriverClient {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": {"sessionId": "abc", "capabilities": {}}
            })))
            .mount(mock_server)
            .await;

        let config = BrowserConfig {
            webdriver_url: mock_server.uri(),
            ..BrowserConfig::default()
        };
        WebDriverClient::start(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_commands_use_new_session_id() {
        let mock_server = MockServer::start().await;
        let client = started(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/url"))
            .and(body_partial_json(serde_json::json!({"url": "https://example.com"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": null})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        client.navigate("https://example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_find_elements_sends_strategy() {
        let mock_server = MockServer::start().await;
        let client = started(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/elements"))
            .and(body_partial_json(serde_json::json!({
                "using": "css selector",
                "value": "tbody tr"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{ELEMENT_KEY: "r1"}, {ELEMENT_KEY: "r2"}]
            })))
            .mount(&mock_server)
            .await;

        let ids = client
            .find_elements(&Locator {
                strategy: Strategy::Css,
                value: "tbody tr",
            })
            .await
            .unwrap();

        assert_eq!(ids, vec!["r1".to_string(), "r2".to_string()]);
    }

    #[tokio::test]
    async fn test_protocol_error_is_decoded() {
        let mock_server = MockServer::start().await;
        let client = started(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/session/abc/element/e1/text"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "value": {
                    "error": "stale element reference",
                    "message": "element is not attached to the page document"
                }
            })))
            .mount(&mock_server)
            .await;

        let err = client.text("e1").await.unwrap_err();

        assert_eq!(err.code(), Some("stale element reference"));
    }

    #[tokio::test]
    async fn test_null_page_text_is_empty() {
        let mock_server = MockServer::start().await;
        let client = started(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/execute/sync"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": null})),
            )
            .mount(&mock_server)
            .await;

        assert_eq!(client.page_text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_checked_state_passes_element_argument() {
        let mock_server = MockServer::start().await;
        let client = started(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/execute/sync"))
            .and(body_partial_json(serde_json::json!({
                "args": [{ELEMENT_KEY: "box"}]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": true})),
            )
            .mount(&mock_server)
            .await;

        assert!(client.is_checked("box").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mock_server = MockServer::start().await;
        let client = started(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/url"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let err = client.navigate("https://example.com").await.unwrap_err();

        assert!(matches!(err, WebDriverError::Decode(ref m) if m.contains("502")));
    }
}
