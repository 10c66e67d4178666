use crate::client::WebDriverClient;
use crate::locators::locators_for;
use crate::protocol::{WebDriverError, ESCAPE_KEY};
use async_trait::async_trait;
use dual_invest_core::{BrowserConfig, UiBridge, UiElement, UiError, UiTarget};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// [`UiBridge`] backed by a live WebDriver session.
///
/// Page-wide lookups retry with a fixed backoff before reporting an empty
/// result; visible lookups also retry matches that are hidden or went stale.
/// Lookups scoped to an element run once, so probing a row for an
/// optional child (a VIP tag, a redeem button) does not stall the stage.
pub struct WebDriverBridge {
    client: Arc<WebDriverClient>,
    attempts: u32,
    backoff: Duration,
    settle: Duration,
}

impl WebDriverBridge {
    /// Starts a browser session on the configured driver.
    ///
    /// # Errors
    /// Returns an error if the session cannot be created.
    pub async fn connect(config: &BrowserConfig) -> Result<Self, WebDriverError> {
        let client = WebDriverClient::start(config).await?;
        Ok(Self {
            client: Arc::new(client),
            attempts: config.locate_attempts.max(1),
            backoff: Duration::from_millis(config.locate_backoff_ms),
            settle: Duration::from_millis(config.settle_ms),
        })
    }

    /// Closes the browser. Errors are logged, the session is gone either way.
    pub async fn close(&self) {
        if let Err(e) = self.client.quit().await {
            warn!(error = %e, "Failed to close browser session");
        }
    }

    fn element(&self, id: String) -> WebDriverElement {
        WebDriverElement {
            client: Arc::clone(&self.client),
            id,
            settle: self.settle,
        }
    }

    /// First displayed element among `ids`. A match that went stale between
    /// the lookup and the check counts as not displayed.
    async fn first_displayed(&self, ids: Vec<String>) -> Result<Option<String>, UiError> {
        for id in ids {
            match self.client.is_displayed(&id).await.map_err(UiError::from) {
                Ok(true) => return Ok(Some(id)),
                Ok(false) | Err(UiError::StaleElement) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// One pass over the target's strategies; first non-empty match wins.
    async fn locate_once(&self, target: UiTarget) -> Result<Vec<String>, UiError> {
        for locator in locators_for(target) {
            match self.client.find_elements(locator).await {
                Ok(ids) if !ids.is_empty() => return Ok(ids),
                Ok(_) => {}
                Err(e) if e.code() == Some("invalid selector") => {
                    warn!(?target, selector = locator.value, "Invalid selector skipped");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl UiBridge for WebDriverBridge {
    type Element = WebDriverElement;

    async fn navigate(&self, url: &str) -> Result<(), UiError> {
        debug!(%url, "Navigating");
        self.client.navigate(url).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn locate(&self, target: UiTarget) -> Result<Vec<WebDriverElement>, UiError> {
        for attempt in 1..=self.attempts {
            let ids = self.locate_once(target).await?;
            if !ids.is_empty() {
                return Ok(ids.into_iter().map(|id| self.element(id)).collect());
            }
            if attempt < self.attempts {
                debug!(?target, attempt, "Target not present yet, retrying");
                tokio::time::sleep(self.backoff).await;
            }
        }
        debug!(?target, attempts = self.attempts, "Target not found");
        Ok(Vec::new())
    }

    async fn locate_visible(&self, target: UiTarget) -> Result<Option<WebDriverElement>, UiError> {
        for attempt in 1..=self.attempts {
            let ids = self.locate_once(target).await?;
            if let Some(id) = self.first_displayed(ids).await? {
                return Ok(Some(self.element(id)));
            }
            if attempt < self.attempts {
                debug!(?target, attempt, "Target not visible yet, retrying");
                tokio::time::sleep(self.backoff).await;
            }
        }
        debug!(?target, attempts = self.attempts, "Target not visible");
        Ok(None)
    }

    async fn page_text(&self) -> Result<String, UiError> {
        Ok(self.client.page_text().await?)
    }

    async fn dismiss(&self) -> Result<(), UiError> {
        self.client.press_key(ESCAPE_KEY).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Element handle within the bridge's session.
pub struct WebDriverElement {
    client: Arc<WebDriverClient>,
    id: String,
    settle: Duration,
}

impl WebDriverElement {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl UiElement for WebDriverElement {
    async fn click(&self) -> Result<(), UiError> {
        self.client.click(&self.id).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<(), UiError> {
        self.client.replace_value(&self.id, text).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn value(&self) -> Result<String, UiError> {
        Ok(self.client.value(&self.id).await?)
    }

    async fn is_checked(&self) -> Result<bool, UiError> {
        Ok(self.client.is_checked(&self.id).await?)
    }

    async fn is_visible(&self) -> Result<bool, UiError> {
        Ok(self.client.is_displayed(&self.id).await?)
    }

    async fn is_enabled(&self) -> Result<bool, UiError> {
        Ok(self.client.is_enabled(&self.id).await?)
    }

    async fn text_content(&self) -> Result<String, UiError> {
        Ok(self.client.text(&self.id).await?)
    }

    async fn locate(&self, target: UiTarget) -> Result<Vec<Self>, UiError> {
        for locator in locators_for(target) {
            match self.client.find_elements_from(&self.id, locator).await {
                Ok(ids) if !ids.is_empty() => {
                    return Ok(ids
                        .into_iter()
                        .map(|id| Self {
                            client: Arc::clone(&self.client),
                            id,
                            settle: self.settle,
                        })
                        .collect());
                }
                Ok(_) => {}
                Err(e) if e.code() == Some("invalid selector") => {
                    warn!(?target, selector = locator.value, "Invalid selector skipped");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Vec::new())
    }
}
