//! W3C WebDriver wire types and error classification.

use dual_invest_core::{BrowserConfig, UiError};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Key under which the protocol serializes element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4ce13e7a4b4a";

pub const ESCAPE_KEY: &str = "\u{E00C}";

/// Ctrl+A then Backspace, clearing inputs that ignore the clear command.
pub const SELECT_ALL_DELETE: &str = "\u{E009}a\u{E000}\u{E003}";

pub const PAGE_TEXT_SCRIPT: &str = "return document.body ? document.body.innerText : '';";

/// Checked state of a checkbox input or of a wrapper around one.
pub const CHECKED_SCRIPT: &str = "const el = arguments[0]; \
    const input = el.matches('input') ? el : el.querySelector('input[type=checkbox]'); \
    return Boolean((input && input.checked) || el.className.toString().includes('checkbox-wrapper-checked'));";

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("webdriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webdriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    #[error("unexpected webdriver response: {0}")]
    Decode(String),
}

impl WebDriverError {
    /// Protocol error code, if the driver answered with one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Protocol { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<WebDriverError> for UiError {
    fn from(err: WebDriverError) -> Self {
        match &err {
            WebDriverError::Http(e) if e.is_connect() => Self::SessionLost(err.to_string()),
            WebDriverError::Protocol { error, .. } => match error.as_str() {
                "invalid session id" | "session not created" | "no such window" => {
                    Self::SessionLost(err.to_string())
                }
                "stale element reference" => Self::StaleElement,
                _ => Self::Transport(err.to_string()),
            },
            _ => Self::Transport(err.to_string()),
        }
    }
}

/// Every response body wraps its payload in `value`.
#[derive(Debug, Deserialize)]
pub struct Reply<T> {
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub struct WireError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52f-4ce13e7a4b4a")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub session_id: String,
}

/// Chrome capabilities for a new session.
///
/// Background mode parks the window off-screen rather than going headless,
/// since the platform serves a degraded page to headless browsers.
#[must_use]
pub fn capabilities(config: &BrowserConfig) -> Value {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-first-run".to_string(),
        "--disable-default-apps".to_string(),
    ];
    if let Some(dir) = &config.user_data_dir {
        args.push(format!("--user-data-dir={dir}"));
    }
    if config.background {
        args.push("--window-position=-2000,-2000".to_string());
        args.push("--window-size=1280,720".to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": args,
                    "excludeSwitches": ["enable-automation"]
                }
            }
        }
    })
}

/// Script argument referencing an element.
#[must_use]
pub fn element_arg(id: &str) -> Value {
    json!({ ELEMENT_KEY: id })
}

/// Actions payload pressing and releasing a single key.
#[must_use]
pub fn key_press(key: &str) -> Value {
    json!({
        "actions": [{
            "type": "key",
            "id": "keyboard",
            "actions": [
                {"type": "keyDown", "value": key},
                {"type": "keyUp", "value": key}
            ]
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(code: &str) -> WebDriverError {
        WebDriverError::Protocol {
            error: code.to_string(),
            message: "from driver".to_string(),
        }
    }

    #[test]
    fn dead_session_codes_map_to_session_lost() {
        for code in ["invalid session id", "session not created", "no such window"] {
            assert!(UiError::from(protocol(code)).is_session_lost(), "{code}");
        }
    }

    #[test]
    fn stale_and_other_codes() {
        assert_eq!(
            UiError::from(protocol("stale element reference")),
            UiError::StaleElement
        );
        assert!(matches!(
            UiError::from(protocol("element click intercepted")),
            UiError::Transport(_)
        ));
        assert!(matches!(
            UiError::from(WebDriverError::Decode("bad".into())),
            UiError::Transport(_)
        ));
    }

    #[test]
    fn background_mode_parks_window() {
        let config = BrowserConfig {
            background: true,
            user_data_dir: Some("/tmp/profile".to_string()),
            ..BrowserConfig::default()
        };

        let caps = capabilities(&config);
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap();

        assert!(args.contains(&json!("--window-position=-2000,-2000")));
        assert!(args.contains(&json!("--user-data-dir=/tmp/profile")));
        assert!(!args.contains(&json!("--headless")));
    }

    #[test]
    fn element_ref_uses_w3c_key() {
        let parsed: Reply<Vec<ElementRef>> =
            serde_json::from_value(json!({"value": [{ELEMENT_KEY: "e1"}]})).unwrap();
        assert_eq!(parsed.value[0].id, "e1");
    }
}
