use crate::constants::MIN_REDEMPTION_THRESHOLD;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub invest: InvestConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// What to redeem and what to buy with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestConfig {
    /// Default amount to redeem and invest; used by the purchase stage when no
    /// carried amount has been persisted yet.
    #[serde(default = "default_investment_amount")]
    pub investment_amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Market card to open on the purchase page (e.g. "ETH-USDT").
    #[serde(default = "default_product_pair")]
    pub product_pair: String,
    /// Product side tab (e.g. "Buy Low").
    #[serde(default = "default_product_side")]
    pub product_side: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_carried_amount_path")]
    pub carried_amount_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Park the browser window off-screen instead of running headless.
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub user_data_dir: Option<String>,
    #[serde(default = "default_purchase_url")]
    pub purchase_url: String,
    #[serde(default = "default_redemption_url")]
    pub redemption_url: String,
    /// Lookup attempts per target before reporting it as not found.
    #[serde(default = "default_locate_attempts")]
    pub locate_attempts: u32,
    #[serde(default = "default_locate_backoff_ms")]
    pub locate_backoff_ms: u64,
    /// Pause after each interaction so the page can settle.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_investment_amount() -> Decimal {
    Decimal::from(20)
}

fn default_currency() -> String {
    "USDT".to_string()
}

fn default_product_pair() -> String {
    "ETH-USDT".to_string()
}

fn default_product_side() -> String {
    "Buy Low".to_string()
}

const fn default_interval_minutes() -> u64 {
    30
}

fn default_carried_amount_path() -> String {
    "data/.actual_investment_amount".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_purchase_url() -> String {
    "https://www.bybit.com/en/earn/dual-asset-mining/".to_string()
}

fn default_redemption_url() -> String {
    "https://www.bybit.com/user/assets/home/financial?protype=4".to_string()
}

const fn default_locate_attempts() -> u32 {
    3
}

const fn default_locate_backoff_ms() -> u64 {
    1000
}

const fn default_settle_ms() -> u64 {
    200
}

impl Default for InvestConfig {
    fn default() -> Self {
        Self {
            investment_amount: default_investment_amount(),
            currency: default_currency(),
            product_pair: default_product_pair(),
            product_side: default_product_side(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            carried_amount_path: default_carried_amount_path(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            api_url: default_telegram_api_url(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            background: false,
            user_data_dir: None,
            purchase_url: default_purchase_url(),
            redemption_url: default_redemption_url(),
            locate_attempts: default_locate_attempts(),
            locate_backoff_ms: default_locate_backoff_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl AppConfig {
    /// Checks values that the deserializer cannot.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_minutes == 0 {
            anyhow::bail!("schedule.interval_minutes must be a positive number of minutes");
        }

        let minimum = Decimal::from(MIN_REDEMPTION_THRESHOLD);
        if self.invest.investment_amount < minimum {
            anyhow::bail!(
                "invest.investment_amount ({}) is below the platform minimum of {}",
                self.invest.investment_amount,
                minimum
            );
        }

        if self.invest.currency.trim().is_empty() {
            anyhow::bail!("invest.currency must not be empty");
        }

        if self.telegram.enabled
            && (self.telegram.bot_token.is_empty() || self.telegram.chat_id.is_empty())
        {
            anyhow::bail!("telegram is enabled but bot_token or chat_id is missing");
        }

        if self.browser.locate_attempts == 0 {
            anyhow::bail!("browser.locate_attempts must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.invest.investment_amount, dec!(20));
        assert_eq!(config.invest.currency, "USDT");
        assert_eq!(config.schedule.interval_minutes, 30);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = AppConfig::default();
        config.schedule.interval_minutes = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn amount_below_minimum_is_rejected() {
        let mut config = AppConfig::default();
        config.invest.investment_amount = dec!(19.99);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("below the platform minimum"));
    }

    #[test]
    fn enabled_telegram_needs_credentials() {
        let mut config = AppConfig::default();
        config.telegram.enabled = true;
        assert!(config.validate().is_err());

        config.telegram.bot_token = "123:abc".to_string();
        config.telegram.chat_id = "42".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"invest": {"investment_amount": "50"}}"#).unwrap();

        assert_eq!(config.invest.investment_amount, dec!(50));
        assert_eq!(config.invest.product_pair, "ETH-USDT");
        assert_eq!(config.browser.locate_attempts, 3);
    }
}
