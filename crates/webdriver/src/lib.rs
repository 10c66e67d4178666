//! Browser automation through a W3C WebDriver server (e.g. chromedriver).
//!
//! [`WebDriverBridge`] implements the core UI bridge on top of a thin
//! [`WebDriverClient`]. Semantic targets are resolved through the
//! [`locators`] table, trying each lookup strategy in order.

pub mod bridge;
pub mod client;
pub mod locators;
pub mod protocol;

pub use bridge::{WebDriverBridge, WebDriverElement};
pub use client::WebDriverClient;
pub use locators::{locators_for, Locator, Strategy};
