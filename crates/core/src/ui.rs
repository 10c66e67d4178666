//! Browser capability boundary.
//!
//! Stages talk to the platform UI only through [`UiBridge`] and [`UiElement`].
//! Targets are semantic: the bridge decides how a [`UiTarget`] is found and is
//! responsible for retrying transient lookup failures, including matches that
//! are present but not shown yet. An empty lookup result
//! means "not found"; callers decide what that means for their flow.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Semantic UI targets the stages ask the bridge to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiTarget {
    // Purchase page navigation
    MarketPairCard,
    SideTab,

    // Product table (row-scoped targets are looked up inside a `ProductRow`)
    ProductRow,
    VipTag,
    BuyButton,
    StrikePrice,
    PriceOffset,
    SettlementDate,
    Duration,
    Apr,

    // Order dialog
    OrderDialog,
    PriceDriftNotice,
    DialogClose,
    AmountInput,
    AgreementCheckbox,
    OrderButton,
    ConfirmButton,
    ResultSurface,

    // Redemption page
    FundingRow,
    RedeemButton,
    RedeemDialog,
    RedeemAmountInput,
    RedeemConfirmButton,
    RedeemSuccessNotice,
    NoticeClose,
}

/// Failures reported by a bridge after its own retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiError {
    #[error("element is no longer attached to the page")]
    StaleElement,

    #[error("ui transport error: {0}")]
    Transport(String),

    /// The browser session itself is unusable; nothing further can be done in
    /// this run.
    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl UiError {
    #[must_use]
    pub const fn is_session_lost(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }
}

#[async_trait]
pub trait UiElement: Send + Sync + Sized {
    async fn click(&self) -> Result<(), UiError>;

    /// Replaces the element's current input value with `text`.
    async fn fill(&self, text: &str) -> Result<(), UiError>;

    /// Current input value (empty for non-input elements).
    async fn value(&self) -> Result<String, UiError>;

    async fn is_checked(&self) -> Result<bool, UiError>;
    async fn is_visible(&self) -> Result<bool, UiError>;
    async fn is_enabled(&self) -> Result<bool, UiError>;
    async fn text_content(&self) -> Result<String, UiError>;

    /// Resolves a target inside this element.
    async fn locate(&self, target: UiTarget) -> Result<Vec<Self>, UiError>;
}

#[async_trait]
pub trait UiBridge: Send + Sync {
    type Element: UiElement;

    async fn navigate(&self, url: &str) -> Result<(), UiError>;

    /// Resolves a target anywhere on the current page.
    async fn locate(&self, target: UiTarget) -> Result<Vec<Self::Element>, UiError>;

    /// First visible match of `target` on the page.
    ///
    /// The default makes a single pass. Bridges that retry lookups should
    /// also retry here, since a match can be present but not yet shown.
    async fn locate_visible(&self, target: UiTarget) -> Result<Option<Self::Element>, UiError> {
        let elements = self.locate(target).await?;
        first_visible(elements).await
    }

    /// Full rendered page text, used as a last-resort signal search.
    async fn page_text(&self) -> Result<String, UiError>;

    /// Dismisses the topmost overlay (Escape key).
    async fn dismiss(&self) -> Result<(), UiError>;

    async fn wait(&self, duration: Duration);
}

/// Returns the first visible element of `elements`.
///
/// # Errors
/// Propagates bridge errors from the visibility checks.
pub async fn first_visible<E: UiElement>(elements: Vec<E>) -> Result<Option<E>, UiError> {
    for element in elements {
        if element.is_visible().await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// Locates `target` page-wide and returns the first visible match, with the
/// bridge's retry policy.
///
/// # Errors
/// Propagates bridge errors.
pub async fn locate_visible<B: UiBridge + ?Sized>(
    bridge: &B,
    target: UiTarget,
) -> Result<Option<B::Element>, UiError> {
    bridge.locate_visible(target).await
}

/// Locates `target` inside `scope` and returns the first visible match.
///
/// # Errors
/// Propagates bridge errors.
pub async fn locate_visible_in<E: UiElement>(
    scope: &E,
    target: UiTarget,
) -> Result<Option<E>, UiError> {
    let elements = scope.locate(target).await?;
    first_visible(elements).await
}

/// Text of the first match of `target` inside `scope`, trimmed; `None` when
/// the target is absent.
///
/// # Errors
/// Propagates bridge errors.
pub async fn text_in<E: UiElement>(scope: &E, target: UiTarget) -> Result<Option<String>, UiError> {
    match scope.locate(target).await?.into_iter().next() {
        Some(element) => Ok(Some(element.text_content().await?.trim().to_string())),
        None => Ok(None),
    }
}
