//! Scripted in-memory [`UiBridge`] for exercising stages without a browser.
//!
//! A [`FakePage`] describes what the platform would show; the bridge mutates
//! it as elements are clicked and filled, and records counters tests can
//! assert on. Enabled with the `testing` feature.

use crate::constants::ORDER_SUCCESS_MARKER;
use crate::ui::{UiBridge, UiElement, UiError, UiTarget};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A product row on the fake purchase page.
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub price: String,
    pub offset: String,
    pub settlement: String,
    pub duration: String,
    pub apr: String,
    pub vip: bool,
    pub has_buy_button: bool,
}

impl FakeProduct {
    #[must_use]
    pub fn new(price: &str) -> Self {
        Self {
            price: price.to_string(),
            offset: "-1.5%".to_string(),
            settlement: "2025-06-01 16:00".to_string(),
            duration: "1 Day".to_string(),
            apr: "95.3%".to_string(),
            vip: false,
            has_buy_button: true,
        }
    }

    #[must_use]
    pub fn vip(mut self) -> Self {
        self.vip = true;
        self
    }
}

/// A savings position row on the fake redemption page.
#[derive(Debug, Clone)]
pub struct FakeFundingRow {
    pub text: String,
    pub redeemable: bool,
    /// Confirming this row's redemption shows no success notice.
    pub fails: bool,
}

impl FakeFundingRow {
    #[must_use]
    pub fn usdt(amount: &str) -> Self {
        Self {
            text: format!("USDT Flexible {amount} USDT Redeem"),
            redeemable: true,
            fails: false,
        }
    }
}

/// Where the order success marker shows up once an order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOutcome {
    ResultSurface,
    PageOnly,
    Silent,
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub market_pairs: Vec<String>,
    pub side_tabs: Vec<String>,
    pub products: Vec<FakeProduct>,
    /// Number of order dialog openings that show the price drift notice.
    pub drift_notices: u32,
    pub amount_input_present: bool,
    pub checkbox_present: bool,
    /// Checkbox state each time the order dialog opens.
    pub checkbox_preset: bool,
    pub order_button_present: bool,
    pub order_button_enabled: bool,
    pub confirm_step: bool,
    pub outcome: FakeOutcome,
    pub funding_rows: Vec<FakeFundingRow>,
    /// Redeemed rows leave the table, shifting the rows below them up.
    pub drop_redeemed: bool,
    pub session_lost: bool,

    pub visited: Vec<String>,
    pub dialog_row: Option<usize>,
    pub drift_visible: bool,
    pub dialog_opens: u32,
    pub amount_value: String,
    pub checkbox_checked: bool,
    pub confirm_visible: bool,
    pub order_placed: bool,
    pub clicked_pair: Option<String>,
    pub clicked_side: Option<String>,
    pub redeem_dialog_row: Option<usize>,
    pub redeem_amount_value: String,
    pub notice_visible: bool,
    pub redeemed_rows: Vec<usize>,
    pub redeemed_texts: Vec<String>,
    pub dismissals: u32,
    pub clicks: HashMap<UiTarget, u32>,
    pub fills: HashMap<UiTarget, u32>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            market_pairs: vec!["BTC-USDT".to_string(), "ETH-USDT".to_string()],
            side_tabs: vec!["Buy Low".to_string(), "Sell High".to_string()],
            products: Vec::new(),
            drift_notices: 0,
            amount_input_present: true,
            checkbox_present: true,
            checkbox_preset: false,
            order_button_present: true,
            order_button_enabled: true,
            confirm_step: false,
            outcome: FakeOutcome::ResultSurface,
            funding_rows: Vec::new(),
            drop_redeemed: false,
            session_lost: false,
            visited: Vec::new(),
            dialog_row: None,
            drift_visible: false,
            dialog_opens: 0,
            amount_value: String::new(),
            checkbox_checked: false,
            confirm_visible: false,
            order_placed: false,
            clicked_pair: None,
            clicked_side: None,
            redeem_dialog_row: None,
            redeem_amount_value: String::new(),
            notice_visible: false,
            redeemed_rows: Vec::new(),
            redeemed_texts: Vec::new(),
            dismissals: 0,
            clicks: HashMap::new(),
            fills: HashMap::new(),
        }
    }
}

impl FakePage {
    #[must_use]
    pub fn with_products(products: Vec<FakeProduct>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_funding(rows: Vec<FakeFundingRow>) -> Self {
        Self {
            funding_rows: rows,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn clicks(&self, target: UiTarget) -> u32 {
        self.clicks.get(&target).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn fills(&self, target: UiTarget) -> u32 {
        self.fills.get(&target).copied().unwrap_or(0)
    }

    fn dialog_open(&self) -> bool {
        self.dialog_row.is_some()
    }

    fn open_order_dialog(&mut self, row: usize) {
        self.dialog_row = Some(row);
        self.dialog_opens += 1;
        self.drift_visible = self.drift_notices > 0;
        if self.drift_visible {
            self.drift_notices -= 1;
        }
        self.amount_value.clear();
        self.checkbox_checked = self.checkbox_preset;
        self.confirm_visible = false;
        self.order_placed = false;
    }

    fn close_dialogs(&mut self) {
        self.dialog_row = None;
        self.drift_visible = false;
        self.confirm_visible = false;
        self.redeem_dialog_row = None;
        self.notice_visible = false;
    }

    fn is_visible(&self, element: &FakeElement) -> bool {
        match (element.target, element.row) {
            (UiTarget::ProductRow | UiTarget::FundingRow, _)
            | (UiTarget::MarketPairCard | UiTarget::SideTab, _) => true,
            (UiTarget::BuyButton, Some(row)) => self
                .products
                .get(row)
                .is_some_and(|p| p.has_buy_button),
            (UiTarget::OrderDialog, _) => self.dialog_open(),
            (UiTarget::PriceDriftNotice, _) => self.dialog_open() && self.drift_visible,
            (UiTarget::DialogClose, _) => self.dialog_open(),
            (UiTarget::AmountInput, _) => self.dialog_open() && self.amount_input_present,
            (UiTarget::AgreementCheckbox, _) => self.dialog_open() && self.checkbox_present,
            (UiTarget::OrderButton, _) => self.dialog_open() && self.order_button_present,
            (UiTarget::ConfirmButton, _) => self.confirm_visible,
            (UiTarget::ResultSurface, _) => {
                self.order_placed && self.outcome == FakeOutcome::ResultSurface
            }
            (UiTarget::RedeemButton, Some(row)) => self
                .funding_rows
                .get(row)
                .is_some_and(|r| r.redeemable),
            (UiTarget::RedeemDialog | UiTarget::RedeemAmountInput | UiTarget::RedeemConfirmButton, _) => {
                self.redeem_dialog_row.is_some()
            }
            (UiTarget::RedeemSuccessNotice | UiTarget::NoticeClose, _) => self.notice_visible,
            _ => true,
        }
    }

    fn text_of(&self, element: &FakeElement) -> String {
        match (element.target, element.row) {
            (UiTarget::MarketPairCard, Some(i)) => self.market_pairs.get(i).cloned().unwrap_or_default(),
            (UiTarget::SideTab, Some(i)) => self.side_tabs.get(i).cloned().unwrap_or_default(),
            (UiTarget::ProductRow, Some(i)) => self
                .products
                .get(i)
                .map(|p| format!("{}{} {} {} {}", p.price, p.offset, p.duration, p.settlement, p.apr))
                .unwrap_or_default(),
            (UiTarget::StrikePrice, Some(i)) => self
                .products
                .get(i)
                .map(|p| format!("{}{}", p.price, p.offset))
                .unwrap_or_default(),
            (UiTarget::PriceOffset, Some(i)) => {
                self.products.get(i).map(|p| p.offset.clone()).unwrap_or_default()
            }
            (UiTarget::SettlementDate, Some(i)) => {
                self.products.get(i).map(|p| p.settlement.clone()).unwrap_or_default()
            }
            (UiTarget::Duration, Some(i)) => {
                self.products.get(i).map(|p| p.duration.clone()).unwrap_or_default()
            }
            (UiTarget::Apr, Some(i)) => self.products.get(i).map(|p| p.apr.clone()).unwrap_or_default(),
            (UiTarget::VipTag, _) => "VIP".to_string(),
            (UiTarget::PriceDriftNotice, _) => {
                "Price has been updated. Please choose again.".to_string()
            }
            (UiTarget::ResultSurface, _) => ORDER_SUCCESS_MARKER.to_string(),
            (UiTarget::FundingRow, Some(i)) => {
                self.funding_rows.get(i).map(|r| r.text.clone()).unwrap_or_default()
            }
            (UiTarget::RedeemSuccessNotice, _) => "Redemption successful".to_string(),
            _ => String::new(),
        }
    }

    fn page_text(&self) -> String {
        let mut text = String::from("Dual Investment");
        if self.order_placed && self.outcome != FakeOutcome::Silent {
            text.push(' ');
            text.push_str(ORDER_SUCCESS_MARKER);
        }
        text
    }

    fn locate(
        &self,
        target: UiTarget,
        scope: Option<&FakeElement>,
    ) -> Vec<(UiTarget, Option<usize>)> {
        let element = |row: Option<usize>| (target, row);

        match (target, scope.map(|s| (s.target, s.row))) {
            (UiTarget::MarketPairCard, None) => {
                (0..self.market_pairs.len()).map(|i| element(Some(i))).collect()
            }
            (UiTarget::SideTab, None) => (0..self.side_tabs.len()).map(|i| element(Some(i))).collect(),
            (UiTarget::ProductRow, None) => {
                (0..self.products.len()).map(|i| element(Some(i))).collect()
            }
            (UiTarget::FundingRow, None) => {
                (0..self.funding_rows.len()).map(|i| element(Some(i))).collect()
            }
            (UiTarget::VipTag, Some((UiTarget::ProductRow, Some(row)))) => {
                if self.products.get(row).is_some_and(|p| p.vip) {
                    vec![element(Some(row))]
                } else {
                    Vec::new()
                }
            }
            (
                UiTarget::BuyButton
                | UiTarget::StrikePrice
                | UiTarget::SettlementDate
                | UiTarget::Duration
                | UiTarget::Apr,
                Some((UiTarget::ProductRow, Some(row))),
            ) => vec![element(Some(row))],
            (UiTarget::PriceOffset, Some((UiTarget::ProductRow | UiTarget::StrikePrice, Some(row)))) => {
                if self.products.get(row).is_some_and(|p| !p.offset.is_empty()) {
                    vec![element(Some(row))]
                } else {
                    Vec::new()
                }
            }
            (UiTarget::RedeemButton, Some((UiTarget::FundingRow, Some(row)))) => {
                if self.funding_rows.get(row).is_some_and(|r| r.redeemable) {
                    vec![element(Some(row))]
                } else {
                    Vec::new()
                }
            }
            (
                UiTarget::PriceDriftNotice
                | UiTarget::DialogClose
                | UiTarget::AmountInput
                | UiTarget::AgreementCheckbox
                | UiTarget::OrderButton,
                _,
            ) => {
                let present = match target {
                    UiTarget::AmountInput => self.amount_input_present,
                    UiTarget::AgreementCheckbox => self.checkbox_present,
                    UiTarget::OrderButton => self.order_button_present,
                    UiTarget::PriceDriftNotice => self.drift_visible,
                    _ => true,
                };
                if self.dialog_open() && present {
                    vec![element(self.dialog_row)]
                } else {
                    Vec::new()
                }
            }
            (UiTarget::OrderDialog, _) if self.dialog_open() => vec![element(self.dialog_row)],
            (UiTarget::ConfirmButton, _) if self.confirm_visible => vec![element(None)],
            (UiTarget::ResultSurface, _) if self.order_placed => vec![element(None)],
            (
                UiTarget::RedeemDialog | UiTarget::RedeemAmountInput | UiTarget::RedeemConfirmButton,
                _,
            ) if self.redeem_dialog_row.is_some() => vec![element(self.redeem_dialog_row)],
            (UiTarget::RedeemSuccessNotice | UiTarget::NoticeClose, _) if self.notice_visible => {
                vec![element(None)]
            }
            _ => Vec::new(),
        }
    }

    fn click(&mut self, element: &FakeElement) {
        *self.clicks.entry(element.target).or_insert(0) += 1;

        match (element.target, element.row) {
            (UiTarget::MarketPairCard, Some(i)) => {
                self.clicked_pair = self.market_pairs.get(i).cloned();
            }
            (UiTarget::SideTab, Some(i)) => {
                self.clicked_side = self.side_tabs.get(i).cloned();
            }
            (UiTarget::BuyButton, Some(row)) => self.open_order_dialog(row),
            (UiTarget::DialogClose, _) => self.close_dialogs(),
            (UiTarget::AgreementCheckbox, _) => self.checkbox_checked = !self.checkbox_checked,
            (UiTarget::OrderButton, _) => {
                if self.confirm_step {
                    self.confirm_visible = true;
                } else {
                    self.order_placed = true;
                }
            }
            (UiTarget::ConfirmButton, _) => {
                self.confirm_visible = false;
                self.order_placed = true;
            }
            (UiTarget::RedeemButton, Some(row)) => {
                self.redeem_dialog_row = Some(row);
                self.redeem_amount_value.clear();
            }
            (UiTarget::RedeemConfirmButton, _) => {
                if let Some(row) = self.redeem_dialog_row.take() {
                    let Some(redeemed) = self.funding_rows.get(row).filter(|r| !r.fails) else {
                        return;
                    };
                    self.redeemed_texts.push(redeemed.text.clone());
                    self.redeemed_rows.push(row);
                    self.notice_visible = true;
                    if self.drop_redeemed {
                        self.funding_rows.remove(row);
                    }
                }
            }
            (UiTarget::NoticeClose, _) => self.notice_visible = false,
            _ => {}
        }
    }
}

/// Shared state behind a [`FakeBridge`] and the elements it hands out.
#[derive(Debug)]
struct Shared {
    page: Mutex<FakePage>,
}

#[derive(Debug, Clone)]
pub struct FakeBridge {
    shared: Arc<Shared>,
}

impl FakeBridge {
    #[must_use]
    pub fn new(page: FakePage) -> Self {
        Self {
            shared: Arc::new(Shared {
                page: Mutex::new(page),
            }),
        }
    }

    /// Locks the page for inspection or mid-test tweaks.
    pub fn page(&self) -> MutexGuard<'_, FakePage> {
        self.shared.page.lock()
    }

    fn guard(&self) -> Result<MutexGuard<'_, FakePage>, UiError> {
        let page = self.shared.page.lock();
        if page.session_lost {
            return Err(UiError::SessionLost("browser closed".to_string()));
        }
        Ok(page)
    }
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    shared: Arc<Shared>,
    target: UiTarget,
    row: Option<usize>,
}

impl FakeElement {
    fn guard(&self) -> Result<MutexGuard<'_, FakePage>, UiError> {
        let page = self.shared.page.lock();
        if page.session_lost {
            return Err(UiError::SessionLost("browser closed".to_string()));
        }
        Ok(page)
    }
}

#[async_trait]
impl UiElement for FakeElement {
    async fn click(&self) -> Result<(), UiError> {
        let mut page = self.guard()?;
        page.click(self);
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<(), UiError> {
        let mut page = self.guard()?;
        *page.fills.entry(self.target).or_insert(0) += 1;
        match self.target {
            UiTarget::AmountInput => page.amount_value = text.to_string(),
            UiTarget::RedeemAmountInput => page.redeem_amount_value = text.to_string(),
            _ => {}
        }
        Ok(())
    }

    async fn value(&self) -> Result<String, UiError> {
        let page = self.guard()?;
        Ok(match self.target {
            UiTarget::AmountInput => page.amount_value.clone(),
            UiTarget::RedeemAmountInput => page.redeem_amount_value.clone(),
            _ => String::new(),
        })
    }

    async fn is_checked(&self) -> Result<bool, UiError> {
        let page = self.guard()?;
        Ok(self.target == UiTarget::AgreementCheckbox && page.checkbox_checked)
    }

    async fn is_visible(&self) -> Result<bool, UiError> {
        Ok(self.guard()?.is_visible(self))
    }

    async fn is_enabled(&self) -> Result<bool, UiError> {
        let page = self.guard()?;
        Ok(match self.target {
            UiTarget::OrderButton => page.order_button_enabled,
            _ => true,
        })
    }

    async fn text_content(&self) -> Result<String, UiError> {
        Ok(self.guard()?.text_of(self))
    }

    async fn locate(&self, target: UiTarget) -> Result<Vec<Self>, UiError> {
        let page = self.guard()?;
        Ok(page
            .locate(target, Some(self))
            .into_iter()
            .map(|(target, row)| self.sibling(target, row))
            .collect())
    }
}

impl FakeElement {
    fn sibling(&self, target: UiTarget, row: Option<usize>) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            target,
            row,
        }
    }
}

#[async_trait]
impl UiBridge for FakeBridge {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), UiError> {
        let mut page = self.guard()?;
        page.close_dialogs();
        page.visited.push(url.to_string());
        Ok(())
    }

    async fn locate(&self, target: UiTarget) -> Result<Vec<FakeElement>, UiError> {
        let page = self.guard()?;
        Ok(page
            .locate(target, None)
            .into_iter()
            .map(|(target, row)| FakeElement {
                shared: Arc::clone(&self.shared),
                target,
                row,
            })
            .collect())
    }

    async fn page_text(&self) -> Result<String, UiError> {
        Ok(self.guard()?.page_text())
    }

    async fn dismiss(&self) -> Result<(), UiError> {
        let mut page = self.guard()?;
        page.dismissals += 1;
        page.close_dialogs();
        Ok(())
    }

    async fn wait(&self, _duration: Duration) {}
}
