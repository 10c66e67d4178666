//! Lookup strategies per UI target, most specific first.
//!
//! Row-scoped targets use relative XPath (`.//`) so they stay inside the row
//! element they are resolved from.

use dual_invest_core::UiTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Css,
    XPath,
}

impl Strategy {
    /// Name of the strategy in the WebDriver protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub strategy: Strategy,
    pub value: &'static str,
}

const fn css(value: &'static str) -> Locator {
    Locator {
        strategy: Strategy::Css,
        value,
    }
}

const fn xpath(value: &'static str) -> Locator {
    Locator {
        strategy: Strategy::XPath,
        value,
    }
}

// ============================================================================
// Purchase page
// ============================================================================

const MARKET_PAIR_CARD: &[Locator] = &[
    css(".CoinCards_coinCard__6OCq2"),
    css("[class*='coinCard']:not([class*='Title'])"),
];

const SIDE_TAB: &[Locator] = &[
    css("[role='tab']"),
    css(".ant-tabs-tab"),
    xpath("//*[contains(@class,'tab')][contains(normalize-space(.),'Buy') or contains(normalize-space(.),'Sell')]"),
];

const PRODUCT_ROW: &[Locator] = &[
    css("tr.table_tr__p0hoR"),
    css(".table_tableBody__yzcMg tr"),
    css("tbody tr"),
];

const VIP_TAG: &[Locator] = &[
    css(".ProductList_vipTag__yZPlr"),
    css("[class*='vipTag']"),
];

const BUY_BUTTON: &[Locator] = &[
    xpath(".//button[contains(normalize-space(.),'Buy Now')]"),
    css(".ProductList_button__JPmz2"),
];

const STRIKE_PRICE: &[Locator] = &[
    css("td:first-child .ProductList_title__dQRgA"),
    css("[class*='ProductList_title']"),
];

const PRICE_OFFSET: &[Locator] = &[
    css(".ProductList_offset__cNbj9"),
    css("[class*='offset']"),
];

const SETTLEMENT_DATE: &[Locator] = &[css("td:nth-child(2)")];

const DURATION: &[Locator] = &[css("td:nth-child(3)")];

const APR: &[Locator] = &[
    css("td:nth-child(4) .ProductList_greenApy__awkwK"),
    css("td:nth-child(4)"),
];

// ============================================================================
// Order dialog
// ============================================================================

const ORDER_DIALOG: &[Locator] = &[
    css(".ant-modal"),
    css("[role='dialog']"),
    css(".ant-modal-content"),
    css("[class*='modal']"),
];

const PRICE_DRIFT_NOTICE: &[Locator] = &[
    css(".index_errorTxt__pYQD_"),
    xpath("//*[contains(@class,'error')][contains(.,'Price has been updated')]"),
    xpath("//*[contains(text(),'Price has been updated') or contains(text(),'please choose again')]"),
];

const DIALOG_CLOSE: &[Locator] = &[
    css(".index_close__9N423"),
    css(".ant-modal-close"),
    css(".anticon-close"),
    css("[aria-label='close']"),
    xpath("//button[normalize-space(.)='×' or normalize-space(.)='Close' or normalize-space(.)='Cancel']"),
];

const AMOUNT_INPUT: &[Locator] = &[
    css(".index_amountInput__JeXip input"),
    css(".index_input__SuqTr"),
    css("input[placeholder*='USDT']"),
    xpath("//*[normalize-space(text())='Invested Amount']/..//input"),
    css("input[class*='amount'], input[class*='Amount']"),
    css("[role='dialog'] input[type='text'], .ant-modal input[type='text']"),
];

// Wrappers first: the styled input itself is transparent and reports as hidden.
const AGREEMENT_CHECKBOX: &[Locator] = &[
    css(".index_checkbox__ICF9u"),
    css(".ant-checkbox-wrapper"),
    css(".ant-checkbox-input"),
    css("input[type='checkbox']"),
];

const ORDER_BUTTON: &[Locator] = &[
    css(".index_orderBut__aa_Vc"),
    xpath("//button[contains(normalize-space(.),'Order Now')]"),
    css("button[class*='orderBut']"),
];

const CONFIRM_BUTTON: &[Locator] = &[xpath(
    "//button[normalize-space(.)='Confirm' or normalize-space(.)='OK' or normalize-space(.)='Continue' \
     or normalize-space(.)='Proceed' or normalize-space(.)='Place Order' or normalize-space(.)='Submit']",
)];

const RESULT_SURFACE: &[Locator] = &[
    xpath("//*[contains(@class,'modal') or @role='dialog' or contains(@class,'result')][contains(.,'Your order is successful')]"),
    css(".ant-modal-content"),
    css("[role='dialog']"),
];

// ============================================================================
// Savings page
// ============================================================================

const FUNDING_ROW: &[Locator] = &[
    xpath("//tr[contains(.,'USDT')]"),
    xpath("//*[contains(@class,'row')][contains(.,'USDT')]"),
    css("tbody tr"),
];

const REDEEM_BUTTON: &[Locator] = &[
    xpath(".//button[contains(normalize-space(.),'Redeem') or contains(normalize-space(.),'赎回')]"),
    css("[class*='redeem']"),
];

const REDEEM_DIALOG: &[Locator] = &[
    xpath("//*[contains(@class,'ant-modal-content')][contains(.,'Redeem')]"),
    xpath("//*[@data-testid='lux-modal'][contains(.,'Amount')]"),
];

const REDEEM_AMOUNT_INPUT: &[Locator] = &[
    css(".ant-input-affix-wrapper input[type='text']"),
    css(".ant-input[type='text']"),
    css("input[type='text']"),
];

const REDEEM_CONFIRM_BUTTON: &[Locator] = &[
    xpath("//button[contains(normalize-space(.),'Confirm')]"),
    css("button.ant-btn-primary"),
];

const REDEEM_SUCCESS_NOTICE: &[Locator] = &[
    xpath("//div[@role='dialog'][contains(.,'Redemption successful')]"),
    xpath("//*[contains(@class,'moly-modal')][contains(.,'Redemption successful')]"),
    xpath("//*[contains(@class,'modal') or contains(@class,'result')][contains(.,'successful')]"),
];

const NOTICE_CLOSE: &[Locator] = &[
    xpath("//*[name()='svg' and @id='closeIcon']/ancestor::button[1]"),
    css("svg[id='closeIcon']"),
    css("button[aria-label='Close']"),
    css(".IconButton"),
];

/// Strategies for `target`, tried in order until one matches.
#[must_use]
pub const fn locators_for(target: UiTarget) -> &'static [Locator] {
    match target {
        UiTarget::MarketPairCard => MARKET_PAIR_CARD,
        UiTarget::SideTab => SIDE_TAB,
        UiTarget::ProductRow => PRODUCT_ROW,
        UiTarget::VipTag => VIP_TAG,
        UiTarget::BuyButton => BUY_BUTTON,
        UiTarget::StrikePrice => STRIKE_PRICE,
        UiTarget::PriceOffset => PRICE_OFFSET,
        UiTarget::SettlementDate => SETTLEMENT_DATE,
        UiTarget::Duration => DURATION,
        UiTarget::Apr => APR,
        UiTarget::OrderDialog => ORDER_DIALOG,
        UiTarget::PriceDriftNotice => PRICE_DRIFT_NOTICE,
        UiTarget::DialogClose => DIALOG_CLOSE,
        UiTarget::AmountInput => AMOUNT_INPUT,
        UiTarget::AgreementCheckbox => AGREEMENT_CHECKBOX,
        UiTarget::OrderButton => ORDER_BUTTON,
        UiTarget::ConfirmButton => CONFIRM_BUTTON,
        UiTarget::ResultSurface => RESULT_SURFACE,
        UiTarget::FundingRow => FUNDING_ROW,
        UiTarget::RedeemButton => REDEEM_BUTTON,
        UiTarget::RedeemDialog => REDEEM_DIALOG,
        UiTarget::RedeemAmountInput => REDEEM_AMOUNT_INPUT,
        UiTarget::RedeemConfirmButton => REDEEM_CONFIRM_BUTTON,
        UiTarget::RedeemSuccessNotice => REDEEM_SUCCESS_NOTICE,
        UiTarget::NoticeClose => NOTICE_CLOSE,
    }
}
