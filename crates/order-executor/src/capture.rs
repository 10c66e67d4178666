//! Reads the product table of the dual-asset page into [`Product`] records.

use dual_invest_core::ui::{locate_visible_in, text_in, UiBridge, UiElement, UiError, UiTarget};
use dual_invest_core::Product;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

const NOT_AVAILABLE: &str = "N/A";

fn offset_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([+-]?\d+(?:\.\d+)?%)").ok())
        .as_ref()
}

/// Splits a strike cell like "2,450-1.8%" into price and offset.
///
/// `offset` is the text of the dedicated offset element when the page has
/// one; otherwise the offset is searched for in the cell text.
fn split_strike(cell: &str, offset: Option<String>) -> (String, String) {
    let offset = offset.filter(|o| !o.is_empty()).or_else(|| {
        offset_pattern()
            .and_then(|re| re.captures(cell))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    });

    let price = match &offset {
        Some(o) => cell.replacen(o.as_str(), "", 1),
        None => cell.to_string(),
    };
    let price = price.trim();

    (
        if price.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            price.to_string()
        },
        offset.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    )
}

/// Captures every purchasable non-VIP product row, in page order.
///
/// Rows carrying a VIP tag are skipped, as are rows without a visible buy
/// control. `Product::index` is the row's position among all product rows.
///
/// # Errors
/// Propagates bridge errors.
pub async fn capture_products<B: UiBridge + ?Sized>(bridge: &B) -> Result<Vec<Product>, UiError> {
    let rows = bridge.locate(UiTarget::ProductRow).await?;
    let mut products = Vec::new();
    let mut vip_rows = 0usize;

    for (index, row) in rows.iter().enumerate() {
        if !row.locate(UiTarget::VipTag).await?.is_empty() {
            vip_rows += 1;
            continue;
        }
        if locate_visible_in(row, UiTarget::BuyButton).await?.is_none() {
            debug!(index, "Row has no buy control");
            continue;
        }

        let cell = text_in(row, UiTarget::StrikePrice).await?.unwrap_or_default();
        let offset = text_in(row, UiTarget::PriceOffset).await?;
        let (displayed_price, price_offset) = split_strike(&cell, offset);

        let field = |value: Option<String>| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };

        products.push(Product {
            index,
            displayed_price,
            price_offset,
            settlement_date: field(text_in(row, UiTarget::SettlementDate).await?),
            duration: field(text_in(row, UiTarget::Duration).await?),
            apr: field(text_in(row, UiTarget::Apr).await?),
            is_vip: false,
        });
    }

    info!(
        rows = rows.len(),
        vip_rows,
        candidates = products.len(),
        "Captured product list"
    );
    for product in &products {
        debug!(
            index = product.index,
            price = %product.price_label(),
            duration = %product.duration,
            apr = %product.apr,
            "Candidate"
        );
    }

    Ok(products)
}
