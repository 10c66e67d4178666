use dual_invest_core::Product;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no eligible products available")]
    NoProductsAvailable,
}

/// Returns `true` when a displayed strike price is a whole number divisible by 5.
///
/// Thousands separators and whitespace are ignored. A fractional part is only
/// accepted when it is all zeros ("25.00"); anything else, including text that
/// isn't a number at all, does not qualify.
#[must_use]
pub fn qualifies_as_round(price: &str) -> bool {
    let normalized: String = price
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    let (whole, fraction) = match normalized.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (normalized.as_str(), ""),
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if !fraction.chars().all(|c| c == '0') {
        return false;
    }

    // Only the last digit decides divisibility by 5, so arbitrarily long
    // strings never overflow.
    whole.ends_with('0') || whole.ends_with('5')
}

/// Picks one product out of the captured candidates.
///
/// VIP rows are dropped again here even though capture already skips them.
/// Among the rest, the first round strike wins; with no round strike the first
/// candidate is taken. Candidate order is the page order and is never changed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectionEngine;

impl SelectionEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// # Errors
    /// Returns [`SelectionError::NoProductsAvailable`] when no non-VIP
    /// candidate is left.
    pub fn select<'a>(&self, candidates: &'a [Product]) -> Result<&'a Product, SelectionError> {
        let mut eligible = candidates.iter().filter(|p| !p.is_vip).peekable();
        let first = *eligible.peek().ok_or(SelectionError::NoProductsAvailable)?;

        for product in eligible {
            if qualifies_as_round(&product.displayed_price) {
                info!(
                    price = %product.price_label(),
                    index = product.index,
                    "Selected round strike"
                );
                return Ok(product);
            }
            debug!(price = %product.displayed_price, "Strike is not a multiple of 5");
        }

        info!(
            price = %first.price_label(),
            index = first.index,
            "No round strike available, taking first product"
        );
        Ok(first)
    }
}
