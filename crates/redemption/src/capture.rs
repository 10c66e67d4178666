//! Reads redeemable positions off the savings page.

use dual_invest_core::ui::{locate_visible_in, UiBridge, UiElement, UiError, UiTarget};
use dual_invest_core::FundingSource;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info};

const NUMBER: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";

/// A number followed by a unit word, e.g. "1,250.75 USDT".
fn unit_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(&format!(r"{NUMBER}\s*([A-Za-z]+)")).ok())
        .as_ref()
}

fn balance_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(&format!(r"(?i)balance.*?{NUMBER}")).ok())
        .as_ref()
}

fn to_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', ""))
        .ok()
        .filter(|amount| *amount > Decimal::ZERO)
}

/// Extracts the position amount from a row's text.
///
/// Looks for a number followed by the currency code first, then for a number
/// after a "Balance" label. Thousands separators are accepted. Zero or
/// unparsable amounts yield `None`.
#[must_use]
pub fn parse_amount(text: &str, currency: &str) -> Option<Decimal> {
    let currency = currency.to_lowercase();
    let by_unit = unit_pattern().and_then(|re| {
        re.captures_iter(text)
            .find(|caps| caps[2].to_lowercase().starts_with(&currency))
            .and_then(|caps| to_amount(&caps[1]))
    });

    by_unit.or_else(|| {
        let caps = balance_pattern()?.captures(text)?;
        to_amount(caps.get(1)?.as_str())
    })
}

/// Collects every row that mentions `currency`, offers a redeem control and
/// shows a positive amount.
///
/// `FundingSource::index` is the row's position among all funding rows at
/// capture time. Rows can leave the page once redeemed, so use
/// [`find_source_row`] rather than the index to get back to a position.
///
/// # Errors
/// Propagates bridge errors.
pub async fn capture_sources<B: UiBridge + ?Sized>(
    bridge: &B,
    currency: &str,
) -> Result<Vec<FundingSource>, UiError> {
    let rows = bridge.locate(UiTarget::FundingRow).await?;
    debug!(rows = rows.len(), "Funding rows on page");

    let needle = currency.to_lowercase();
    let mut sources = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let text = row.text_content().await?;
        if !text.to_lowercase().contains(&needle) {
            continue;
        }

        if locate_visible_in(row, UiTarget::RedeemButton).await?.is_none() {
            debug!(index, "Row has no redeem control");
            continue;
        }

        match parse_amount(&text, currency) {
            Some(amount) => {
                debug!(index, %amount, "Redeemable position");
                sources.push(FundingSource { amount, index });
            }
            None => debug!(index, "Could not read position amount"),
        }
    }

    let total: Decimal = sources.iter().map(|s| s.amount).sum();
    info!(
        positions = sources.len(),
        %total,
        currency,
        "Captured redeemable positions"
    );

    Ok(sources)
}

/// Finds the row currently showing `source`: same currency, a visible redeem
/// control and the same amount. The row at the captured index is preferred
/// when it still matches.
///
/// # Errors
/// Propagates bridge errors.
pub async fn find_source_row<B: UiBridge + ?Sized>(
    bridge: &B,
    source: &FundingSource,
    currency: &str,
) -> Result<Option<B::Element>, UiError> {
    let rows = bridge.locate(UiTarget::FundingRow).await?;
    let needle = currency.to_lowercase();

    let mut candidates = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        let text = row.text_content().await?;
        if !text.to_lowercase().contains(&needle)
            || parse_amount(&text, currency) != Some(source.amount)
        {
            continue;
        }
        if locate_visible_in(&row, UiTarget::RedeemButton).await?.is_some() {
            candidates.push((index, row));
        }
    }

    let preferred = candidates
        .iter()
        .position(|(index, _)| *index == source.index);
    if preferred.is_none() && !candidates.is_empty() {
        debug!(captured = source.index, "Position row moved");
    }
    Ok(candidates
        .into_iter()
        .nth(preferred.unwrap_or(0))
        .map(|(_, row)| row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dual_invest_core::testing::{FakeBridge, FakeFundingRow, FakePage};
    use rust_decimal_macros::dec;

    #[test]
    fn parses_amount_before_currency() {
        assert_eq!(parse_amount("Flexible Savings 12.5 USDT Redeem", "USDT"), Some(dec!(12.5)));
        assert_eq!(parse_amount("1,234.56usdt", "USDT"), Some(dec!(1234.56)));
    }

    #[test]
    fn skips_amounts_in_other_units() {
        assert_eq!(parse_amount("Earned 0.5 BTC, holding 30 USDT", "USDT"), Some(dec!(30)));
        assert_eq!(parse_amount("Holding 30 USDC", "USDT"), None);
    }

    #[test]
    fn parses_balance_label_fallback() {
        assert_eq!(parse_amount("USDT Savings Balance: 48.2", "USDT"), Some(dec!(48.2)));
    }

    #[test]
    fn rejects_missing_or_zero_amounts() {
        assert_eq!(parse_amount("USDT Savings", "USDT"), None);
        assert_eq!(parse_amount("0 USDT", "USDT"), None);
    }

    #[tokio::test]
    async fn skips_other_currencies_and_rows_without_redeem() {
        let mut locked = FakeFundingRow::usdt("30");
        locked.redeemable = false;
        let bridge = FakeBridge::new(FakePage::with_funding(vec![
            FakeFundingRow {
                text: "BTC Flexible 0.5 BTC Redeem".to_string(),
                redeemable: true,
                fails: false,
            },
            locked,
            FakeFundingRow::usdt("1,250.75"),
        ]));

        let sources = capture_sources(&bridge, "USDT").await.unwrap();

        assert_eq!(
            sources,
            vec![FundingSource {
                amount: dec!(1250.75),
                index: 2,
            }]
        );
    }

    #[tokio::test]
    async fn finds_position_by_content_after_rows_shift() {
        let bridge = FakeBridge::new(FakePage::with_funding(vec![
            FakeFundingRow::usdt("9"),
            FakeFundingRow::usdt("25"),
        ]));
        let captured = FundingSource {
            amount: dec!(9),
            index: 1,
        };

        let row = find_source_row(&bridge, &captured, "USDT")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row.text_content().await.unwrap(), "USDT Flexible 9 USDT Redeem");
    }
}
