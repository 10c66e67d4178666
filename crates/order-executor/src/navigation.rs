use dual_invest_core::ui::{UiBridge, UiElement, UiError, UiTarget};
use std::time::Duration;
use tracing::{info, warn};

/// Opens the dual-asset page and switches to the configured market and side.
///
/// The pair card must match `pair` exactly (so "ETH-USDT" never picks
/// "ETH-BTC"); the side tab only has to contain `side`, ignoring case. Both
/// picks are best effort: the page may already show the wanted market, so a
/// missing card or tab is logged and the flow continues.
///
/// # Errors
/// Returns bridge errors from navigation and clicks.
pub async fn open_market<B: UiBridge + ?Sized>(
    bridge: &B,
    url: &str,
    pair: &str,
    side: &str,
    settle: Duration,
) -> Result<(), UiError> {
    info!(url, "Opening dual-asset page");
    bridge.navigate(url).await?;
    bridge.wait(settle).await;

    let mut pair_selected = false;
    for card in bridge.locate(UiTarget::MarketPairCard).await? {
        if card.is_visible().await? && card.text_content().await?.trim() == pair {
            card.click().await?;
            bridge.wait(settle).await;
            pair_selected = true;
            break;
        }
    }
    if pair_selected {
        info!(pair, "Market selected");
    } else {
        warn!(pair, "Market card not found, continuing with current market");
    }

    let wanted = side.to_uppercase();
    let mut side_selected = false;
    for tab in bridge.locate(UiTarget::SideTab).await? {
        if tab.is_visible().await? && tab.text_content().await?.to_uppercase().contains(&wanted) {
            tab.click().await?;
            bridge.wait(settle).await;
            side_selected = true;
            break;
        }
    }
    if side_selected {
        info!(side, "Product side selected");
    } else {
        warn!(side, "Side tab not found, continuing with current side");
    }

    Ok(())
}
