#![allow(clippy::format_push_string)]

use crate::session::{
    OverallStatus, PurchaseSession, RedemptionSession, RunReport, SessionStatus,
};
use rust_decimal::Decimal;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Escapes the characters legacy Telegram Markdown treats as entity markers,
/// so interpolated text (error messages, page labels) cannot break the
/// message formatting.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Renders run reports as Telegram-flavoured Markdown text.
pub struct ReportFormatter;

impl ReportFormatter {
    #[must_use]
    pub fn format(report: &RunReport) -> String {
        let mut output = String::new();

        let headline = match report.overall_status {
            OverallStatus::Success => "✅ *Scheduled run completed*",
            OverallStatus::Partial => "⚠️ *Scheduled run partially completed*",
            OverallStatus::Failed => "❌ *Scheduled run failed*",
        };
        output.push_str(headline);
        output.push_str("\n\n");

        let millis = report.duration().num_milliseconds().max(0);
        output.push_str(&format!(
            "⏱️ *Duration:* {}.{} s\n",
            millis / 1000,
            (millis % 1000) / 100
        ));
        output.push_str(&format!(
            "🕒 *Started:* {}\n\n",
            report.start_time.format(TIME_FORMAT)
        ));

        output.push_str("📊 *Stage 1 - Redemption:*\n");
        output.push_str(&Self::format_redemption(&report.redemption));
        output.push('\n');

        output.push_str("🎯 *Stage 2 - Purchase:*\n");
        output.push_str(&Self::format_purchase(&report.purchase));
        output.push('\n');

        let verdict = match report.overall_status {
            OverallStatus::Success => "✅ *Overall: success*",
            OverallStatus::Partial => "⚠️ *Overall: partial, check the failed stage*",
            OverallStatus::Failed => "❌ *Overall: failed*",
        };
        output.push_str(verdict);

        output
    }

    #[must_use]
    pub fn format_startup(interval_minutes: u64, amount: Decimal, currency: &str) -> String {
        let mut output = String::from("🚀 *Dual investment scheduler started*\n\n");
        output.push_str(&format!("🔁 Interval: every {interval_minutes} min\n"));
        output.push_str(&format!(
            "💰 Default amount: {} {}\n",
            amount.normalize(),
            escape_markdown(currency)
        ));
        output.push_str("▶️ First run starts now");
        output
    }

    #[must_use]
    pub fn format_shutdown(runs: u64) -> String {
        format!("🛑 *Dual investment scheduler stopped*\n\n📋 Runs completed: {runs}")
    }

    /// Message for a run that crashed outside of both stages.
    #[must_use]
    pub fn format_fault(message: &str) -> String {
        format!(
            "💥 *Scheduled run crashed*\n\n{}\n\nThe scheduler keeps running.",
            escape_markdown(message)
        )
    }

    #[must_use]
    pub fn format_redemption(session: &RedemptionSession) -> String {
        let mut output = String::new();
        let currency = escape_markdown(&session.currency);

        match session.status() {
            SessionStatus::Success => {
                output.push_str(&format!(
                    "⏰ Time: {}\n",
                    session.timestamp.format(TIME_FORMAT)
                ));
                output.push_str(&format!(
                    "💵 Redeemed: {} {}\n",
                    session.total_redeemed.normalize(),
                    currency
                ));
                let target = session
                    .adjusted_target
                    .map_or_else(|| session.target_amount.normalize().to_string(), |t| t.to_string());
                output.push_str(&format!("🎯 Target: {target} {currency}\n"));
                output.push_str(&format!(
                    "📦 Positions redeemed: {}\n",
                    session.redeemed_sources.len()
                ));
            }
            SessionStatus::Failed => {
                let reason = session
                    .failure_reason()
                    .map_or_else(|| "unknown error".to_string(), |r| escape_markdown(&r.to_string()));
                output.push_str(&format!("❌ Redemption failed: {reason}\n"));
            }
            SessionStatus::Unknown | SessionStatus::Pending => {
                output.push_str("❔ Redemption outcome could not be confirmed\n");
            }
        }

        output
    }

    #[must_use]
    pub fn format_purchase(session: &PurchaseSession) -> String {
        let mut output = String::new();
        let currency = escape_markdown(&session.currency);

        match session.status() {
            SessionStatus::Success => {
                output.push_str(&format!(
                    "⏰ Time: {}\n",
                    session.timestamp.format(TIME_FORMAT)
                ));
                output.push_str(&format!(
                    "💰 Amount: {} {}\n",
                    session.investment_amount.normalize(),
                    currency
                ));
                output.push_str(&format!("📈 Side: {}\n", escape_markdown(&session.product_side)));
                if let Some(selected) = &session.selected {
                    output.push_str(&format!("📍 Strike: {}\n", escape_markdown(&selected.price_label())));
                    output.push_str(&format!("⏳ Term: {}\n", escape_markdown(&selected.duration)));
                    output.push_str(&format!("📈 APR: {}\n", escape_markdown(&selected.apr)));
                    output.push_str(&format!(
                        "📅 Settlement: {}\n",
                        escape_markdown(&selected.settlement_date)
                    ));
                }
            }
            SessionStatus::Failed => {
                let reason = session
                    .failure_reason()
                    .map_or_else(|| "unknown error".to_string(), |r| escape_markdown(&r.to_string()));
                output.push_str(&format!("❌ Purchase failed: {reason}\n"));
            }
            SessionStatus::Unknown | SessionStatus::Pending => {
                output.push_str(&format!(
                    "❔ Order for {} {} was submitted but could not be confirmed, check the account\n",
                    session.investment_amount.normalize(),
                    currency
                ));
                if let Some(selected) = &session.selected {
                    output.push_str(&format!("📍 Strike: {}\n", escape_markdown(&selected.price_label())));
                }
            }
        }

        output
    }
}
