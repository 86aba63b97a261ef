//! User-facing copy. Kept in one place so the handlers stay readable.

use chrono::{DateTime, Utc};

use crate::{
    application::ports::store::BotStats,
    domain::entities::{
        payment::PaymentStatus,
        plan::{PLANS, Plan},
        subscription::Subscription,
    },
    use_cases::admin::BroadcastReport,
};

pub const WELCOME: &str =
    "Welcome to Comet VPN 🚀\nFast, private internet access. Pick an option below.";

pub const MENU: &str = "What would you like to do?";

pub const RATE_LIMITED: &str = "🛑 Easy there. Give it a few seconds and try again.";

pub const GENERIC_FAILURE: &str =
    "Something went wrong on our side. Please try again in a minute.";

pub const PLAN_NOT_FOUND: &str = "That plan is not available. Please pick one from the list.";

pub const PLAN_NOT_FOUND_CHECKOUT: &str =
    "Plan not found. Please contact support before paying again.";

pub const INVOICE_NOT_FOUND: &str =
    "We could not find this invoice. Please pick a plan once more.";

pub const INVOICE_ALREADY_USED: &str =
    "This invoice was already processed. Pick a plan to get a fresh one.";

pub const INVOICE_RECORD_MISSING: &str =
    "We could not match your payment to an invoice. Support has been notified.";

pub const PROVISIONING_FAILED: &str =
    "Payment received, but issuing your key failed. Support is on it and will follow up.";

pub const INVOICE_SENT: &str = "Invoice sent. Pay it and you are in!";

pub const INVOICE_DESCRIPTION: &str = "Instant access after payment. Cancel any time.";

pub const NO_SUBSCRIPTION: &str =
    "No active subscription yet. Pick a plan to get protected.";

pub const NOT_ADMIN: &str = "This command is for the operator only.";

pub const BROADCAST_USAGE: &str = "Usage: /broadcast <message text>";

pub fn plan_list() -> String {
    let mut lines = vec!["🔥 Comet VPN plans:".to_string()];
    for plan in &PLANS {
        lines.push(plan_line(plan));
    }
    lines.push(String::new());
    lines.push("Paid in Telegram Stars. Instant access after payment.".to_string());
    lines.join("\n")
}

pub fn plan_line(plan: &Plan) -> String {
    match plan.discount_hint {
        Some(hint) => format!("{} mo — {}₽ ({hint})", plan.months, plan.price_rub),
        None => format!("{} mo — {}₽", plan.months, plan.price_rub),
    }
}

pub fn invoice_title(plan: &Plan) -> String {
    format!("Comet VPN — {} mo", plan.months)
}

pub fn subscription_summary(sub: &Subscription, now: DateTime<Utc>) -> String {
    format!(
        "🔐 Your subscription is active.\nKey: {}\nExpires: {}\nDays left: {}",
        sub.access_url,
        sub.expires_at.format("%d.%m.%Y %H:%M UTC"),
        sub.days_left(now)
    )
}

pub fn provisioned(sub: &Subscription) -> String {
    format!(
        "Subscription activated! 🚀\nYour key:\n{}\n\nHow to connect:\n\
         1. Install Outline (iOS, Android, Windows, macOS, Linux).\n\
         2. Open the app and paste the key above.\n\
         3. Connect and browse freely.",
        sub.access_url
    )
}

pub fn already_settled(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Success => {
            "This payment was already processed — your key is ready under /my_subscription."
        }
        _ => "This payment was already handled. If something looks off, contact support.",
    }
}

pub fn stats(stats: &BotStats) -> String {
    format!(
        "📊 Comet VPN stats\nUsers: {}\nRevenue (Stars): {}",
        stats.total_users, stats.total_revenue_stars
    )
}

pub fn broadcast_report(report: &BroadcastReport) -> String {
    format!("Done. Sent: {}, failed: {}.", report.sent, report.failed)
}
