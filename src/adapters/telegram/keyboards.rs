use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::domain::entities::plan::PLANS;

use super::texts;

pub fn main_menu(support_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![InlineKeyboardButton::callback("Plans 💸", "plans")],
        vec![InlineKeyboardButton::callback(
            "My subscription 📱",
            "my_subscription",
        )],
        vec![InlineKeyboardButton::url("Support 🆘", support_url.clone())],
    ])
}

pub fn plans() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = PLANS
        .iter()
        .map(|plan| {
            vec![InlineKeyboardButton::callback(
                texts::plan_line(plan),
                format!("plan:{}", plan.months),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("Back ⬅️", "back_main")]);
    InlineKeyboardMarkup::new(rows)
}

pub fn renew() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([vec![InlineKeyboardButton::callback("Renew 🔁", "plans")]])
}
