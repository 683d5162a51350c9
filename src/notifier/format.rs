// Telegram message bodies. Telegram's HTML mode only understands a handful of
// inline tags, so layout is done with plain newlines.

use crate::domain::{Change, ChangeSet, Record};
use maud::{html, Markup};

/// "120000" -> "120 000 ₽"
pub fn format_rub(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} ₽")
}

fn price_text(record: &Record) -> String {
    match record.price {
        Some(p) => format_rub(p),
        None => "Цена не указана".to_string(),
    }
}

fn offer_block(record: &Record, show_price: bool) -> Markup {
    let title = record.attr("title").unwrap_or("Без названия");
    html! {
        b { (title) } "\n"
        @if show_price {
            "💵 " b { (price_text(record)) } "\n"
        }
        @if let Some(metro) = record.attr("metro") {
            "🚇 " (metro)
            @if let Some(walk) = record.attr("walking_time") {
                " (" (walk) ")"
            }
            "\n"
        }
        @if let Some(address) = record.attr("address") {
            "📍 " (address) "\n"
        }
        @if let Some(time) = record.attr("time_label") {
            "🕑 " (time) "\n"
        }
        @if let Some(url) = record.attr("offer_url") {
            a href=(url) { "Посмотреть объявление" }
        } @else {
            "ID " (record.id)
        }
    }
}

pub fn format_change(change: &Change) -> String {
    let markup = match change {
        Change::New { current } => html! {
            "🆕 " b { "НОВОЕ ПРЕДЛОЖЕНИЕ" } "\n\n"
            (offer_block(current, true))
        },
        Change::Removed { previous } => html! {
            "❌ " b { "ПРЕДЛОЖЕНИЕ СНЯТО" } "\n\n"
            (offer_block(previous, true))
        },
        Change::PriceChanged { current, previous } => {
            let delta = change.price_delta().unwrap_or(0);
            let (icon, heading, sign) = if delta > 0 {
                ("📈", "ЦЕНА ВЫРОСЛА", "+")
            } else {
                ("📉", "ЦЕНА СНИЗИЛАСЬ", "-")
            };
            html! {
                (icon) " " b { (heading) } "\n\n"
                "💵 " b { (price_text(previous)) " → " (price_text(current)) }
                " (" (sign) (format_rub(delta.abs())) ")\n\n"
                (offer_block(current, false))
            }
        }
    };
    markup.into_string()
}

pub fn format_summary(changes: &ChangeSet) -> String {
    html! {
        "📊 " b { "Итоги" } "\n"
        "🆕 Новые: " (changes.new.len()) "\n"
        "💰 Изменения цены: " (changes.price_changed.len()) "\n"
        "❌ Снятые: " (changes.removed.len())
    }
    .into_string()
}
