//! User-facing notices produced by the client. The views decide how to show
//! them; this module decides what they say.

use grocery_utils::ParseAddResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Added,
    ItemUnavailable,
    PlatformUnavailable,
    AuthKeyCreated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

/// Turn a parse-and-add outcome into its notices. The three outcomes are
/// reported separately: what was added, which requested items had no
/// listing, and which requested platforms could not serve the order. They
/// are never folded into one message.
pub fn parse_add_notices(outcome: &ParseAddResponse) -> Vec<Notice> {
    let mut notices = Vec::new();

    if !outcome.unavailable_items.is_empty() {
        notices.push(Notice {
            kind: NoticeKind::ItemUnavailable,
            title: "Item not available".to_string(),
            body: format!("{} not available", outcome.unavailable_items.join(", ")),
        });
    }
    if !outcome.unavailable_platforms.is_empty() {
        notices.push(Notice {
            kind: NoticeKind::PlatformUnavailable,
            title: "Platform not available".to_string(),
            body: format!("{} not available", outcome.unavailable_platforms.join(", ")),
        });
    }
    if !outcome.added_items.is_empty() {
        let added: Vec<String> = outcome
            .added_items
            .iter()
            .map(|item| item.name.clone())
            .collect();
        let body = if outcome.available_platforms.is_empty() {
            format!("Added {}", added.join(", "))
        } else {
            format!(
                "Added {} via {}",
                added.join(", "),
                outcome.available_platforms.join(", ")
            )
        };
        notices.push(Notice {
            kind: NoticeKind::Added,
            title: "Added to cart".to_string(),
            body,
        });
    }

    notices
}
