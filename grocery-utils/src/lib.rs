//! Shared types for the grocery price-comparison client: the JSON shapes
//! spoken by the pricing/cart backend, the flattened comparison-row
//! view-model used by the UI, and the line-identity rules both sides of the
//! client agree on.

use serde::{Deserialize, Serialize};

/// Canonical form of an item name: trimmed and lower-cased.
///
/// Line identity is keyed on this, so "Milk " and "milk" are the same item.
pub fn normalize_item_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The client-side identity of a cart line: `<normalized name>-<provider>`.
///
/// Backend line ids are deliberately not used for local lookups; they only
/// appear in deletion-by-id calls.
pub fn line_id(item_name: &str, provider: &str) -> String {
    format!("{}-{}", normalize_item_name(item_name), provider)
}

// ----------------- price lookup -----------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct PriceQueryItem {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct PriceQuery {
    pub items: Vec<PriceQueryItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct PlatformPrice {
    pub platform: String,
    pub price: f64,
    /// Percentage, e.g. 10.0 means 10% off the original price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    /// Estimated delivery time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_available: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct PricedItem {
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<PlatformPrice>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct PriceLookupResponse {
    #[serde(default)]
    pub items: Vec<PricedItem>,
}

// ----------------- cart -----------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct CartLineDto {
    pub id: String,
    pub provider: String,
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub qty: u32,
}

/// Authoritative cart state as returned by every cart endpoint.
///
/// `delivery` is one fee per distinct platform in the cart, not per line.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartLineDto>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub delivery: f64,
    #[serde(default)]
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct CartUpsertRequest {
    pub provider: String,
    pub item_name: String,
    pub unit_price: f64,
    pub delivery_fee: f64,
    /// 0 is a valid quantity and means "remove this line".
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ----------------- natural-language add -----------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ParseAddRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ParsedItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Outcome of a natural-language add. Partially fulfilled requests report
/// the unfulfillable items and platforms separately so the UI can surface
/// each as its own notice.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ParseAddResponse {
    #[serde(default)]
    pub added_items: Vec<ParsedItem>,
    #[serde(default)]
    pub available_platforms: Vec<String>,
    #[serde(default)]
    pub unavailable_items: Vec<String>,
    #[serde(default)]
    pub unavailable_platforms: Vec<String>,
}

// ----------------- comparison view-model -----------------

/// One (product, platform) row of the comparison table, flattened from the
/// price lookup response. Field names are camelCased at the JS boundary to
/// match what the views expect.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub id: String,
    pub product: String,
    pub platform: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// Human-readable delivery estimate, e.g. "12 mins". Empty when unknown.
    pub delivery: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    pub in_stock: bool,
    pub delivery_fee: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_ids_are_normalized() {
        assert_eq!(line_id("  Milk ", "BigBasket"), "milk-BigBasket");
        assert_eq!(line_id("milk", "BigBasket"), "milk-BigBasket");
    }

    #[test]
    fn cart_response_tolerates_missing_fields() {
        // The backend omits totals on some paths; every field must default.
        let cart: CartResponse = serde_json::from_str("{}").unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.subtotal, 0.0);

        let cart: CartResponse = serde_json::from_str(
            r#"{"items": [{"id": "abc", "provider": "Instamart", "item_name": "Rice", "qty": 2}],
                "subtotal": 110.0, "delivery": 15.0, "total": 125.0}"#,
        )
        .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].unit_price, None);
        assert_eq!(cart.total, 125.0);
    }

    #[test]
    fn parse_add_response_defaults_unfulfilled_sets() {
        let res: ParseAddResponse = serde_json::from_str(
            r#"{"added_items": [{"name": "milk", "quantity": 2.0, "unit": "liters"}],
                "available_platforms": ["instamart"]}"#,
        )
        .unwrap();
        assert_eq!(res.added_items.len(), 1);
        assert!(res.unavailable_items.is_empty());
        assert!(res.unavailable_platforms.is_empty());
    }
}
