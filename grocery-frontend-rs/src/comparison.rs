//! Flattens the price lookup response into the rows the comparison table
//! renders: one row per (item, platform) pairing, with the pre-discount
//! price reconstructed from the advertised percentage.

use grocery_utils::{ComparisonRow, PriceLookupResponse, line_id};

pub fn rows_from_response(response: &PriceLookupResponse) -> Vec<ComparisonRow> {
    let mut rows = Vec::new();
    for item in &response.items {
        for listing in &item.platforms {
            let original_price = listing
                .discount
                .filter(|d| *d > 0.0 && *d < 100.0)
                .map(|d| (listing.price / (1.0 - d / 100.0)).round());
            rows.push(ComparisonRow {
                id: line_id(&item.name, &listing.platform),
                product: item.name.clone(),
                platform: listing.platform.clone(),
                price: listing.price,
                original_price,
                delivery: listing
                    .delivery_time
                    .map(|mins| format!("{} mins", mins.round()))
                    .unwrap_or_default(),
                discount: listing
                    .discount
                    .filter(|d| *d > 0.0)
                    .map(|d| format!("{}% OFF", d.round())),
                in_stock: listing.stock_available.unwrap_or(true),
                delivery_fee: listing.delivery_fee.unwrap_or(0.0),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use grocery_utils::{PlatformPrice, PricedItem};

    fn response() -> PriceLookupResponse {
        PriceLookupResponse {
            items: vec![PricedItem {
                name: "Milk".to_string(),
                platforms: vec![
                    PlatformPrice {
                        platform: "BigBasket".to_string(),
                        price: 54.0,
                        discount: Some(10.0),
                        delivery_time: Some(12.4),
                        delivery_fee: Some(20.0),
                        stock_available: Some(true),
                    },
                    PlatformPrice {
                        platform: "Instamart".to_string(),
                        price: 58.0,
                        discount: None,
                        delivery_time: None,
                        delivery_fee: None,
                        stock_available: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn one_row_per_item_platform_pairing() {
        let rows = rows_from_response(&response());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "milk-BigBasket");
        assert_eq!(rows[1].id, "milk-Instamart");
    }

    #[test]
    fn original_price_is_reconstructed_from_the_discount_percentage() {
        let rows = rows_from_response(&response());
        // 54 at 10% off rounds back up to 60
        assert_eq!(rows[0].original_price, Some(60.0));
        assert_eq!(rows[0].discount.as_deref(), Some("10% OFF"));
        assert_eq!(rows[0].delivery, "12 mins");

        // no discount advertised: no original price, no label
        assert_eq!(rows[1].original_price, None);
        assert_eq!(rows[1].discount, None);
        assert_eq!(rows[1].delivery, "");
    }

    #[test]
    fn missing_optionals_default_to_in_stock_and_free_delivery() {
        let rows = rows_from_response(&response());
        assert!(rows[1].in_stock);
        assert_eq!(rows[1].delivery_fee, 0.0);
    }
}
