//! Client-held cart state and the rules for reconciling it with the
//! backend-authoritative cart and the locally persisted snapshot.
//!
//! Three sequences make up the view-model: the selection-id list, the
//! quantity map, and the denormalized line list. They always share one
//! key-set, and a quantity of zero means the identity is gone from all
//! three. Everything here is pure so it can be tested natively.

use std::collections::BTreeMap;

use grocery_utils::{CartResponse, CartUpsertRequest, ComparisonRow, line_id, normalize_item_name};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::snapshot::{CartSnapshot, SnapshotItem};

/// One line of the client-held cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: String,
    pub product: String,
    pub platform: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    pub delivery_fee: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Totals {
    pub subtotal: f64,
    pub delivery: f64,
}

/// An optimistic mutation's side effect: the upsert to fire at the backend.
///
/// `seq` is monotonic per cart so that a future implementation can discard
/// responses that arrive out of issue-order; the current behavior applies
/// whatever totals come back, whenever they come back.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpsert {
    pub seq: u64,
    pub request: CartUpsertRequest,
}

/// Which of the three sources won during hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// Backend returned lines; it wins outright and the snapshot should be
    /// overwritten with the resulting state.
    BackendAuthoritative,
    /// Backend said the cart is empty; all local state and the snapshot
    /// should be cleared so stale items are not resurrected.
    BackendEmpty,
    /// Backend unreachable; state was restored from the snapshot, which is
    /// itself left untouched for a future successful fetch.
    SnapshotFallback,
}

#[derive(Debug, Clone, Default)]
pub struct CartState {
    selected: Vec<String>,
    quantities: BTreeMap<String, u32>,
    items: Vec<CartLine>,
    /// Authoritative totals, patched in as upsert responses arrive.
    backend_totals: Option<Totals>,
    next_seq: u64,
}

impl CartState {
    // ----------------- hydration -----------------

    /// Merge the authoritative fetch result, the persisted selection and the
    /// current comparison rows, in the fixed precedence order: non-empty
    /// backend wins outright, empty backend clears everything, a failed
    /// fetch falls back to the snapshot restricted to rows that still exist.
    pub fn hydrate(
        fetch: Result<CartResponse, ApiError>,
        saved_selection: &BTreeMap<String, u32>,
        rows: &[ComparisonRow],
    ) -> (CartState, HydrationOutcome) {
        match fetch {
            Ok(cart) if !cart.items.is_empty() => {
                (CartState::from_backend(&cart), HydrationOutcome::BackendAuthoritative)
            }
            Ok(_) => (CartState::default(), HydrationOutcome::BackendEmpty),
            Err(err) => {
                log::warn!("cart fetch failed, restoring from snapshot: {err}");
                (
                    CartState::restore_from_snapshot(saved_selection, rows),
                    HydrationOutcome::SnapshotFallback,
                )
            }
        }
    }

    /// Build the view-model entirely from the backend response.
    pub(crate) fn from_backend(cart: &CartResponse) -> CartState {
        let mut state = CartState::default();
        for dto in &cart.items {
            let id = line_id(&dto.item_name, &dto.provider);
            // a backend line with a recorded quantity of 0 still exists; show it as 1
            let qty = if dto.qty == 0 { 1 } else { dto.qty };
            if state.quantities.contains_key(&id) {
                continue;
            }
            state.selected.push(id.clone());
            state.quantities.insert(id.clone(), qty);
            state.items.push(CartLine {
                id,
                product: normalize_item_name(&dto.item_name),
                platform: dto.provider.clone(),
                price: dto.unit_price.unwrap_or(0.0),
                original_price: None,
                delivery_fee: 0.0,
            });
        }
        state.backend_totals = Some(Totals {
            subtotal: cart.subtotal,
            delivery: cart.delivery,
        });
        state
    }

    /// Restore from the persisted selection, keeping only identities that
    /// still exist in the current comparison result set.
    fn restore_from_snapshot(
        saved_selection: &BTreeMap<String, u32>,
        rows: &[ComparisonRow],
    ) -> CartState {
        let mut state = CartState::default();
        for row in rows {
            let Some(&qty) = saved_selection.get(&row.id) else {
                continue;
            };
            let qty = if qty == 0 { 1 } else { qty };
            state.selected.push(row.id.clone());
            state.quantities.insert(row.id.clone(), qty);
            state.items.push(CartLine::from(row));
        }
        state
    }

    // ----------------- optimistic mutations -----------------

    /// Checkbox checked: add the row with quantity 1 (or bump it if already
    /// present) and report the upsert to fire.
    pub fn select(&mut self, row: &ComparisonRow) -> PendingUpsert {
        if !self.selected.iter().any(|id| id == &row.id) {
            self.selected.push(row.id.clone());
        }
        if !self.items.iter().any(|line| line.id == row.id) {
            self.items.push(CartLine::from(row));
        }
        *self.quantities.entry(row.id.clone()).or_insert(0) += 1;
        self.pending(row.platform.clone(), &row.product, row.price, row.delivery_fee, 1)
    }

    /// Checkbox unchecked: drop the row from all three sequences and report
    /// the qty-0 upsert that removes it remotely.
    pub fn deselect(&mut self, row: &ComparisonRow) -> PendingUpsert {
        self.remove_everywhere(&row.id);
        self.pending(row.platform.clone(), &row.product, row.price, row.delivery_fee, 0)
    }

    pub fn increment(&mut self, id: &str) -> Option<PendingUpsert> {
        let line = self.items.iter().find(|line| line.id == id)?.clone();
        let qty = self.quantities.entry(id.to_string()).or_insert(0);
        *qty += 1;
        let qty = *qty;
        Some(self.pending(line.platform, &line.product, line.price, line.delivery_fee, qty))
    }

    /// Decrement, clamped at 0. Reaching 0 removes the identity from all
    /// three sequences in the same operation, before any network response.
    pub fn decrement(&mut self, id: &str) -> Option<PendingUpsert> {
        let line = self.items.iter().find(|line| line.id == id)?.clone();
        let next = self
            .quantities
            .get(id)
            .copied()
            .unwrap_or(0)
            .saturating_sub(1);
        if next == 0 {
            self.remove_everywhere(id);
        } else {
            self.quantities.insert(id.to_string(), next);
        }
        Some(self.pending(line.platform, &line.product, line.price, line.delivery_fee, next))
    }

    /// Patch authoritative totals from an upsert/fetch response. Stale
    /// responses are not detected here; `PendingUpsert::seq` exists so a
    /// caller could start discarding them.
    pub fn apply_totals(&mut self, cart: &CartResponse) {
        self.backend_totals = Some(Totals {
            subtotal: cart.subtotal,
            delivery: cart.delivery,
        });
    }

    fn remove_everywhere(&mut self, id: &str) {
        self.selected.retain(|selected| selected != id);
        self.items.retain(|line| line.id != id);
        self.quantities.remove(id);
    }

    fn pending(
        &mut self,
        provider: String,
        product: &str,
        unit_price: f64,
        delivery_fee: f64,
        qty: u32,
    ) -> PendingUpsert {
        self.next_seq += 1;
        PendingUpsert {
            seq: self.next_seq,
            request: CartUpsertRequest {
                provider,
                item_name: normalize_item_name(product),
                unit_price,
                delivery_fee,
                qty,
                metadata: None,
            },
        }
    }

    // ----------------- totals -----------------

    /// Sum of unit price × quantity over every line.
    pub fn local_subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|line| line.price * f64::from(self.qty(&line.id)))
            .sum()
    }

    /// One delivery fee per distinct platform, not per line. When the same
    /// platform appears on several lines the first-seen fee wins; later
    /// lines do not override it. Known inexactness, kept on purpose.
    pub fn local_delivery(&self) -> f64 {
        let mut fees: BTreeMap<&str, f64> = BTreeMap::new();
        for line in &self.items {
            fees.entry(&line.platform).or_insert(line.delivery_fee);
        }
        fees.values().sum()
    }

    /// Savings against pre-discount prices, over discounted lines only.
    pub fn savings(&self) -> f64 {
        self.items
            .iter()
            .filter_map(|line| {
                let original = line.original_price?;
                Some(f64::from(self.qty(&line.id)) * (original - line.price))
            })
            .sum()
    }

    /// Totals to display: authoritative where patched in, locally computed
    /// otherwise. A backend subtotal of 0 is treated as "not yet known".
    pub fn displayed_totals(&self) -> Totals {
        let subtotal = match self.backend_totals {
            Some(totals) if totals.subtotal != 0.0 => totals.subtotal,
            _ => self.local_subtotal(),
        };
        let delivery = match self.backend_totals {
            Some(totals) => totals.delivery,
            None => self.local_delivery(),
        };
        Totals { subtotal, delivery }
    }

    // ----------------- accessors -----------------

    pub fn qty(&self, id: &str) -> u32 {
        self.quantities.get(id).copied().unwrap_or(0)
    }

    pub fn selected_ids(&self) -> &[String] {
        &self.selected
    }

    pub fn quantities(&self) -> &BTreeMap<String, u32> {
        &self.quantities
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.items
    }

    pub fn item_count(&self) -> u32 {
        self.quantities.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The persisted form of the current state, written after every
    /// mutation and every authoritative fetch. Totals are the locally
    /// computed ones so a reload renders without a backend round trip.
    pub fn snapshot(&self) -> CartSnapshot {
        let subtotal = self.local_subtotal();
        let delivery = self.local_delivery();
        CartSnapshot {
            items: self
                .items
                .iter()
                .map(|line| SnapshotItem {
                    id: line.id.clone(),
                    product: line.product.clone(),
                    platform: line.platform.clone(),
                    price: line.price,
                    original_price: line.original_price,
                    delivery_fee: line.delivery_fee,
                    quantity: self.qty(&line.id).max(1),
                })
                .collect(),
            subtotal,
            delivery,
            total: subtotal + delivery,
        }
    }
}

/// What the views render: the three sequences plus displayed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub selected_ids: Vec<String>,
    pub items: Vec<SnapshotItem>,
    pub subtotal: f64,
    pub delivery: f64,
    pub total: f64,
    pub savings: f64,
    pub item_count: u32,
}

impl CartState {
    pub fn view(&self) -> CartView {
        let Totals { subtotal, delivery } = self.displayed_totals();
        CartView {
            selected_ids: self.selected.clone(),
            items: self.snapshot().items,
            subtotal,
            delivery,
            total: subtotal + delivery,
            savings: self.savings(),
            item_count: self.item_count(),
        }
    }
}

impl From<&ComparisonRow> for CartLine {
    fn from(row: &ComparisonRow) -> Self {
        CartLine {
            id: row.id.clone(),
            product: normalize_item_name(&row.product),
            platform: row.platform.clone(),
            price: row.price,
            original_price: row.original_price,
            delivery_fee: row.delivery_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grocery_utils::CartLineDto;
    use std::collections::BTreeSet;

    fn row(product: &str, platform: &str, price: f64, fee: f64) -> ComparisonRow {
        ComparisonRow {
            id: line_id(product, platform),
            product: product.to_string(),
            platform: platform.to_string(),
            price,
            original_price: None,
            delivery: String::new(),
            discount: None,
            in_stock: true,
            delivery_fee: fee,
        }
    }

    fn key_sets_agree(state: &CartState) -> bool {
        let selected: BTreeSet<&str> = state.selected_ids().iter().map(String::as_str).collect();
        let quantities: BTreeSet<&str> =
            state.quantities().keys().map(String::as_str).collect();
        let items: BTreeSet<&str> = state.lines().iter().map(|l| l.id.as_str()).collect();
        selected.len() == state.selected_ids().len()
            && selected == quantities
            && quantities == items
    }

    #[test]
    fn select_and_deselect_keep_the_three_sequences_aligned() {
        let milk = row("Milk", "BigBasket", 56.0, 20.0);
        let bread = row("Bread", "BigBasket", 25.0, 20.0);
        let mut state = CartState::default();

        let pending = state.select(&milk);
        assert_eq!(pending.request.qty, 1);
        assert_eq!(pending.request.item_name, "milk");
        assert!(key_sets_agree(&state));

        state.select(&bread);
        assert!(key_sets_agree(&state));
        assert_eq!(state.item_count(), 2);

        let pending = state.deselect(&milk);
        assert_eq!(pending.request.qty, 0);
        assert!(key_sets_agree(&state));
        assert_eq!(state.selected_ids(), ["bread-BigBasket"]);

        // selecting the same row twice bumps the quantity instead of duplicating
        state.select(&bread);
        assert!(key_sets_agree(&state));
        assert_eq!(state.qty("bread-BigBasket"), 2);
        assert_eq!(state.lines().len(), 1);
    }

    #[test]
    fn decrement_to_zero_removes_from_all_sequences_atomically() {
        let milk = row("Milk", "BigBasket", 56.0, 20.0);
        let mut state = CartState::default();
        state.select(&milk);

        let pending = state.decrement("milk-BigBasket").unwrap();
        assert_eq!(pending.request.qty, 0);
        assert!(state.is_empty());
        assert!(state.selected_ids().is_empty());
        assert!(state.quantities().is_empty());
        assert!(key_sets_agree(&state));

        // decrementing an absent id is a no-op with no request to fire
        assert!(state.decrement("milk-BigBasket").is_none());
    }

    #[test]
    fn delivery_is_one_fee_per_platform_first_seen_wins() {
        let mut state = CartState::default();
        // same platform, two different fees on the rows: the first one counts
        state.select(&row("Milk", "BigBasket", 56.0, 20.0));
        state.select(&row("Bread", "BigBasket", 25.0, 30.0));
        state.select(&row("Eggs", "Instamart", 84.0, 15.0));

        assert_eq!(state.local_delivery(), 35.0); // 20 (not 50) + 15
        assert_eq!(state.local_subtotal(), 165.0);
    }

    #[test]
    fn milk_and_bread_from_one_platform_charge_the_fee_once() {
        let mut state = CartState::default();
        state.select(&row("Milk", "BigBasket", 56.0, 20.0));
        state.select(&row("Bread", "BigBasket", 25.0, 20.0));

        let totals = state.displayed_totals();
        assert_eq!(totals.subtotal, 81.0);
        assert_eq!(totals.delivery, 20.0);
    }

    #[test]
    fn increment_updates_subtotal_before_any_response_arrives() {
        let milk = row("Milk", "BigBasket", 56.0, 20.0);
        let mut state = CartState::default();
        state.select(&milk);

        let first = state.increment("milk-BigBasket").unwrap();
        let second = state.increment("milk-BigBasket").unwrap();
        assert_eq!(first.request.qty, 2);
        assert_eq!(second.request.qty, 3);
        assert!(second.seq > first.seq);

        // local subtotal reflects qty 3 with nothing applied from the backend
        assert_eq!(state.qty("milk-BigBasket"), 3);
        assert_eq!(state.displayed_totals().subtotal, 3.0 * 56.0);
    }

    #[test]
    fn stale_response_totals_can_overwrite_newer_ones() {
        // Known race: responses are applied in arrival order, so totals can
        // transiently regress. The seq numbers on PendingUpsert are the hook
        // for discarding stale responses; the local quantity is unaffected
        // either way.
        let milk = row("Milk", "BigBasket", 56.0, 20.0);
        let mut state = CartState::default();
        state.select(&milk);
        state.increment("milk-BigBasket").unwrap();

        let newer = CartResponse {
            subtotal: 112.0,
            delivery: 20.0,
            ..CartResponse::default()
        };
        let stale = CartResponse {
            subtotal: 56.0,
            delivery: 20.0,
            ..CartResponse::default()
        };
        state.apply_totals(&newer);
        state.apply_totals(&stale);

        assert_eq!(state.displayed_totals().subtotal, 56.0);
        assert_eq!(state.qty("milk-BigBasket"), 2);
    }

    #[test]
    fn failed_mutations_leave_optimistic_state_in_place() {
        // No rollback path exists: a failed upsert simply never patches
        // totals, and the locally applied quantity stands.
        let milk = row("Milk", "BigBasket", 56.0, 20.0);
        let mut state = CartState::default();
        state.select(&milk);
        state.increment("milk-BigBasket").unwrap();
        assert_eq!(state.qty("milk-BigBasket"), 2);
        assert_eq!(state.displayed_totals().subtotal, 112.0);
    }

    fn backend_cart() -> CartResponse {
        CartResponse {
            items: vec![
                CartLineDto {
                    id: "srv-1".to_string(),
                    provider: "BigBasket".to_string(),
                    item_name: "Milk".to_string(),
                    unit_price: Some(56.0),
                    qty: 2,
                },
                CartLineDto {
                    id: "srv-2".to_string(),
                    provider: "Instamart".to_string(),
                    item_name: "Rice".to_string(),
                    unit_price: Some(60.0),
                    qty: 1,
                },
            ],
            subtotal: 172.0,
            delivery: 35.0,
            total: 207.0,
        }
    }

    #[test]
    fn non_empty_backend_cart_wins_over_any_snapshot() {
        let saved: BTreeMap<String, u32> =
            [("bread-BigBasket".to_string(), 4)].into_iter().collect();
        let rows = vec![row("Bread", "BigBasket", 25.0, 20.0)];

        let (state, outcome) = CartState::hydrate(Ok(backend_cart()), &saved, &rows);
        assert_eq!(outcome, HydrationOutcome::BackendAuthoritative);
        assert!(key_sets_agree(&state));
        assert_eq!(
            state.selected_ids(),
            ["milk-BigBasket", "rice-Instamart"]
        );
        assert_eq!(state.qty("milk-BigBasket"), 2);
        assert_eq!(state.qty("bread-BigBasket"), 0);
        assert_eq!(state.displayed_totals().subtotal, 172.0);
        assert_eq!(state.displayed_totals().delivery, 35.0);
    }

    #[test]
    fn empty_backend_cart_clears_a_non_empty_snapshot() {
        let saved: BTreeMap<String, u32> =
            [("bread-BigBasket".to_string(), 4)].into_iter().collect();
        let rows = vec![row("Bread", "BigBasket", 25.0, 20.0)];

        let (state, outcome) =
            CartState::hydrate(Ok(CartResponse::default()), &saved, &rows);
        assert_eq!(outcome, HydrationOutcome::BackendEmpty);
        assert!(state.is_empty());
        assert!(state.selected_ids().is_empty());
    }

    #[test]
    fn failed_fetch_restores_snapshot_restricted_to_current_rows() {
        let saved: BTreeMap<String, u32> = [
            ("bread-BigBasket".to_string(), 4),
            ("ghee-Amazon Fresh".to_string(), 1),
        ]
        .into_iter()
        .collect();
        // "ghee" is no longer in the comparison result set
        let rows = vec![
            row("Bread", "BigBasket", 25.0, 20.0),
            row("Milk", "BigBasket", 56.0, 20.0),
        ];

        let (state, outcome) = CartState::hydrate(
            Err(ApiError::Transport("connection refused".to_string())),
            &saved,
            &rows,
        );
        assert_eq!(outcome, HydrationOutcome::SnapshotFallback);
        assert!(key_sets_agree(&state));
        assert_eq!(state.selected_ids(), ["bread-BigBasket"]);
        assert_eq!(state.qty("bread-BigBasket"), 4);
        // totals are local until the backend becomes reachable again
        assert_eq!(state.displayed_totals().subtotal, 100.0);
        assert_eq!(state.displayed_totals().delivery, 20.0);
    }

    #[test]
    fn snapshot_reflects_quantities_and_local_totals() {
        let mut state = CartState::default();
        state.select(&row("Milk", "BigBasket", 56.0, 20.0));
        state.increment("milk-BigBasket").unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].quantity, 2);
        assert_eq!(snapshot.subtotal, 112.0);
        assert_eq!(snapshot.delivery, 20.0);
        assert_eq!(snapshot.total, 132.0);
    }

    #[test]
    fn savings_count_discounted_lines_only() {
        let mut discounted = row("Milk", "BigBasket", 56.0, 20.0);
        discounted.original_price = Some(60.0);
        let mut state = CartState::default();
        state.select(&discounted);
        state.select(&row("Bread", "BigBasket", 25.0, 20.0));
        state.increment("milk-BigBasket").unwrap();

        assert_eq!(state.savings(), 8.0);
    }
}
