//! The wasm-bindgen entry point: one `Storefront` per page, owning the
//! comparison rows and cart state behind `RefCell`s. Every remote call is a
//! suspension point, so borrows are always dropped before an `.await`; the
//! optimistic update and the snapshot write happen before the request is
//! fired, and authoritative totals are patched in when (and if) the
//! response lands.

use std::cell::RefCell;
use std::sync::LazyLock;

use grocery_utils::ComparisonRow;
use wasm_bindgen::prelude::*;

use crate::api;
use crate::auth_notice;
use crate::cart::{CartState, CartView, HydrationOutcome, PendingUpsert};
use crate::comparison::rows_from_response;
use crate::notices::{Notice, parse_add_notices};
use crate::snapshot::{BrowserScope, SnapshotStore};
use crate::utils;

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct CartBadge {
    pub item_count: u32,
    pub total: f64,
}

#[wasm_bindgen]
pub struct Storefront {
    // btw, we should never hold a borrow across an .await. by avoiding this,
    // we guarantee the absence of "borrow while locked" panics
    cart: RefCell<CartState>,
    rows: RefCell<Vec<ComparisonRow>>,
    snapshots: SnapshotStore<BrowserScope>,
    // the identity SDK writes its keys into the durable scope; we only read
    auth_scope: BrowserScope,
}

#[wasm_bindgen]
impl Storefront {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Storefront {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        Storefront {
            cart: RefCell::new(CartState::default()),
            rows: RefCell::new(Vec::new()),
            snapshots: SnapshotStore::new(BrowserScope::durable(), BrowserScope::session()),
            auth_scope: BrowserScope::durable(),
        }
    }

    fn token(&self) -> Option<String> {
        auth_notice::session_token(&self.auth_scope)
    }

    /// Fetch prices for a comma-separated grocery list and keep the rows for
    /// later reconciliation. This is the one call whose failure the UI shows
    /// inline, so the error is surfaced instead of swallowed.
    pub async fn load_comparison(&self, query: String) -> Result<Vec<ComparisonRow>, JsValue> {
        let price_query = api::price_query_from_text(&query);
        if price_query.items.is_empty() {
            self.rows.borrow_mut().clear();
            return Ok(Vec::new());
        }
        let token = self.token();
        let response = api::lookup_prices(&price_query, token.as_deref())
            .await
            .map_err(|e| JsValue::from_str(&format!("Failed to fetch prices: {e}")))?;

        let rows = rows_from_response(&response);
        *self.rows.borrow_mut() = rows.clone();
        Ok(rows)
    }

    /// Reconcile the cart against the authoritative fetch: a non-empty
    /// backend cart wins and overwrites the snapshot, an empty one clears
    /// everything, and an unreachable backend falls back to the snapshot
    /// restricted to rows currently on the page.
    pub async fn hydrate_cart(&self) -> Result<CartView, JsValue> {
        let token = self.token();
        let fetch = api::get_cart(token.as_deref()).await;

        let saved_selection = self.snapshots.load_selection();
        let (state, outcome) = {
            let rows = self.rows.borrow();
            CartState::hydrate(fetch, &saved_selection, &rows)
        };
        match outcome {
            HydrationOutcome::BackendAuthoritative => self.snapshots.save(&state.snapshot()),
            HydrationOutcome::BackendEmpty => self.snapshots.clear(),
            HydrationOutcome::SnapshotFallback => {}
        }
        *self.cart.borrow_mut() = state;
        Ok(self.cart.borrow().view())
    }

    /// Checkbox toggled on a comparison row. The visible cart changes and
    /// the snapshot is written before the upsert is fired; the response only
    /// patches totals.
    pub async fn toggle_item(&self, row_id: String, checked: bool) -> Result<CartView, JsValue> {
        let row = self
            .rows
            .borrow()
            .iter()
            .find(|row| row.id == row_id)
            .cloned();
        let Some(row) = row else {
            log::warn!("toggled unknown row {row_id}");
            return Ok(self.cart.borrow().view());
        };

        let pending = {
            let mut cart = self.cart.borrow_mut();
            if checked {
                cart.select(&row)
            } else {
                cart.deselect(&row)
            }
        };
        self.persist();
        self.fire(pending).await;
        Ok(self.cart.borrow().view())
    }

    pub async fn increment_item(&self, row_id: String) -> Result<CartView, JsValue> {
        let pending = self.cart.borrow_mut().increment(&row_id);
        self.persist();
        if let Some(pending) = pending {
            self.fire(pending).await;
        }
        Ok(self.cart.borrow().view())
    }

    /// Decrementing to 0 removes the line from every client-held sequence
    /// immediately, not when the network call resolves.
    pub async fn decrement_item(&self, row_id: String) -> Result<CartView, JsValue> {
        let pending = self.cart.borrow_mut().decrement(&row_id);
        self.persist();
        if let Some(pending) = pending {
            self.fire(pending).await;
        }
        Ok(self.cart.borrow().view())
    }

    /// Hand free text to the backend parser and report each outcome as its
    /// own notice: added items, unavailable items, unavailable platforms.
    pub async fn parse_and_add(&self, text: String) -> Result<Vec<Notice>, JsValue> {
        let token = self.token();
        let outcome = api::parse_and_add(&text, token.as_deref())
            .await
            .map_err(|e| JsValue::from_str(&format!("Request error: {e}")))?;
        Ok(parse_add_notices(&outcome))
    }

    /// Delete a line by the backend's own id and rebuild from the response.
    pub async fn remove_line(&self, backend_line_id: String) -> Result<CartView, JsValue> {
        let token = self.token();
        match api::remove_line(&backend_line_id, token.as_deref()).await {
            Ok(cart) => {
                let state = CartState::from_backend(&cart);
                if state.is_empty() {
                    self.snapshots.clear();
                } else {
                    self.snapshots.save(&state.snapshot());
                }
                *self.cart.borrow_mut() = state;
            }
            Err(err) => log::warn!("remove_line failed: {err}"),
        }
        Ok(self.cart.borrow().view())
    }

    pub async fn clear_cart(&self) -> Result<CartView, JsValue> {
        let token = self.token();
        match api::clear_cart(token.as_deref()).await {
            Ok(_) => {
                *self.cart.borrow_mut() = CartState::default();
                self.snapshots.clear();
            }
            Err(err) => log::warn!("clear_cart failed: {err}"),
        }
        Ok(self.cart.borrow().view())
    }

    /// Item count and total for the header badge, straight from the
    /// authoritative cart; zeros when the backend is unreachable.
    pub async fn cart_badge(&self) -> Result<CartBadge, JsValue> {
        let token = self.token();
        let badge = match api::get_cart(token.as_deref()).await {
            Ok(cart) => CartBadge {
                item_count: cart.items.iter().map(|line| line.qty.max(1)).sum(),
                total: cart.total,
            },
            Err(err) => {
                log::debug!("cart badge refresh failed: {err}");
                CartBadge {
                    item_count: 0,
                    total: 0.0,
                }
            }
        };
        Ok(badge)
    }

    pub fn cart_view(&self) -> CartView {
        self.cart.borrow().view()
    }

    /// One pass of the session watcher (see `auth_notice`): at most one
    /// notice per flagged identity-SDK event.
    pub fn poll_auth(&self, sdk_user_id: Option<String>) -> Option<Notice> {
        auth_notice::poll(&self.auth_scope, sdk_user_id.as_deref())
    }

    fn persist(&self) {
        let snapshot = self.cart.borrow().snapshot();
        self.snapshots.save(&snapshot);
    }

    /// Fire an upsert and patch totals from the response. Failures are
    /// logged and swallowed; the optimistic state is never rolled back, so
    /// local and backend can drift until the next full reconciliation.
    async fn fire(&self, pending: PendingUpsert) {
        let token = self.token();
        match api::upsert_line(&pending.request, token.as_deref()).await {
            Ok(cart) => self.cart.borrow_mut().apply_totals(&cart),
            Err(err) => log::warn!(
                "upsert for {} (qty {}) failed: {err}",
                pending.request.item_name,
                pending.request.qty
            ),
        }
    }
}

impl Default for Storefront {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
