//! Best-effort persistence of the cart across page loads.
//!
//! Two values are kept, always written together: the full cart snapshot
//! (denormalized lines plus locally computed totals, so a reload can render
//! without a backend round trip) and a plain identity → quantity map used
//! to re-select rows on the comparison view. Writes never fail loudly and
//! reads never error; a missing or unparsable value is just the empty
//! snapshot. Staleness is the reconciler's problem, not the store's.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const CART_SNAPSHOT_KEY: &str = "checkout_cart";
pub const SELECTION_KEY: &str = "comparison_cart_selection";

/// One key-value storage scope. The browser gives us two (durable and
/// session-lived); tests get an in-memory one.
pub trait StorageScope {
    fn get(&self, key: &str) -> Option<String>;
    /// Returns false when the write was refused (quota, storage disabled).
    fn set(&self, key: &str, value: &str) -> bool;
    fn remove(&self, key: &str);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotItem {
    pub id: String,
    pub product: String,
    pub platform: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    pub delivery_fee: f64,
    pub quantity: u32,
}

/// The persisted cart. `Default` is the explicit empty sentinel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<SnapshotItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub delivery: f64,
    #[serde(default)]
    pub total: f64,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selection(&self) -> BTreeMap<String, u32> {
        self.items
            .iter()
            .map(|item| (item.id.clone(), item.quantity))
            .collect()
    }
}

pub struct SnapshotStore<S> {
    durable: S,
    session: S,
}

impl<S: StorageScope> SnapshotStore<S> {
    pub fn new(durable: S, session: S) -> Self {
        Self { durable, session }
    }

    /// Persist the snapshot and its selection map. Best-effort: refused
    /// writes are logged and swallowed. The session scope gets a copy of the
    /// full snapshot so the checkout view survives a cleared local store.
    pub fn save(&self, snapshot: &CartSnapshot) {
        let Ok(full) = serde_json::to_string(snapshot) else {
            return;
        };
        if !self.durable.set(CART_SNAPSHOT_KEY, &full) {
            log::debug!("durable cart snapshot write refused");
        }
        self.session.set(CART_SNAPSHOT_KEY, &full);

        if let Ok(selection) = serde_json::to_string(&snapshot.selection())
            && !self.durable.set(SELECTION_KEY, &selection)
        {
            log::debug!("selection map write refused");
        }
    }

    /// Read the snapshot back: durable scope first, session fallback.
    /// Absent or unparsable data is the empty snapshot, never an error.
    pub fn load(&self) -> CartSnapshot {
        let raw = self
            .durable
            .get(CART_SNAPSHOT_KEY)
            .or_else(|| self.session.get(CART_SNAPSHOT_KEY));
        let Some(raw) = raw else {
            return CartSnapshot::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::warn!("discarding unparsable cart snapshot: {err}");
            CartSnapshot::default()
        })
    }

    /// The persisted identity → quantity map, with the same fallback and
    /// empty-on-failure behavior as `load`.
    pub fn load_selection(&self) -> BTreeMap<String, u32> {
        let raw = self
            .durable
            .get(SELECTION_KEY)
            .or_else(|| self.session.get(SELECTION_KEY));
        raw.and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        for scope in [&self.durable, &self.session] {
            scope.remove(CART_SNAPSHOT_KEY);
            scope.remove(SELECTION_KEY);
        }
    }
}

/// In-memory scope for tests and non-browser builds.
#[derive(Debug, Default)]
pub struct MemoryScope {
    values: std::cell::RefCell<BTreeMap<String, String>>,
}

impl StorageScope for MemoryScope {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

/// A browser storage scope. `None` when the browser refuses access to the
/// underlying store (private mode, disabled storage); every operation then
/// degrades to a no-op.
#[cfg(target_arch = "wasm32")]
pub struct BrowserScope {
    storage: Option<web_sys::Storage>,
}

#[cfg(target_arch = "wasm32")]
impl BrowserScope {
    pub fn durable() -> Self {
        Self {
            storage: web_sys::window().and_then(|w| w.local_storage().ok().flatten()),
        }
    }

    pub fn session() -> Self {
        Self {
            storage: web_sys::window().and_then(|w| w.session_storage().ok().flatten()),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl StorageScope for BrowserScope {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.storage
            .as_ref()
            .is_some_and(|storage| storage.set_item(key, value).is_ok())
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = &self.storage {
            let _ = storage.remove_item(key);
        }
    }
}
