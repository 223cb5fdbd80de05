#![deny(clippy::string_slice)]

//! Browser client for the grocery price-comparison app. The views live in
//! JS; this crate owns the parts with invariants: the cart reconciler, the
//! snapshot store, and the HTTP client for the pricing/cart backend.

pub mod api;
pub mod auth_notice;
pub mod cart;
pub mod comparison;
pub mod notices;
pub mod snapshot;
#[cfg(target_arch = "wasm32")]
mod storefront;
mod utils;

pub use cart::{CartLine, CartState, CartView, HydrationOutcome, PendingUpsert, Totals};
pub use notices::{Notice, NoticeKind};
pub use snapshot::{CartSnapshot, SnapshotItem, SnapshotStore, StorageScope};
#[cfg(target_arch = "wasm32")]
pub use storefront::{CartBadge, Storefront, get_app_version};
