//! Thin HTTP client for the pricing and cart backend.
//!
//! Transport failures, refused statuses and undecodable bodies all collapse
//! into [`ApiError`]: callers get one "remote cart operation failed"
//! condition and are not expected to branch on the cause. No retries.

use grocery_utils::{
    CartResponse, CartUpsertRequest, ParseAddRequest, ParseAddResponse, PriceLookupResponse,
    PriceQuery, PriceQueryItem,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("backend returned status {0}")]
    Status(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

pub(crate) fn api_base() -> &'static str {
    if cfg!(feature = "local-backend") {
        "http://localhost:8000"
    } else {
        "https://grocery-backend.fly.dev"
    }
}

/// Comma-split a free-text grocery list into price query items, the way the
/// search box submits it. Empty segments are dropped.
pub fn price_query_from_text(query: &str) -> PriceQuery {
    PriceQuery {
        items: query
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| PriceQueryItem {
                name: name.to_string(),
                category: "general".to_string(),
            })
            .collect(),
    }
}

fn transport(err: fetch_happen::Error) -> ApiError {
    ApiError::Transport(format!("{err:?}"))
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: fetch_happen::Response,
) -> Result<T, ApiError> {
    if !response.ok() {
        return Err(ApiError::Status(response.status().to_string()));
    }
    response
        .json()
        .await
        .map_err(|err| ApiError::Decode(format!("{err:?}")))
}

fn bearer(token: Option<&str>) -> Option<String> {
    token.map(|token| format!("Bearer {token}"))
}

pub async fn lookup_prices(
    query: &PriceQuery,
    access_token: Option<&str>,
) -> Result<PriceLookupResponse, ApiError> {
    let client = fetch_happen::Client;
    let mut request = client
        .post(format!("{}/grocery/prices", api_base()))
        .json(query)
        .map_err(transport)?;
    if let Some(header) = bearer(access_token) {
        request = request.header("Authorization", header);
    }
    decode(request.send().await.map_err(transport)?).await
}

pub async fn get_cart(access_token: Option<&str>) -> Result<CartResponse, ApiError> {
    let client = fetch_happen::Client;
    let mut request = client.get(format!("{}/grocery/cart", api_base()));
    if let Some(header) = bearer(access_token) {
        request = request.header("Authorization", header);
    }
    decode(request.send().await.map_err(transport)?).await
}

/// Add or update one line. A quantity of 0 removes the line.
pub async fn upsert_line(
    line: &CartUpsertRequest,
    access_token: Option<&str>,
) -> Result<CartResponse, ApiError> {
    let client = fetch_happen::Client;
    let mut request = client
        .post(format!("{}/grocery/cart/items", api_base()))
        .json(line)
        .map_err(transport)?;
    if let Some(header) = bearer(access_token) {
        request = request.header("Authorization", header);
    }
    decode(request.send().await.map_err(transport)?).await
}

/// Delete a line by the backend's own id. This is the only place backend
/// line ids are used; local lookups key on the synthesized identity.
pub async fn remove_line(
    line_id: &str,
    access_token: Option<&str>,
) -> Result<CartResponse, ApiError> {
    let client = fetch_happen::Client;
    let mut request = client.delete(format!("{}/grocery/cart/items/{line_id}", api_base()));
    if let Some(header) = bearer(access_token) {
        request = request.header("Authorization", header);
    }
    decode(request.send().await.map_err(transport)?).await
}

pub async fn clear_cart(access_token: Option<&str>) -> Result<CartResponse, ApiError> {
    let client = fetch_happen::Client;
    let mut request = client.delete(format!("{}/grocery/cart", api_base()));
    if let Some(header) = bearer(access_token) {
        request = request.header("Authorization", header);
    }
    decode(request.send().await.map_err(transport)?).await
}

/// Hand free text ("5 kg of rice and 2 liters of milk from instamart") to
/// the backend parser. Partial fulfillment comes back in the response, not
/// as an error.
pub async fn parse_and_add(
    text: &str,
    access_token: Option<&str>,
) -> Result<ParseAddResponse, ApiError> {
    let client = fetch_happen::Client;
    let mut request = client
        .post(format!("{}/grocery/cart/parse-add", api_base()))
        .json(&ParseAddRequest {
            text: text.to_string(),
        })
        .map_err(transport)?;
    if let Some(header) = bearer(access_token) {
        request = request.header("Authorization", header);
    }
    decode(request.send().await.map_err(transport)?).await
}
