//! Read-only client for the external store's product API (WooCommerce REST v3).
//!
//! Used only to decorate wishlist items with live price and stock. Every failure is logged and
//! reported as "no data" so the wishlist itself always loads.

use futures::future::join_all;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{collections::HashMap, str::FromStr};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::CommerceConfig;

/// Live product data from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Option<Decimal>,
    pub in_stock: bool,
    pub permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WooProduct {
    name: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    stock_status: String,
    #[serde(default)]
    permalink: Option<String>,
}

impl From<WooProduct> for ProductSnapshot {
    fn from(product: WooProduct) -> Self {
        Self {
            name: product.name,
            // Woo sends "" for products without a price
            price: Decimal::from_str(product.price.trim()).ok(),
            in_stock: matches!(product.stock_status.as_str(), "instock" | "onbackorder"),
            permalink: product.permalink,
        }
    }
}

pub struct CommerceClient {
    client: Client,
    base_url: Url,
    consumer_key: String,
    consumer_secret: String,
}

impl CommerceClient {
    /// `None` when the store is not configured
    pub fn from_config(config: &CommerceConfig) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        let client = Client::builder().timeout(config.timeout).build().ok()?;
        Some(Self {
            client,
            base_url,
            consumer_key: config.consumer_key.clone().unwrap_or_default(),
            consumer_secret: config.consumer_secret.clone().unwrap_or_default(),
        })
    }

    fn product_url(&self, product_id: i64) -> Option<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().extend(["wp-json", "wc", "v3", "products", &product_id.to_string()]);
        Some(url)
    }

    #[instrument(skip(self))]
    pub async fn product(&self, product_id: i64) -> Option<ProductSnapshot> {
        let url = self.product_url(product_id)?;
        let response = match self
            .client
            .get(url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Store request failed: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Store returned an error");
            return None;
        }

        match response.json::<WooProduct>().await {
            Ok(product) => Some(product.into()),
            Err(e) => {
                warn!("Unexpected store response: {e}");
                None
            }
        }
    }

    /// Fetch several products concurrently. Missing entries had no usable data.
    pub async fn products(&self, product_ids: &[i64]) -> HashMap<i64, ProductSnapshot> {
        let fetched = join_all(product_ids.iter().map(|&id| async move { (id, self.product(id).await) })).await;
        let found: HashMap<_, _> = fetched.into_iter().filter_map(|(id, snapshot)| Some((id, snapshot?))).collect();
        debug!(requested = product_ids.len(), found = found.len(), "Fetched store products");
        found
    }
}
