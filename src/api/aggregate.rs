//! Fan-out endpoints merging several backend calls into one response.
//!
//! - GET `/restaurants/{id}/orders` - Every page of a restaurant's orders
//! - GET `/restaurants/{id}/stats` - Dashboard statistics, best effort

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::{ApiError, ResultExt, validate_id};
use super::{ApiState, require_token};
use crate::backend::Backend;

/// Orders requested per backend page.
const ORDERS_PAGE_SIZE: u32 = 50;

/// Hard cap on fetched pages, whatever the backend announces.
const MAX_ORDER_PAGES: u32 = 200;

/// Statistic sections: response key and path below the restaurant.
const STATS_SECTIONS: [(&str, &str); 4] = [
    ("revenue", "stats/revenue"),
    ("orders", "stats/orders"),
    ("popularItems", "stats/popular-items"),
    ("reviews", "reviews/stats"),
];

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/restaurants/{id}/orders", get(all_orders))
        .route("/restaurants/{id}/stats", get(comprehensive_stats))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrdersPage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default = "single_page")]
    total_pages: u32,
}

fn single_page() -> u32 {
    1
}

#[derive(Serialize)]
struct AllOrders {
    data: Vec<Value>,
    total: usize,
}

async fn fetch_orders_page(
    backend: &Backend,
    token: &str,
    restaurant_id: &str,
    page: u32,
) -> Result<OrdersPage, ApiError> {
    let mut url = backend
        .endpoint(&format!("restaurants/{}/orders", restaurant_id))
        .backend_err("Invalid orders endpoint")?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("limit", &ORDERS_PAGE_SIZE.to_string());

    let response = backend
        .http()
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .backend_err("Orders request failed")?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ApiError::unauthorized("Not authenticated"));
    }
    if !status.is_success() {
        return Err(ApiError::backend_error(
            "Orders page unavailable",
            format!("page {} returned {}", page, status),
        ));
    }
    response.json().await.backend_err("Invalid orders page")
}

/// Fetch the first page, then every remaining page in parallel.
/// One failed page fails the whole aggregation.
async fn all_orders(
    State(state): State<ApiState>,
    Path(restaurant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AllOrders>, ApiError> {
    validate_id(&restaurant_id)?;
    let token = require_token(&headers)?;

    let first = fetch_orders_page(&state.backend, &token, &restaurant_id, 1).await?;
    let total_pages = first.total_pages.min(MAX_ORDER_PAGES);
    if first.total_pages > MAX_ORDER_PAGES {
        warn!(
            announced = first.total_pages,
            fetched = MAX_ORDER_PAGES,
            "Truncating order pagination"
        );
    }

    let rest = join_all(
        (2..=total_pages)
            .map(|page| fetch_orders_page(&state.backend, &token, &restaurant_id, page)),
    )
    .await;

    let mut data = first.data;
    for page in rest {
        data.extend(page?.data);
    }

    debug!(restaurant = %restaurant_id, pages = total_pages, orders = data.len(), "Orders aggregated");
    Ok(Json(AllOrders {
        total: data.len(),
        data,
    }))
}

/// One statistics section, or `None` when the backend call fails.
async fn fetch_section(
    backend: &Backend,
    token: &str,
    restaurant_id: &str,
    path: &str,
) -> Option<Value> {
    let url = backend
        .endpoint(&format!("restaurants/{}/{}", restaurant_id, path))
        .ok()?;
    let result = async {
        let response = backend
            .http()
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok::<Value, reqwest::Error>(response.json().await?)
    }
    .await;

    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(section = path, error = %e, "Statistics section unavailable");
            None
        }
    }
}

/// Fetch every statistics section in parallel; failed sections become `null`.
async fn comprehensive_stats(
    State(state): State<ApiState>,
    Path(restaurant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    validate_id(&restaurant_id)?;
    let token = require_token(&headers)?;

    let sections = join_all(
        STATS_SECTIONS
            .iter()
            .map(|(_, path)| fetch_section(&state.backend, &token, &restaurant_id, path)),
    )
    .await;

    let merged: Map<String, Value> = STATS_SECTIONS
        .iter()
        .zip(sections)
        .map(|((key, _), value)| (key.to_string(), value.unwrap_or(Value::Null)))
        .collect();
    Ok(Json(Value::Object(merged)))
}
