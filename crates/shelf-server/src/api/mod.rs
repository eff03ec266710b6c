//! Catalog HTTP surface.
//!
//! - `GET    /get/products`                        — list all, variations resolved
//! - `POST   /create/product`                      — create product (+ embedded variations)
//! - `PUT    /update/product`                      — sparse update, id in body
//! - `DELETE /delete/product/{id}`                 — delete product + cascade
//! - `GET    /get/product/{id}`                    — fetch one, variations resolved
//! - `GET    /get/variations/{productId}`          — list variations by back-reference
//! - `POST   /add/variation/{productId}`           — add variation to product
//! - `PUT    /update/variation/{variationId}`      — sparse variation update
//! - `DELETE /delete/variation/{variationId}`      — delete variation, detach from owner
//! - `GET    /get/productcolors/{color}`           — search variations by color substring
//! - `GET    /get/category/{category}`             — active products by category
//! - `GET    /get/featured`                        — featured + active products
//! - `GET    /get/filtered`                        — filtered/paginated product search
//! - `PUT    /update/stock`                        — set stock for one variation+size pair

mod products;
mod variations;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(10).clamp(1, 100)
}

pub(super) fn map_db_error(request_id: String, error: &shelf_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Map [`shelf_db::DbError::NotFound`] to a descriptive 404; everything else
/// stays a 500.
pub(super) fn map_not_found(
    request_id: &str,
    error: shelf_db::DbError,
    message: impl Into<String>,
) -> ApiError {
    match error {
        shelf_db::DbError::NotFound => ApiError::new(request_id, "not_found", message),
        other => map_db_error(request_id.to_owned(), &other),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/get/products", get(products::list_products))
        .route("/create/product", post(products::create_product))
        .route("/update/product", put(products::update_product))
        .route("/delete/product/{id}", delete(products::delete_product))
        .route("/get/product/{id}", get(products::get_product))
        .route(
            "/get/variations/{product_id}",
            get(variations::list_product_variations),
        )
        .route(
            "/add/variation/{product_id}",
            post(variations::add_variation),
        )
        .route(
            "/update/variation/{variation_id}",
            put(variations::update_variation),
        )
        .route(
            "/delete/variation/{variation_id}",
            delete(variations::delete_variation),
        )
        .route(
            "/get/productcolors/{color}",
            get(variations::search_by_color),
        )
        .route("/get/category/{category}", get(products::list_by_category))
        .route("/get/featured", get(products::list_featured))
        .route("/get/filtered", get(products::list_filtered))
        .route("/update/stock", put(variations::update_stock))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match shelf_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    // -------------------------------------------------------------------------
    // Unit tests (no DB)
    // -------------------------------------------------------------------------

    #[test]
    fn normalize_page_clamps_non_positive_values() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(4)), 4);
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 10);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(-5)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 100);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "product 9 not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_unknown_code_maps_to_500() {
        let response = ApiError::new("req-1", "internal_error", "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_meta_serializes_camel_case() {
        let meta = ResponseMeta::new("req-42".to_string());
        let json = serde_json::to_string(&meta).expect("serialize");
        assert!(json.contains("\"requestId\":\"req-42\""), "{json}");
    }

    // -------------------------------------------------------------------------
    // Route integration tests (with DB)
    // -------------------------------------------------------------------------

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json parse")
        };
        (status, json)
    }

    fn product_body(name: &str, price: &str) -> Value {
        json!({
            "name": name,
            "image": format!("{name}.png"),
            "data": {
                "price": price,
                "description": "a product",
                "category": "sneakers",
                "brand": "Acme"
            },
            "basePrice": price,
            "availableSizes": ["S", "M", "L"],
            "tags": ["test"]
        })
    }

    fn variation_body(color: &str) -> Value {
        json!({
            "colorName": color,
            "colorCode": "#112233",
            "variationImages": [format!("{color}-1.png")],
            "mainImage": format!("{color}.png"),
            "stockQuantity": 4,
            "sizeAvailability": [
                {"size": "M", "stock": 1, "priceAdjustment": "1.50"},
                {"size": "L", "stock": 2}
            ]
        })
    }

    async fn create_product_with_variations(app: &Router, name: &str, colors: &[&str]) -> Value {
        let mut body = product_body(name, "10.00");
        body["variations"] = Value::Array(colors.iter().map(|c| variation_body(c)).collect());
        let (status, json) = send(app, Method::POST, "/create/product", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
        json["data"].clone()
    }

    fn variation_ids(product: &Value) -> Vec<i64> {
        product["variations"]
            .as_array()
            .expect("variations array")
            .iter()
            .map(|v| v["id"].as_i64().expect("variation id"))
            .collect()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });
        let (status, json) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["database"], "ok");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_product_orders_refs_and_backfills_owner(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product =
            create_product_with_variations(&app, "Runner", &["Red", "Green", "Blue"]).await;
        let product_id = product["id"].as_i64().expect("product id");
        let colors: Vec<&str> = product["variations"]
            .as_array()
            .expect("variations")
            .iter()
            .map(|v| v["colorName"].as_str().expect("colorName"))
            .collect();
        assert_eq!(
            colors,
            vec!["Red", "Green", "Blue"],
            "variations must resolve in submission order"
        );

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/get/variations/{product_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let listed = json["data"].as_array().expect("data array");
        assert_eq!(listed.len(), 3);
        for variation in listed {
            assert_eq!(
                variation["productId"].as_i64(),
                Some(product_id),
                "back-reference must be backfilled"
            );
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_product_resolves_variations_and_404s_on_unknown(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Slide", &["Black"]).await;
        let product_id = product["id"].as_i64().expect("product id");
        let created_ids = variation_ids(&product);

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/get/product/{product_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(variation_ids(&json["data"]), created_ids);
        assert_eq!(json["data"]["data"]["price"], "10.00");

        let (status, json) = send(&app, Method::GET, "/get/product/999999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn update_product_replaces_variations_with_new_identities(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Boot", &["Tan", "Brown"]).await;
        let product_id = product["id"].as_i64().expect("product id");
        let old_ids = variation_ids(&product);

        // Field-identical payload: the replace must still mint new records.
        let (status, json) = send(
            &app,
            Method::PUT,
            "/update/product",
            Some(json!({
                "id": product_id,
                "variations": [variation_body("Tan"), variation_body("Brown")]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let new_ids = variation_ids(&json["data"]);
        assert_eq!(new_ids.len(), 2, "exactly M new variation records");
        assert!(
            new_ids.iter().all(|id| !old_ids.contains(id)),
            "old identities must not be reused: old={old_ids:?} new={new_ids:?}"
        );

        let (_, listed) = send(
            &app,
            Method::GET,
            &format!("/get/variations/{product_id}"),
            None,
        )
        .await;
        assert_eq!(
            listed["data"].as_array().expect("data array").len(),
            2,
            "old records must be gone"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn update_product_merges_nested_data_field_by_field(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Loafer", &[]).await;
        let product_id = product["id"].as_i64().expect("product id");

        let (status, json) = send(
            &app,
            Method::PUT,
            "/update/product",
            Some(json!({"id": product_id, "data": {"price": "20.00"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let data = &json["data"]["data"];
        assert_eq!(data["price"], "20.00");
        assert_eq!(
            data["description"], "a product",
            "untouched nested field must survive the merge"
        );
        assert_eq!(data["brand"], "Acme");
        assert_eq!(data["category"], "sneakers");

        // Top-level field update leaves the nested object alone entirely.
        let (status, json) = send(
            &app,
            Method::PUT,
            "/update/product",
            Some(json!({"id": product_id, "name": "Loafer II"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Loafer II");
        assert_eq!(json["data"]["data"]["price"], "20.00");

        let (status, json) = send(
            &app,
            Method::PUT,
            "/update/product",
            Some(json!({"id": 999_999, "name": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn delete_product_cascades_to_variations(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Heel", &["Pink", "White"]).await;
        let product_id = product["id"].as_i64().expect("product id");

        let (status, json) = send(
            &app,
            Method::DELETE,
            &format!("/delete/product/{product_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["deleted"], true);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/get/product/{product_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/get/variations/{product_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["data"].as_array().map(Vec::len),
            Some(0),
            "cascade must remove every owned variation"
        );

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/delete/product/{product_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "second delete is a 404");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn add_then_delete_variation_restores_refs(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Sandal", &["Olive"]).await;
        let product_id = product["id"].as_i64().expect("product id");
        let original_ids = variation_ids(&product);

        let (status, json) = send(
            &app,
            Method::POST,
            &format!("/add/variation/{product_id}"),
            Some(variation_body("Navy")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let added_id = json["data"]["id"].as_i64().expect("variation id");
        assert_eq!(json["data"]["productId"].as_i64(), Some(product_id));

        let (_, fetched) = send(
            &app,
            Method::GET,
            &format!("/get/product/{product_id}"),
            None,
        )
        .await;
        let mut expected = original_ids.clone();
        expected.push(added_id);
        assert_eq!(
            variation_ids(&fetched["data"]),
            expected,
            "append must preserve existing refs and order"
        );

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/delete/variation/{added_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, fetched) = send(
            &app,
            Method::GET,
            &format!("/get/product/{product_id}"),
            None,
        )
        .await;
        assert_eq!(
            variation_ids(&fetched["data"]),
            original_ids,
            "refs must return to their prior state"
        );

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/delete/variation/{added_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::POST,
            "/add/variation/999999",
            Some(variation_body("Ghost")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "unknown product is a 404");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn update_variation_is_sparse(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Trainer", &["Grey"]).await;
        let variation_id = variation_ids(&product)[0];

        let (status, json) = send(
            &app,
            Method::PUT,
            &format!("/update/variation/{variation_id}"),
            Some(json!({"stockQuantity": 9})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["stockQuantity"], 9);
        assert_eq!(json["data"]["colorName"], "Grey", "omitted fields keep their values");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/update/variation/999999",
            Some(json!({"stockQuantity": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn update_stock_changes_only_the_matching_size_entry(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Court", &["Violet"]).await;
        let variation_id = variation_ids(&product)[0];

        let (status, json) = send(
            &app,
            Method::PUT,
            "/update/stock",
            Some(json!({"variationId": variation_id, "size": "M", "newStock": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let sizes = json["data"]["sizeAvailability"]
            .as_array()
            .expect("sizeAvailability array");
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0]["size"], "M");
        assert_eq!(sizes[0]["stock"], 5, "targeted entry updated");
        assert_eq!(
            sizes[0]["priceAdjustment"], "1.50",
            "other fields of the entry untouched"
        );
        assert_eq!(sizes[1]["size"], "L");
        assert_eq!(sizes[1]["stock"], 2, "other entries untouched");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/update/stock",
            Some(json!({"variationId": variation_id, "size": "XXL", "newStock": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "unknown size is a 404");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/update/stock",
            Some(json!({"variationId": 999_999, "size": "M", "newStock": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "unknown variation is a 404");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn filtered_search_paginates_within_price_bounds(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        for i in 0..7 {
            let (status, _) = send(
                &app,
                Method::POST,
                "/create/product",
                Some(product_body(&format!("In-{i}"), "25.00")),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }
        let (status, _) = send(
            &app,
            Method::POST,
            "/create/product",
            Some(product_body("TooCheap", "5.00")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let mut inactive = product_body("Hidden", "25.00");
        inactive["isActive"] = json!(false);
        let (status, _) = send(&app, Method::POST, "/create/product", Some(inactive)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(
            &app,
            Method::GET,
            "/get/filtered?minPrice=10.00&maxPrice=50.00&page=2&limit=5",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let products = json["data"]["products"].as_array().expect("products");
        assert_eq!(products.len(), 2, "7 matches at limit 5 leave 2 on page 2");
        let pagination = &json["data"]["pagination"];
        assert_eq!(pagination["totalProducts"], 7);
        assert_eq!(pagination["totalPages"], 2);
        assert_eq!(pagination["currentPage"], 2);
        assert_eq!(pagination["limit"], 5);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn filtered_search_clamps_non_positive_page_and_limit(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let (status, _) = send(
            &app,
            Method::POST,
            "/create/product",
            Some(product_body("Solo", "12.00")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(
            &app,
            Method::GET,
            "/get/filtered?page=0&limit=-5",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["pagination"]["currentPage"], 1);
        assert_eq!(json["data"]["pagination"]["limit"], 1);
        assert_eq!(json["data"]["products"].as_array().map(Vec::len), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn filtered_search_sorts_by_whitelisted_field(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        for (name, price) in [("Cheap", "10.00"), ("Mid", "20.00"), ("Dear", "30.00")] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/create/product",
                Some(product_body(name, price)),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, json) = send(
            &app,
            Method::GET,
            "/get/filtered?sortBy=price&sortOrder=asc",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json["data"]["products"]
            .as_array()
            .expect("products")
            .iter()
            .map(|p| p["name"].as_str().expect("name"))
            .collect();
        assert_eq!(names, vec!["Cheap", "Mid", "Dear"]);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn category_and_featured_listings_cover_only_active_products(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let mut featured = product_body("Star", "15.00");
        featured["isFeatured"] = json!(true);
        let (status, _) = send(&app, Method::POST, "/create/product", Some(featured)).await;
        assert_eq!(status, StatusCode::CREATED);

        let mut hidden = product_body("Dim", "15.00");
        hidden["isFeatured"] = json!(true);
        hidden["isActive"] = json!(false);
        let (status, _) = send(&app, Method::POST, "/create/product", Some(hidden)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(&app, Method::GET, "/get/featured", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json["data"]
            .as_array()
            .expect("data array")
            .iter()
            .map(|p| p["name"].as_str().expect("name"))
            .collect();
        assert_eq!(names, vec!["Star"], "inactive products must be excluded");

        // Substring, case-insensitive category match ("sneakers" seeded by the helper).
        let (status, json) = send(&app, Method::GET, "/get/category/SNEAK", None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = json["data"].as_array().expect("data array");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["name"], "Star");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn color_search_is_case_insensitive_and_resolves_owner(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        let product = create_product_with_variations(&app, "Velvet Run", &[]).await;
        let product_id = product["id"].as_i64().expect("product id");

        let mut red = variation_body("Red Velvet");
        red["isAvailable"] = json!(true);
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/add/variation/{product_id}"),
            Some(red),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut unavailable = variation_body("Redwood");
        unavailable["isAvailable"] = json!(false);
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/add/variation/{product_id}"),
            Some(unavailable),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(&app, Method::GET, "/get/productcolors/RED", None).await;
        assert_eq!(status, StatusCode::OK);
        let hits = json["data"].as_array().expect("data array");
        assert_eq!(hits.len(), 1, "unavailable variations must be excluded");
        assert_eq!(hits[0]["colorName"], "Red Velvet");
        assert_eq!(hits[0]["product"]["id"].as_i64(), Some(product_id));
        assert_eq!(hits[0]["product"]["name"], "Velvet Run");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_products_returns_newest_first(pool: sqlx::PgPool) {
        let app = build_app(AppState { pool });

        for name in ["First", "Second", "Third"] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/create/product",
                Some(product_body(name, "10.00")),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, json) = send(&app, Method::GET, "/get/products", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json["data"]
            .as_array()
            .expect("data array")
            .iter()
            .map(|p| p["name"].as_str().expect("name"))
            .collect();
        assert_eq!(names, vec!["Third", "Second", "First"]);
    }
}
