//! Configuration API.
//!
//! CRUD over event types, functions and subscriptions, scoped by space.
//! Every write goes through the catalog, which republishes the routing table.

pub mod auth;
pub mod error;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::catalog::Catalog;

pub use error::ApiError;

pub fn setup_config_router(catalog: Arc<Catalog>, api_key: Option<String>) -> Router {
    let api_key: Option<Arc<str>> = api_key.map(Arc::from);

    Router::new()
        .route("/v1/status", get(get_status))
        .route(
            "/v1/spaces/{space}/eventtypes",
            get(list_event_types).post(create_event_type),
        )
        .route(
            "/v1/spaces/{space}/eventtypes/{name}",
            get(get_event_type).delete(delete_event_type),
        )
        .route(
            "/v1/spaces/{space}/functions",
            get(list_functions).post(register_function),
        )
        .route(
            "/v1/spaces/{space}/functions/{id}",
            get(get_function).put(update_function).delete(delete_function),
        )
        .route(
            "/v1/spaces/{space}/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/v1/spaces/{space}/subscriptions/{id}",
            get(get_subscription).put(update_subscription).delete(delete_subscription),
        )
        .layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
        .with_state(catalog)
}
