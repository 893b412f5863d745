use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::catalog::{Catalog, CatalogStats, EventTypeDefinition};
use crate::event::EventType;
use crate::function::{Function, FunctionId, Provider};
use crate::observability::metrics;
use crate::subscription::{Subscription, SubscriptionId};

type ApiResult<T> = Result<T, ApiError>;
type Body<T> = Result<Json<T>, JsonRejection>;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub catalog: CatalogStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeList {
    pub event_types: Vec<EventTypeDefinition>,
}

#[derive(Serialize)]
pub struct FunctionList {
    pub functions: Vec<Function>,
}

#[derive(Serialize)]
pub struct SubscriptionList {
    pub subscriptions: Vec<Subscription>,
}

#[derive(Deserialize)]
pub struct CreateEventType {
    pub name: EventType,
}

#[derive(Deserialize)]
pub struct UpdateFunction {
    pub provider: Provider,
}

pub async fn get_status(State(catalog): State<Arc<Catalog>>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        catalog: catalog.stats(),
    })
}

fn report_sizes(catalog: &Catalog) {
    let stats = catalog.stats();
    metrics::record_catalog_size("event_types", stats.event_types);
    metrics::record_catalog_size("functions", stats.functions);
    metrics::record_catalog_size("subscriptions", stats.subscriptions);
}

// --- Event types ---

pub async fn list_event_types(
    State(catalog): State<Arc<Catalog>>,
    Path(space): Path<String>,
) -> Json<EventTypeList> {
    Json(EventTypeList {
        event_types: catalog.list_event_types(&space),
    })
}

pub async fn create_event_type(
    State(catalog): State<Arc<Catalog>>,
    Path(space): Path<String>,
    body: Body<CreateEventType>,
) -> ApiResult<(StatusCode, Json<EventTypeDefinition>)> {
    let Json(req) = body?;
    let created = catalog.create_event_type(EventTypeDefinition { space, name: req.name })?;
    report_sizes(&catalog);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_event_type(
    State(catalog): State<Arc<Catalog>>,
    Path((space, name)): Path<(String, String)>,
) -> ApiResult<Json<EventTypeDefinition>> {
    Ok(Json(catalog.get_event_type(&space, &EventType::new(name))?))
}

pub async fn delete_event_type(
    State(catalog): State<Arc<Catalog>>,
    Path((space, name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    catalog.delete_event_type(&space, &EventType::new(name))?;
    report_sizes(&catalog);
    Ok(StatusCode::NO_CONTENT)
}

// --- Functions ---

pub async fn list_functions(
    State(catalog): State<Arc<Catalog>>,
    Path(space): Path<String>,
) -> Json<FunctionList> {
    Json(FunctionList {
        functions: catalog.list_functions(&space),
    })
}

pub async fn register_function(
    State(catalog): State<Arc<Catalog>>,
    Path(space): Path<String>,
    body: Body<Function>,
) -> ApiResult<(StatusCode, Json<Function>)> {
    let Json(function) = body?;
    let created = catalog.register_function(Function { space, ..function })?;
    report_sizes(&catalog);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_function(
    State(catalog): State<Arc<Catalog>>,
    Path((space, id)): Path<(String, String)>,
) -> ApiResult<Json<Function>> {
    Ok(Json(catalog.get_function(&space, &FunctionId::new(id))?))
}

pub async fn update_function(
    State(catalog): State<Arc<Catalog>>,
    Path((space, id)): Path<(String, String)>,
    body: Body<UpdateFunction>,
) -> ApiResult<Json<Function>> {
    let Json(req) = body?;
    Ok(Json(catalog.update_function(&space, &FunctionId::new(id), req.provider)?))
}

pub async fn delete_function(
    State(catalog): State<Arc<Catalog>>,
    Path((space, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    catalog.delete_function(&space, &FunctionId::new(id))?;
    report_sizes(&catalog);
    Ok(StatusCode::NO_CONTENT)
}

// --- Subscriptions ---

pub async fn list_subscriptions(
    State(catalog): State<Arc<Catalog>>,
    Path(space): Path<String>,
) -> Json<SubscriptionList> {
    Json(SubscriptionList {
        subscriptions: catalog.list_subscriptions(&space),
    })
}

pub async fn create_subscription(
    State(catalog): State<Arc<Catalog>>,
    Path(space): Path<String>,
    body: Body<Subscription>,
) -> ApiResult<(StatusCode, Json<Subscription>)> {
    let Json(sub) = body?;
    let created = catalog.create_subscription(Subscription { space, ..sub })?;
    report_sizes(&catalog);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_subscription(
    State(catalog): State<Arc<Catalog>>,
    Path((space, id)): Path<(String, String)>,
) -> ApiResult<Json<Subscription>> {
    Ok(Json(catalog.get_subscription(&space, &SubscriptionId::new(id))?))
}

pub async fn update_subscription(
    State(catalog): State<Arc<Catalog>>,
    Path((space, id)): Path<(String, String)>,
    body: Body<Subscription>,
) -> ApiResult<Json<Subscription>> {
    let Json(sub) = body?;
    Ok(Json(catalog.update_subscription(&space, &SubscriptionId::new(id), sub)?))
}

pub async fn delete_subscription(
    State(catalog): State<Arc<Catalog>>,
    Path((space, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    catalog.delete_subscription(&space, &SubscriptionId::new(id))?;
    report_sizes(&catalog);
    Ok(StatusCode::NO_CONTENT)
}
