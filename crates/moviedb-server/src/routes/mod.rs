//! HTTP routes.
//!
//! Every entity is mounted under `/api/<plural>` with the same list, sort,
//! filter, read and write handlers; a few entities add their own endpoints.

mod entity;
mod reports;


use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::routing::{MethodRouter, get};
use axum::{Json, Router};
use moviedb::{
    Actor, Director, Entity, Genre, Model, Movie, Production, QuerySpec, SortRequest,
    StreamingPlatform,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Successful response body: `{ "success": true, ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

/// A single row under `data`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// Unordered report rows.
#[derive(Debug, Serialize)]
pub struct Rows<T> {
    pub count: usize,
    pub data: Vec<T>,
}

fn ok<T: Serialize>(body: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        body,
    })
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(reports::health))
        .nest(
            "/api/movies",
            reports::movie_routes().merge(entity_routes::<Movie>(get(reports::movie_detail))),
        )
        .nest(
            "/api/actors",
            reports::actor_routes().merge(entity_routes::<Actor>(get(entity::get_one::<Actor>))),
        )
        .nest(
            "/api/directors",
            reports::director_routes()
                .merge(entity_routes::<Director>(get(entity::get_one::<Director>))),
        )
        .nest(
            "/api/genres",
            reports::genre_routes().merge(entity_routes::<Genre>(get(entity::get_one::<Genre>))),
        )
        .nest(
            "/api/productions",
            reports::production_routes()
                .merge(entity_routes::<Production>(get(entity::get_one::<Production>))),
        )
        .nest(
            "/api/streaming-platforms",
            reports::streaming_platform_routes().merge(entity_routes::<StreamingPlatform>(get(
                entity::get_one::<StreamingPlatform>,
            ))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The shared per-entity routes. `read_one` serves `GET /{id}`.
fn entity_routes<T: Model>(read_one: MethodRouter<AppState>) -> Router<AppState> {
    Router::new()
        .route("/", get(entity::list_all::<T>).post(entity::create::<T>))
        .route("/sorted", get(entity::sorted::<T>))
        .route("/filter", get(entity::filter::<T>))
        .route("/{id}", read_one.patch(entity::update::<T>))
}

/// Resolve sort parameters, logging when a default was substituted.
fn resolve_sort(entity: Entity, sort: &SortRequest) -> QuerySpec<'static> {
    let spec = sort.resolve(entity.schema());
    if spec.used_fallback() {
        tracing::debug!(
            %entity,
            requested_field = sort.field.as_deref().unwrap_or(""),
            requested_order = sort.order.as_deref().unwrap_or(""),
            sorted_by = spec.order_by_field().name(),
            order = %spec.order_direction(),
            "sort request fell back to defaults"
        );
    }
    spec
}

/// Sort parameters from the query string.
///
/// A query string that does not deserialize (a repeated `sortBy`, say) sorts
/// by the defaults instead of failing the request.
fn sort_params(
    entity: Entity,
    query: Result<Query<SortRequest>, QueryRejection>,
) -> SortRequest {
    match query {
        Ok(Query(sort)) => sort,
        Err(e) => {
            tracing::debug!(
                %entity,
                error = %e.body_text(),
                "unreadable sort parameters; using defaults"
            );
            SortRequest::default()
        }
    }
}

/// Query parameters that must deserialize, mapping axum's rejection to an API error.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(v)| v)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// A single path segment, mapping axum's rejection to an API error.
fn path_text(path: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    path.map(|Path(raw)| raw)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// Parse a path id, mapping axum's rejection to an API error.
fn path_id(path: Result<Path<String>, PathRejection>) -> Result<i32, ApiError> {
    let raw = path_text(path)?;
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid id: {raw}")))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}
