//! Handlers shared by every entity.

use super::{
    Data, Envelope, json_body, ok, path_id, query_params, resolve_sort, sort_params,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use moviedb::mutation::{insert_statement, update_statement};
use moviedb::{
    FilterInput, Listing, Model, Payload, QuerySpec, SortRequest, build_filter_spec, repo,
};
use serde::Deserialize;

/// `?field=&value=` or `?field=&low=&high=`, optionally with `sortBy`/`order`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub field: Option<String>,
    pub value: Option<String>,
    pub low: Option<String>,
    pub high: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl FilterParams {
    fn input(&self) -> Result<FilterInput<'_>, ApiError> {
        let ranged = self.low.is_some() || self.high.is_some();
        match (&self.value, ranged) {
            (Some(_), true) => Err(ApiError::bad_request(
                "use either value or low/high, not both",
            )),
            (Some(value), false) => Ok(FilterInput::value(value)),
            (None, true) => Ok(FilterInput::range(
                self.low.as_deref(),
                self.high.as_deref(),
            )),
            (None, false) => Err(ApiError::bad_request(
                "value or low/high query parameter is required",
            )),
        }
    }

    /// Validate into a spec for `T`. Fails before any database access.
    pub fn spec_for<T: Model>(&self) -> ApiResult<QuerySpec<'static>> {
        let Some(field) = self.field.as_deref() else {
            return Err(ApiError::bad_request("field query parameter is required"));
        };
        let entity = T::ENTITY;
        let filter = build_filter_spec(entity.schema(), field, self.input()?)?;
        let sort = SortRequest::new(self.sort_by.as_deref(), self.order.as_deref());
        Ok(resolve_sort(entity, &sort).with_filter(filter))
    }
}

pub async fn list_all<T: Model>(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Listing<T>>>> {
    let client = state.store.client().await?;
    Ok(ok(repo::list_all::<T>(&client).await?))
}

pub async fn sorted<T: Model>(
    State(state): State<AppState>,
    query: Result<Query<SortRequest>, QueryRejection>,
) -> ApiResult<Json<Envelope<Listing<T>>>> {
    let sort = sort_params(T::ENTITY, query);
    let spec = resolve_sort(T::ENTITY, &sort);
    let client = state.store.client().await?;
    Ok(ok(repo::list::<T>(&client, &spec).await?))
}

pub async fn filter<T: Model>(
    State(state): State<AppState>,
    query: Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<Json<Envelope<Listing<T>>>> {
    let params = query_params(query)?;
    let spec = params.spec_for::<T>()?;
    let client = state.store.client().await?;
    Ok(ok(repo::list::<T>(&client, &spec).await?))
}

pub async fn get_one<T: Model>(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Envelope<Data<T>>>> {
    let id = path_id(path)?;
    let client = state.store.client().await?;
    let data = repo::get::<T>(&client, id).await?;
    Ok(ok(Data { data }))
}

pub async fn create<T: Model>(
    State(state): State<AppState>,
    body: Result<Json<Payload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Data<T>>>)> {
    let payload = json_body(body)?;
    let statement = insert_statement(T::ENTITY.schema(), &payload)?;
    let client = state.store.client().await?;
    let data = repo::insert::<T>(&client, &statement).await?;
    tracing::info!(entity = %T::ENTITY, "row created");
    Ok((StatusCode::CREATED, ok(Data { data })))
}

pub async fn update<T: Model>(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<Payload>, JsonRejection>,
) -> ApiResult<Json<Envelope<Data<T>>>> {
    let id = path_id(path)?;
    let payload = json_body(body)?;
    let statement = update_statement(T::ENTITY.schema(), id, &payload)?;
    let client = state.store.client().await?;
    let data = repo::apply_update::<T>(&client, id, &statement).await?;
    tracing::info!(entity = %T::ENTITY, id, "row updated");
    Ok(ok(Data { data }))
}
