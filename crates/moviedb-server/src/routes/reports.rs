//! Entity-specific endpoints and the health check.

use super::{
    Data, Envelope, Rows, ok, path_id, path_text, query_params, resolve_sort, sort_params,
};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use moviedb::{
    Actor, Director, Entity, FilterInput, GenreMovie, GenreMovieCount, Listing, MovieDetail,
    ProductionMovieStats, QuerySpec, SortRequest, StreamingPlatformAnalytics, build_filter_spec,
    build_sort_spec, repo,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub fn movie_routes() -> Router<AppState> {
    Router::new().route("/genre/{genre}", get(movies_by_genre))
}

pub fn actor_routes() -> Router<AppState> {
    Router::new().route("/nationality/{nationality}", get(actors_by_nationality))
}

pub fn director_routes() -> Router<AppState> {
    Router::new().route("/birth-year-range", get(directors_by_birth_year))
}

pub fn genre_routes() -> Router<AppState> {
    Router::new().route("/with-movie-count", get(genres_with_movie_count))
}

pub fn production_routes() -> Router<AppState> {
    Router::new().route("/with-movie-stats", get(productions_with_movie_stats))
}

pub fn streaming_platform_routes() -> Router<AppState> {
    Router::new().route("/with-analytics", get(streaming_platforms_with_analytics))
}

// ==================== Filtered listings ====================

/// `GET /api/actors/nationality/{nationality}`
pub async fn actors_by_nationality(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<SortRequest>, QueryRejection>,
) -> ApiResult<Json<Envelope<Listing<Actor>>>> {
    let nationality = path_text(path)?;
    let sort = sort_params(Entity::Actor, query);
    let schema = Entity::Actor.schema();
    let filter = build_filter_spec(schema, "actor_nationality", FilterInput::value(&nationality))?;
    let spec = resolve_sort(Entity::Actor, &sort).with_filter(filter);

    let client = state.store.client().await?;
    Ok(ok(repo::list::<Actor>(&client, &spec).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BirthYearRange {
    #[serde(rename = "startYear")]
    pub start_year: Option<String>,
    #[serde(rename = "endYear")]
    pub end_year: Option<String>,
}

impl BirthYearRange {
    /// `"<start> - <end>"` as echoed in the response.
    fn label(&self) -> String {
        format!(
            "{} - {}",
            self.start_year.as_deref().unwrap_or_default(),
            self.end_year.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Serialize)]
pub struct BirthYearListing {
    #[serde(rename = "birthYearRange")]
    pub birth_year_range: String,
    #[serde(flatten)]
    pub listing: Listing<Director>,
}

/// `GET /api/directors/birth-year-range?startYear=&endYear=`
pub async fn directors_by_birth_year(
    State(state): State<AppState>,
    query: Result<Query<BirthYearRange>, QueryRejection>,
) -> ApiResult<Json<Envelope<BirthYearListing>>> {
    let range = query_params(query)?;
    let spec = birth_year_spec(&range)?;

    let client = state.store.client().await?;
    let listing = repo::directors_by_birth_year(&client, &spec).await?;
    Ok(ok(BirthYearListing {
        birth_year_range: range.label(),
        listing,
    }))
}

fn birth_year_spec(range: &BirthYearRange) -> ApiResult<QuerySpec<'static>> {
    let schema = Entity::Director.schema();
    let filter = build_filter_spec(
        schema,
        "director_birth_year",
        FilterInput::range(range.start_year.as_deref(), range.end_year.as_deref()),
    )?;
    Ok(build_sort_spec(schema, Some("director_birth_year"), Some("asc")).with_filter(filter))
}

#[derive(Debug, Serialize)]
pub struct GenreListing {
    pub genre: String,
    #[serde(flatten)]
    pub listing: Listing<GenreMovie>,
}

/// `GET /api/movies/genre/{genre}`: case-insensitive match on the genre name.
pub async fn movies_by_genre(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<SortRequest>, QueryRejection>,
) -> ApiResult<Json<Envelope<GenreListing>>> {
    let genre = path_text(path)?;
    let sort = sort_params(Entity::Movie, query);
    let spec = genre_spec(&genre, &sort)?;

    let client = state.store.client().await?;
    let listing = repo::movies_by_genre(&client, &spec).await?;
    Ok(ok(GenreListing { genre, listing }))
}

fn genre_spec(genre: &str, sort: &SortRequest) -> ApiResult<QuerySpec<'static>> {
    let filter = build_filter_spec(
        Entity::Genre.schema(),
        "genre_name",
        FilterInput::value(genre),
    )?;
    Ok(resolve_sort(Entity::Movie, sort).with_filter(filter))
}

// ==================== Reports ====================

/// `GET /api/movies/{id}`: the movie with its credits and availability.
pub async fn movie_detail(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Envelope<Data<MovieDetail>>>> {
    let id = path_id(path)?;
    let client = state.store.client().await?;
    let data = repo::movie_detail(&client, id).await?;
    Ok(ok(Data { data }))
}

pub async fn genres_with_movie_count(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Rows<GenreMovieCount>>>> {
    let client = state.store.client().await?;
    let data = repo::genres_with_movie_count(&client).await?;
    Ok(ok(Rows {
        count: data.len(),
        data,
    }))
}

pub async fn productions_with_movie_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Rows<ProductionMovieStats>>>> {
    let client = state.store.client().await?;
    let data = repo::productions_with_movie_stats(&client).await?;
    Ok(ok(Rows {
        count: data.len(),
        data,
    }))
}

pub async fn streaming_platforms_with_analytics(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Rows<StreamingPlatformAnalytics>>>> {
    let client = state.store.client().await?;
    let data = repo::streaming_platforms_with_analytics(&client).await?;
    Ok(ok(Rows {
        count: data.len(),
        data,
    }))
}

// ==================== Health ====================

/// `GET /health`: 200 when `SELECT 1` succeeds, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "status": "ok", "database": "connected" })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "status": "degraded", "database": "unavailable" })),
            )
        }
    }
}
