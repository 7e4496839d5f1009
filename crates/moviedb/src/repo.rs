//! Typed read and write operations over any [`GenericClient`].

use crate::catalog::{DIRECTORS_BY_BIRTH_YEAR, MOVIES_BY_GENRE};
use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::model::{
    Actor, Director, Genre, GenreMovie, GenreMovieCount, Model, Movie, MovieDetail,
    ProductionMovieStats, StreamingPlatform, StreamingPlatformAnalytics,
};
use crate::mutation::{Payload, insert_statement, update_statement};
use crate::query::{QuerySpec, SortDir};
use crate::row::FromRow;
use crate::schema::FilterMode;
use crate::sql::{Sql, sql};
use crate::statement::StatementTemplate;
use serde::Serialize;

/// Rows plus the ordering and filter that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing<T> {
    pub count: usize,
    pub sorted_by: String,
    pub order: SortDir,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterMeta>,
    pub data: Vec<T>,
}

/// The filter applied to a [`Listing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterMeta {
    pub field: String,
    pub mode: FilterMode,
}

impl<T> Listing<T> {
    fn new(spec: &QuerySpec<'_>, data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            sorted_by: spec.order_by_field().name().to_string(),
            order: spec.order_direction(),
            filter: spec.filter().map(|f| FilterMeta {
                field: f.field().name().to_string(),
                mode: f.mode(),
            }),
            data,
        }
    }
}

async fn fetch_listing<T: FromRow>(
    conn: &impl GenericClient,
    template: StatementTemplate,
    spec: &QuerySpec<'_>,
) -> DbResult<Listing<T>> {
    let q = template.render(spec)?;
    let rows = q.fetch_all_as(conn).await?;
    Ok(Listing::new(spec, rows))
}

/// Rows of `T` ordered and filtered by `spec`.
///
/// `spec` must be built from `T::ENTITY`'s schema.
pub async fn list<T: Model>(conn: &impl GenericClient, spec: &QuerySpec<'_>) -> DbResult<Listing<T>> {
    fetch_listing(conn, T::ENTITY.select(), spec).await
}

/// All rows of `T` in default order.
pub async fn list_all<T: Model>(conn: &impl GenericClient) -> DbResult<Listing<T>> {
    list(conn, &QuerySpec::default_for(T::ENTITY.schema())).await
}

/// One row of `T` by primary key.
///
/// # Errors
/// [`DbError::NotFound`] if no row has that id.
pub async fn get<T: Model>(conn: &impl GenericClient, id: i32) -> DbResult<T> {
    let entity = T::ENTITY;
    let q = entity.select().render_by_id(entity.schema(), id)?;
    q.fetch_opt_as(conn)
        .await?
        .ok_or_else(|| DbError::not_found(format!("{entity} {id} not found")))
}

/// Insert a row from `payload` and return it as stored.
pub async fn create<T: Model>(conn: &impl GenericClient, payload: &Payload) -> DbResult<T> {
    let q = insert_statement(T::ENTITY.schema(), payload)?;
    insert(conn, &q).await
}

/// Run a statement from [`insert_statement`] and read the new row back.
pub async fn insert<T: Model>(conn: &impl GenericClient, statement: &Sql) -> DbResult<T> {
    let id: i32 = statement.fetch_scalar_one(conn).await?;
    get(conn, id).await
}

/// Update the supplied columns of row `id` and return it as stored.
///
/// # Errors
/// [`DbError::NotFound`] if no row has that id.
pub async fn update<T: Model>(conn: &impl GenericClient, id: i32, payload: &Payload) -> DbResult<T> {
    let q = update_statement(T::ENTITY.schema(), id, payload)?;
    apply_update(conn, id, &q).await
}

/// Run a statement from [`update_statement`] for row `id` and read it back.
pub async fn apply_update<T: Model>(
    conn: &impl GenericClient,
    id: i32,
    statement: &Sql,
) -> DbResult<T> {
    if statement.fetch_opt(conn).await?.is_none() {
        let entity = T::ENTITY;
        return Err(DbError::not_found(format!("{entity} {id} not found")));
    }
    get(conn, id).await
}

// ==================== Movie reports ====================

/// A movie with its actors, genres and streaming platforms.
pub async fn movie_detail(conn: &impl GenericClient, id: i32) -> DbResult<MovieDetail> {
    let movie: Movie = get(conn, id).await?;
    let actors: Vec<Actor> = linked(
        "SELECT a.actor_id, a.actor_name, a.actor_birth_year, a.actor_nationality \
         FROM actor a JOIN movie_actor ma ON ma.actor_id = a.actor_id \
         WHERE ma.movie_id = ",
        id,
        " ORDER BY a.actor_name ASC, a.actor_id",
    )
    .fetch_all_as(conn)
    .await?;
    let genres: Vec<Genre> = linked(
        "SELECT g.genre_id, g.genre_name, g.genre_description \
         FROM genre g JOIN movie_genre mg ON mg.genre_id = g.genre_id \
         WHERE mg.movie_id = ",
        id,
        " ORDER BY g.genre_name ASC, g.genre_id",
    )
    .fetch_all_as(conn)
    .await?;
    let streaming_platforms: Vec<StreamingPlatform> = linked(
        "SELECT sp.streaming_platform_id, sp.streaming_platform_name, \
         sp.streaming_platform_launch_year, sp.streaming_platform_subscription_cost \
         FROM streaming_platform sp \
         JOIN movie_streaming_platform msp ON msp.streaming_platform_id = sp.streaming_platform_id \
         WHERE msp.movie_id = ",
        id,
        " ORDER BY sp.streaming_platform_name ASC, sp.streaming_platform_id",
    )
    .fetch_all_as(conn)
    .await?;

    Ok(MovieDetail {
        movie,
        actors,
        genres,
        streaming_platforms,
    })
}

fn linked(head: &str, id: i32, tail: &str) -> Sql {
    let mut q = sql(head);
    q.push_bind(id).push(tail);
    q
}

/// Movies in genres matched by `spec`'s filter, with their actor counts.
///
/// `spec` orders by a movie field and filters on a genre field.
pub async fn movies_by_genre(
    conn: &impl GenericClient,
    spec: &QuerySpec<'_>,
) -> DbResult<Listing<GenreMovie>> {
    fetch_listing(conn, MOVIES_BY_GENRE, spec).await
}

/// Directors matched by `spec`'s birth-year filter, ties broken by name.
pub async fn directors_by_birth_year(
    conn: &impl GenericClient,
    spec: &QuerySpec<'_>,
) -> DbResult<Listing<Director>> {
    fetch_listing(conn, DIRECTORS_BY_BIRTH_YEAR, spec).await
}

// ==================== Aggregates ====================

/// Genres with the number of movies in each, busiest first.
pub async fn genres_with_movie_count(conn: &impl GenericClient) -> DbResult<Vec<GenreMovieCount>> {
    sql("SELECT g.genre_id, g.genre_name, g.genre_description, \
         COUNT(mg.movie_id) AS movie_count \
         FROM genre g LEFT JOIN movie_genre mg ON mg.genre_id = g.genre_id \
         GROUP BY g.genre_id \
         ORDER BY movie_count DESC, g.genre_name ASC, g.genre_id")
    .fetch_all_as(conn)
    .await
}

/// Productions with movie count and release-year span.
pub async fn productions_with_movie_stats(
    conn: &impl GenericClient,
) -> DbResult<Vec<ProductionMovieStats>> {
    sql("SELECT p.production_id, p.production_name, p.production_founded_year, \
         p.production_headquarters, COUNT(m.movie_id) AS movie_count, \
         MAX(m.movie_release_year) AS latest_movie_year, \
         MIN(m.movie_release_year) AS earliest_movie_year \
         FROM production p LEFT JOIN movie m ON m.production_id = p.production_id \
         GROUP BY p.production_id \
         ORDER BY movie_count DESC, p.production_name ASC, p.production_id")
    .fetch_all_as(conn)
    .await
}

/// Release year from which a movie counts as recent in platform analytics.
pub const RECENT_RELEASE_YEAR: i32 = 2020;

/// Streaming platforms with movie count, average rating and recent releases.
pub async fn streaming_platforms_with_analytics(
    conn: &impl GenericClient,
) -> DbResult<Vec<StreamingPlatformAnalytics>> {
    let mut q = sql(
        "SELECT sp.streaming_platform_id, sp.streaming_platform_name, \
         sp.streaming_platform_launch_year, sp.streaming_platform_subscription_cost, \
         COUNT(msp.movie_id) AS movie_count, \
         ROUND(AVG(m.movie_rating), 2) AS avg_movie_rating, \
         COUNT(*) FILTER (WHERE m.movie_release_year >= ",
    );
    q.push_bind(RECENT_RELEASE_YEAR).push(
        ") AS recent_movies_count \
         FROM streaming_platform sp \
         LEFT JOIN movie_streaming_platform msp \
         ON msp.streaming_platform_id = sp.streaming_platform_id \
         LEFT JOIN movie m ON m.movie_id = msp.movie_id \
         GROUP BY sp.streaming_platform_id \
         ORDER BY movie_count DESC, sp.streaming_platform_name ASC, sp.streaming_platform_id",
    );
    q.fetch_all_as(conn).await
}
