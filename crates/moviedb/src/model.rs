//! Row types for the six entities and the report queries.

use crate::catalog::Entity;
use crate::error::DbResult;
use crate::row::{FromRow, RowExt};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_postgres::Row;

/// A row type read through an entity's base select statement.
pub trait Model: FromRow + Serialize + Send + Sync + 'static {
    const ENTITY: Entity;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub movie_id: i32,
    pub movie_title: String,
    pub movie_release_year: Option<i32>,
    pub movie_runtime: Option<i32>,
    pub movie_rating: Option<Decimal>,
    pub director_id: Option<i32>,
    pub production_id: Option<i32>,
    pub director_name: Option<String>,
    pub production_name: Option<String>,
}

impl FromRow for Movie {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            movie_id: row.try_get_column("movie_id")?,
            movie_title: row.try_get_column("movie_title")?,
            movie_release_year: row.try_get_column("movie_release_year")?,
            movie_runtime: row.try_get_column("movie_runtime")?,
            movie_rating: row.try_get_column("movie_rating")?,
            director_id: row.try_get_column("director_id")?,
            production_id: row.try_get_column("production_id")?,
            director_name: row.try_get_column("director_name")?,
            production_name: row.try_get_column("production_name")?,
        })
    }
}

impl Model for Movie {
    const ENTITY: Entity = Entity::Movie;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub actor_id: i32,
    pub actor_name: String,
    pub actor_birth_year: Option<i32>,
    pub actor_nationality: Option<String>,
}

impl FromRow for Actor {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            actor_id: row.try_get_column("actor_id")?,
            actor_name: row.try_get_column("actor_name")?,
            actor_birth_year: row.try_get_column("actor_birth_year")?,
            actor_nationality: row.try_get_column("actor_nationality")?,
        })
    }
}

impl Model for Actor {
    const ENTITY: Entity = Entity::Actor;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Director {
    pub director_id: i32,
    pub director_name: String,
    pub director_birth_year: Option<i32>,
    pub director_nationality: Option<String>,
}

impl FromRow for Director {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            director_id: row.try_get_column("director_id")?,
            director_name: row.try_get_column("director_name")?,
            director_birth_year: row.try_get_column("director_birth_year")?,
            director_nationality: row.try_get_column("director_nationality")?,
        })
    }
}

impl Model for Director {
    const ENTITY: Entity = Entity::Director;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Genre {
    pub genre_id: i32,
    pub genre_name: String,
    pub genre_description: Option<String>,
}

impl FromRow for Genre {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            genre_id: row.try_get_column("genre_id")?,
            genre_name: row.try_get_column("genre_name")?,
            genre_description: row.try_get_column("genre_description")?,
        })
    }
}

impl Model for Genre {
    const ENTITY: Entity = Entity::Genre;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Production {
    pub production_id: i32,
    pub production_name: String,
    pub production_founded_year: Option<i32>,
    pub production_headquarters: Option<String>,
}

impl FromRow for Production {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            production_id: row.try_get_column("production_id")?,
            production_name: row.try_get_column("production_name")?,
            production_founded_year: row.try_get_column("production_founded_year")?,
            production_headquarters: row.try_get_column("production_headquarters")?,
        })
    }
}

impl Model for Production {
    const ENTITY: Entity = Entity::Production;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingPlatform {
    pub streaming_platform_id: i32,
    pub streaming_platform_name: String,
    pub streaming_platform_launch_year: Option<i32>,
    pub streaming_platform_subscription_cost: Option<Decimal>,
}

impl FromRow for StreamingPlatform {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            streaming_platform_id: row.try_get_column("streaming_platform_id")?,
            streaming_platform_name: row.try_get_column("streaming_platform_name")?,
            streaming_platform_launch_year: row.try_get_column("streaming_platform_launch_year")?,
            streaming_platform_subscription_cost: row
                .try_get_column("streaming_platform_subscription_cost")?,
        })
    }
}

impl Model for StreamingPlatform {
    const ENTITY: Entity = Entity::StreamingPlatform;
}

// ==================== Reports ====================

/// A movie with everything linked to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: Movie,
    pub actors: Vec<Actor>,
    pub genres: Vec<Genre>,
    pub streaming_platforms: Vec<StreamingPlatform>,
}

/// A movie matched by genre name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreMovie {
    #[serde(flatten)]
    pub movie: Movie,
    pub genre_name: String,
    pub actor_count: i64,
}

impl FromRow for GenreMovie {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            movie: Movie::from_row(row)?,
            genre_name: row.try_get_column("genre_name")?,
            actor_count: row.try_get_column("actor_count")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreMovieCount {
    #[serde(flatten)]
    pub genre: Genre,
    pub movie_count: i64,
}

impl FromRow for GenreMovieCount {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            genre: Genre::from_row(row)?,
            movie_count: row.try_get_column("movie_count")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductionMovieStats {
    #[serde(flatten)]
    pub production: Production,
    pub movie_count: i64,
    pub latest_movie_year: Option<i32>,
    pub earliest_movie_year: Option<i32>,
}

impl FromRow for ProductionMovieStats {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            production: Production::from_row(row)?,
            movie_count: row.try_get_column("movie_count")?,
            latest_movie_year: row.try_get_column("latest_movie_year")?,
            earliest_movie_year: row.try_get_column("earliest_movie_year")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingPlatformAnalytics {
    #[serde(flatten)]
    pub platform: StreamingPlatform,
    pub movie_count: i64,
    pub avg_movie_rating: Option<Decimal>,
    pub recent_movies_count: i64,
}

impl FromRow for StreamingPlatformAnalytics {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            platform: StreamingPlatform::from_row(row)?,
            movie_count: row.try_get_column("movie_count")?,
            avg_movie_rating: row.try_get_column("avg_movie_rating")?,
            recent_movies_count: row.try_get_column("recent_movies_count")?,
        })
    }
}
