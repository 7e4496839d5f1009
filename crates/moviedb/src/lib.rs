//! # moviedb
//!
//! Allow-listed sorting and filtering over a Postgres movie database.
//!
//! ## Overview
//!
//! - **Schemas**: every entity (movie, actor, director, genre, production,
//!   streaming platform) has a static [`EntitySchema`] naming the fields that
//!   may be sorted, filtered and written.
//! - **Query builder**: [`build_sort_spec`] and [`build_filter_spec`] turn
//!   untrusted request parameters into a [`QuerySpec`] whose identifiers are
//!   borrowed from the schema. Bad sort input falls back to defaults; bad
//!   filter input is an error.
//! - **Storage**: a [`StatementTemplate`] splices a `QuerySpec` into trusted SQL,
//!   values are bound as `$n` parameters, and [`repo`] functions run it on any
//!   [`GenericClient`].
//!
//! ```ignore
//! use moviedb::{Entity, FilterInput, Movie, build_filter_spec, build_sort_spec, repo};
//!
//! let schema = Entity::Movie.schema();
//! let spec = build_sort_spec(schema, Some("movie_rating"), Some("desc"))
//!     .with_filter(build_filter_spec(
//!         schema,
//!         "movie_release_year",
//!         FilterInput::range(Some("1990"), Some("2010")),
//!     )?);
//!
//! let client = store.client().await?;
//! let listing = repo::list::<Movie>(&client, &spec).await?;
//! ```

pub mod bootstrap;
pub mod catalog;
pub mod client;
pub mod error;
pub mod ident;
pub mod model;
pub mod mutation;
pub mod query;
pub mod repo;
pub mod row;
pub mod schema;
pub mod sql;
pub mod statement;

pub use catalog::Entity;
pub use client::GenericClient;
pub use error::{DbError, DbResult};
pub use ident::Ident;
pub use model::{
    Actor, Director, Genre, GenreMovie, GenreMovieCount, Model, Movie, MovieDetail, Production,
    ProductionMovieStats, StreamingPlatform, StreamingPlatformAnalytics,
};
pub use mutation::Payload;
pub use query::{
    FilterClause, FilterInput, FilterValue, Predicate, QuerySpec, SortDir, SortRequest,
    build_filter_spec, build_sort_spec,
};
pub use repo::{FilterMeta, Listing};
pub use row::{FromRow, RowExt};
pub use schema::{EntitySchema, FieldType, FilterField, FilterMode, SortField, WritableField};
pub use sql::{Sql, sql};
pub use statement::StatementTemplate;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub mod store;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "pool")]
pub use store::{InstrumentedClient, Store};
