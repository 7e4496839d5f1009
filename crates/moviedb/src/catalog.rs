//! The six movie-database entities, their schemas and base statements.

use crate::schema::{EntitySchema, FieldType, FilterMode};
use crate::statement::StatementTemplate;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

use FieldType::{Decimal, Integer, Text, Year};
use FilterMode::{Exact, Range, Substring};

/// A logical record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Movie,
    Actor,
    Director,
    Genre,
    Production,
    StreamingPlatform,
}

impl Entity {
    pub const ALL: [Entity; 6] = [
        Entity::Movie,
        Entity::Actor,
        Entity::Director,
        Entity::Genre,
        Entity::Production,
        Entity::StreamingPlatform,
    ];

    /// Singular name, as used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Entity::Movie => "movie",
            Entity::Actor => "actor",
            Entity::Director => "director",
            Entity::Genre => "genre",
            Entity::Production => "production",
            Entity::StreamingPlatform => "streaming_platform",
        }
    }

    /// URL path segment (`/api/<plural>`).
    pub fn plural(self) -> &'static str {
        match self {
            Entity::Movie => "movies",
            Entity::Actor => "actors",
            Entity::Director => "directors",
            Entity::Genre => "genres",
            Entity::Production => "productions",
            Entity::StreamingPlatform => "streaming-platforms",
        }
    }

    /// The entity's allow-list descriptor.
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Entity::Movie => &MOVIE,
            Entity::Actor => &ACTOR,
            Entity::Director => &DIRECTOR,
            Entity::Genre => &GENRE,
            Entity::Production => &PRODUCTION,
            Entity::StreamingPlatform => &STREAMING_PLATFORM,
        }
    }

    /// Base retrieval statement; carries `{where}` and `{order_by}`.
    pub fn select(self) -> StatementTemplate {
        match self {
            Entity::Movie => MOVIE_SELECT,
            Entity::Actor => ACTOR_SELECT,
            Entity::Director => DIRECTOR_SELECT,
            Entity::Genre => GENRE_SELECT,
            Entity::Production => PRODUCTION_SELECT,
            Entity::StreamingPlatform => STREAMING_PLATFORM_SELECT,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ==================== Schemas ====================

static MOVIE: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::builder("movie", "movie")
        .alias("m")
        .id("movie_id")
        .sortable("movie_title", Text)
        .sortable("movie_release_year", Year)
        .sortable("movie_runtime", Integer)
        .sortable("movie_rating", Decimal)
        .default_sort("movie_title")
        .filterable("movie_id", Integer, Exact)
        .filterable("movie_title", Text, Substring)
        .filterable("movie_release_year", Year, Range)
        .filterable("movie_runtime", Integer, Range)
        .filterable("movie_rating", Decimal, Range)
        .filterable("director_id", Integer, Exact)
        .filterable("production_id", Integer, Exact)
        .writable("movie_title", Text, true)
        .writable("movie_release_year", Year, false)
        .writable("movie_runtime", Integer, false)
        .writable("movie_rating", Decimal, false)
        .writable("director_id", Integer, false)
        .writable("production_id", Integer, false)
        .build()
        .expect("movie schema is valid")
});

static ACTOR: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::builder("actor", "actor")
        .alias("a")
        .id("actor_id")
        .sortable("actor_id", Integer)
        .sortable("actor_name", Text)
        .sortable("actor_birth_year", Year)
        .sortable("actor_nationality", Text)
        .default_sort("actor_name")
        .filterable("actor_id", Integer, Exact)
        .filterable("actor_name", Text, Substring)
        .filterable("actor_nationality", Text, Substring)
        .filterable("actor_birth_year", Year, Range)
        .writable("actor_name", Text, true)
        .writable("actor_birth_year", Year, false)
        .writable("actor_nationality", Text, false)
        .build()
        .expect("actor schema is valid")
});

static DIRECTOR: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::builder("director", "director")
        .alias("d")
        .id("director_id")
        .sortable("director_id", Integer)
        .sortable("director_name", Text)
        .sortable("director_birth_year", Year)
        .sortable("director_nationality", Text)
        .default_sort("director_name")
        .filterable("director_id", Integer, Exact)
        .filterable("director_name", Text, Substring)
        .filterable("director_nationality", Text, Substring)
        .filterable("director_birth_year", Year, Range)
        .writable("director_name", Text, true)
        .writable("director_birth_year", Year, false)
        .writable("director_nationality", Text, false)
        .build()
        .expect("director schema is valid")
});

static GENRE: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::builder("genre", "genre")
        .alias("g")
        .id("genre_id")
        .sortable("genre_id", Integer)
        .sortable("genre_name", Text)
        .sortable("genre_description", Text)
        .default_sort("genre_name")
        .filterable("genre_id", Integer, Exact)
        .filterable("genre_name", Text, Substring)
        .filterable("genre_description", Text, Substring)
        .writable("genre_name", Text, true)
        .writable("genre_description", Text, false)
        .build()
        .expect("genre schema is valid")
});

static PRODUCTION: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::builder("production", "production")
        .alias("p")
        .id("production_id")
        .sortable("production_id", Integer)
        .sortable("production_name", Text)
        .sortable("production_founded_year", Year)
        .sortable("production_headquarters", Text)
        .default_sort("production_name")
        .filterable("production_id", Integer, Exact)
        .filterable("production_name", Text, Substring)
        .filterable("production_headquarters", Text, Substring)
        .filterable("production_founded_year", Year, Range)
        .writable("production_name", Text, true)
        .writable("production_founded_year", Year, false)
        .writable("production_headquarters", Text, false)
        .build()
        .expect("production schema is valid")
});

static STREAMING_PLATFORM: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::builder("streaming_platform", "streaming_platform")
        .alias("sp")
        .id("streaming_platform_id")
        .sortable("streaming_platform_id", Integer)
        .sortable("streaming_platform_name", Text)
        .sortable("streaming_platform_launch_year", Year)
        .sortable("streaming_platform_subscription_cost", Decimal)
        .default_sort("streaming_platform_name")
        .filterable("streaming_platform_id", Integer, Exact)
        .filterable("streaming_platform_name", Text, Substring)
        .filterable("streaming_platform_launch_year", Year, Range)
        .filterable("streaming_platform_subscription_cost", Decimal, Range)
        .writable("streaming_platform_name", Text, true)
        .writable("streaming_platform_launch_year", Year, false)
        .writable("streaming_platform_subscription_cost", Decimal, false)
        .build()
        .expect("streaming_platform schema is valid")
});

// ==================== Statements ====================

const MOVIE_SELECT: StatementTemplate = StatementTemplate::new(
    "SELECT m.movie_id, m.movie_title, m.movie_release_year, m.movie_runtime, m.movie_rating, \
     m.director_id, m.production_id, d.director_name, p.production_name \
     FROM movie m \
     LEFT JOIN director d ON d.director_id = m.director_id \
     LEFT JOIN production p ON p.production_id = m.production_id \
     {where} {order_by}, m.movie_id",
);

const ACTOR_SELECT: StatementTemplate = StatementTemplate::new(
    "SELECT a.actor_id, a.actor_name, a.actor_birth_year, a.actor_nationality \
     FROM actor a {where} {order_by}, a.actor_id",
);

const DIRECTOR_SELECT: StatementTemplate = StatementTemplate::new(
    "SELECT d.director_id, d.director_name, d.director_birth_year, d.director_nationality \
     FROM director d {where} {order_by}, d.director_id",
);

const GENRE_SELECT: StatementTemplate = StatementTemplate::new(
    "SELECT g.genre_id, g.genre_name, g.genre_description \
     FROM genre g {where} {order_by}, g.genre_id",
);

const PRODUCTION_SELECT: StatementTemplate = StatementTemplate::new(
    "SELECT p.production_id, p.production_name, p.production_founded_year, p.production_headquarters \
     FROM production p {where} {order_by}, p.production_id",
);

const STREAMING_PLATFORM_SELECT: StatementTemplate = StatementTemplate::new(
    "SELECT sp.streaming_platform_id, sp.streaming_platform_name, \
     sp.streaming_platform_launch_year, sp.streaming_platform_subscription_cost \
     FROM streaming_platform sp {where} {order_by}, sp.streaming_platform_id",
);

/// Directors for the birth-year report: the director listing with name as
/// the tiebreaker within a year.
pub const DIRECTORS_BY_BIRTH_YEAR: StatementTemplate = StatementTemplate::new(
    "SELECT d.director_id, d.director_name, d.director_birth_year, d.director_nationality \
     FROM director d {where} {order_by}, d.director_name ASC, d.director_id",
);

/// Movies joined to a genre, with the number of distinct credited actors.
///
/// Expects a filter on a genre field and ordering on a movie field.
pub const MOVIES_BY_GENRE: StatementTemplate = StatementTemplate::new(
    "SELECT m.movie_id, m.movie_title, m.movie_release_year, m.movie_runtime, m.movie_rating, \
     m.director_id, m.production_id, d.director_name, p.production_name, g.genre_name, \
     COUNT(DISTINCT ma.actor_id) AS actor_count \
     FROM movie m \
     LEFT JOIN director d ON d.director_id = m.director_id \
     LEFT JOIN production p ON p.production_id = m.production_id \
     JOIN movie_genre mg ON mg.movie_id = m.movie_id \
     JOIN genre g ON g.genre_id = mg.genre_id \
     LEFT JOIN movie_actor ma ON ma.movie_id = m.movie_id \
     {where} \
     GROUP BY m.movie_id, d.director_name, p.production_name, g.genre_id \
     {order_by}, m.movie_id, g.genre_id",
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_sort_spec;

    #[test]
    fn every_schema_builds() {
        for entity in Entity::ALL {
            let schema = entity.schema();
            assert_eq!(schema.entity_name(), entity.name());
            assert_eq!(schema.table().to_sql(), entity.name());
            assert!(schema.alias().is_some(), "{entity} has no alias");
        }
    }

    #[test]
    fn sortable_fields_are_pinned() {
        fn names(entity: Entity) -> Vec<&'static str> {
            entity.schema().sortable_fields().iter().map(|f| f.name()).collect()
        }
        assert_eq!(
            names(Entity::Movie),
            ["movie_title", "movie_release_year", "movie_runtime", "movie_rating"]
        );
        assert_eq!(
            names(Entity::Actor),
            ["actor_id", "actor_name", "actor_birth_year", "actor_nationality"]
        );
        assert_eq!(
            names(Entity::Director),
            ["director_id", "director_name", "director_birth_year", "director_nationality"]
        );
        assert_eq!(names(Entity::Genre), ["genre_id", "genre_name", "genre_description"]);
        assert_eq!(
            names(Entity::Production),
            [
                "production_id",
                "production_name",
                "production_founded_year",
                "production_headquarters"
            ]
        );
        assert_eq!(
            names(Entity::StreamingPlatform),
            [
                "streaming_platform_id",
                "streaming_platform_name",
                "streaming_platform_launch_year",
                "streaming_platform_subscription_cost"
            ]
        );
    }

    #[test]
    fn ids_are_never_writable_and_movie_id_never_sorts() {
        for entity in Entity::ALL {
            let schema = entity.schema();
            assert!(schema.writable(schema.id_field().name()).is_none(), "{entity}");
        }
        assert!(Entity::Movie.schema().sortable("movie_id").is_none());

        let spec = build_sort_spec(Entity::Genre.schema(), Some("genre_id"), Some("desc"));
        assert!(!spec.used_fallback());
        let sql = Entity::Genre.select().render(&spec).unwrap().to_sql();
        assert!(sql.ends_with("ORDER BY g.genre_id DESC, g.genre_id"), "{sql}");
    }

    #[test]
    fn birth_year_report_breaks_ties_on_name() {
        use crate::query::{FilterInput, build_filter_spec};

        let schema = Entity::Director.schema();
        let filter = build_filter_spec(
            schema,
            "director_birth_year",
            FilterInput::range(Some("1940"), Some("1960")),
        )
        .unwrap();
        let spec = build_sort_spec(schema, Some("director_birth_year"), Some("asc"))
            .with_filter(filter);
        let sql = DIRECTORS_BY_BIRTH_YEAR.render(&spec).unwrap().to_sql();

        assert!(sql.contains("WHERE d.director_birth_year BETWEEN $1 AND $2"), "{sql}");
        assert!(
            sql.ends_with(
                "ORDER BY d.director_birth_year ASC, d.director_name ASC, d.director_id"
            ),
            "{sql}"
        );
    }

    #[test]
    fn every_select_renders_default_ordering() {
        for entity in Entity::ALL {
            let schema = entity.schema();
            let select = entity.select();
            assert!(select.accepts_filter(), "{entity}");

            let sql = select.render(&build_sort_spec(schema, None, None)).unwrap().to_sql();
            let expected = format!(
                "ORDER BY {} ASC, {}",
                schema.default_sort_field().column(),
                schema.id_column()
            );
            assert!(sql.ends_with(&expected), "{entity}: {sql}");
            assert!(!sql.contains('{'), "{entity}: {sql}");
        }
    }

    #[test]
    fn movies_by_genre_renders_cross_entity_filter() {
        use crate::query::{FilterInput, build_filter_spec};

        let filter =
            build_filter_spec(Entity::Genre.schema(), "genre_name", FilterInput::value("drama"))
                .unwrap();
        let spec = build_sort_spec(Entity::Movie.schema(), None, None).with_filter(filter);
        let sql = MOVIES_BY_GENRE.render(&spec).unwrap().to_sql();

        assert!(sql.contains("WHERE g.genre_name ILIKE $1 GROUP BY"), "{sql}");
        assert!(sql.ends_with("ORDER BY m.movie_title ASC, m.movie_id, g.genre_id"), "{sql}");
    }

    #[test]
    fn plural_paths_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for entity in Entity::ALL {
            assert!(seen.insert(entity.plural()));
        }
    }
}
