//! Idempotent table creation and sample data.
//!
//! This is a one-shot setup helper, not a migration engine: tables are created
//! with `CREATE TABLE IF NOT EXISTS` and sample rows are inserted with fixed
//! ids and `ON CONFLICT DO NOTHING`, so running it twice is harmless.

use crate::client::GenericClient;
use crate::error::DbResult;

/// Tables in dependency order (referenced tables first).
pub const TABLES: [&str; 9] = [
    "actor",
    "director",
    "genre",
    "production",
    "streaming_platform",
    "movie",
    "movie_actor",
    "movie_genre",
    "movie_streaming_platform",
];

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS actor (
    actor_id INT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    actor_name VARCHAR(255) NOT NULL,
    actor_birth_year INT,
    actor_nationality VARCHAR(100)
);

CREATE TABLE IF NOT EXISTS director (
    director_id INT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    director_name VARCHAR(255) NOT NULL,
    director_birth_year INT,
    director_nationality VARCHAR(100)
);

CREATE TABLE IF NOT EXISTS genre (
    genre_id INT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    genre_name VARCHAR(100) NOT NULL,
    genre_description TEXT
);

CREATE TABLE IF NOT EXISTS production (
    production_id INT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    production_name VARCHAR(255) NOT NULL,
    production_founded_year INT,
    production_headquarters VARCHAR(255)
);

CREATE TABLE IF NOT EXISTS streaming_platform (
    streaming_platform_id INT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    streaming_platform_name VARCHAR(255) NOT NULL,
    streaming_platform_launch_year INT,
    streaming_platform_subscription_cost NUMERIC(10, 2)
);

CREATE TABLE IF NOT EXISTS movie (
    movie_id INT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    movie_title VARCHAR(255) NOT NULL,
    movie_release_year INT,
    movie_runtime INT,
    movie_rating NUMERIC(3, 1),
    director_id INT REFERENCES director (director_id),
    production_id INT REFERENCES production (production_id)
);

CREATE TABLE IF NOT EXISTS movie_actor (
    movie_id INT REFERENCES movie (movie_id),
    actor_id INT REFERENCES actor (actor_id),
    PRIMARY KEY (movie_id, actor_id)
);

CREATE TABLE IF NOT EXISTS movie_genre (
    movie_id INT REFERENCES movie (movie_id),
    genre_id INT REFERENCES genre (genre_id),
    PRIMARY KEY (movie_id, genre_id)
);

CREATE TABLE IF NOT EXISTS movie_streaming_platform (
    movie_id INT REFERENCES movie (movie_id),
    streaming_platform_id INT REFERENCES streaming_platform (streaming_platform_id),
    PRIMARY KEY (movie_id, streaming_platform_id)
);
";

const SEED_SQL: &str = "
INSERT INTO actor (actor_id, actor_name, actor_birth_year, actor_nationality) VALUES
    (1, 'Tom Hanks', 1956, 'American'),
    (2, 'Leonardo DiCaprio', 1974, 'American'),
    (3, 'Meryl Streep', 1949, 'American'),
    (4, 'Denzel Washington', 1954, 'American'),
    (5, 'Scarlett Johansson', 1984, 'American')
ON CONFLICT DO NOTHING;

INSERT INTO director (director_id, director_name, director_birth_year, director_nationality) VALUES
    (1, 'Christopher Nolan', 1970, 'British'),
    (2, 'Steven Spielberg', 1946, 'American'),
    (3, 'Martin Scorsese', 1942, 'American'),
    (4, 'Quentin Tarantino', 1963, 'American'),
    (5, 'Greta Gerwig', 1983, 'American')
ON CONFLICT DO NOTHING;

INSERT INTO genre (genre_id, genre_name, genre_description) VALUES
    (1, 'Action', 'High energy films with lots of excitement'),
    (2, 'Drama', 'Character-driven stories with emotional depth'),
    (3, 'Comedy', 'Films designed to make audiences laugh'),
    (4, 'Thriller', 'Suspenseful films that keep you on edge'),
    (5, 'Sci-Fi', 'Science fiction and futuristic stories')
ON CONFLICT DO NOTHING;

INSERT INTO production (production_id, production_name, production_founded_year, production_headquarters) VALUES
    (1, 'Warner Bros', 1923, 'Burbank, California'),
    (2, 'Disney', 1923, 'Burbank, California'),
    (3, 'Universal Pictures', 1912, 'Universal City, California'),
    (4, 'Paramount Pictures', 1912, 'Hollywood, California'),
    (5, 'Sony Pictures', 1987, 'Culver City, California')
ON CONFLICT DO NOTHING;

INSERT INTO streaming_platform (streaming_platform_id, streaming_platform_name, streaming_platform_launch_year, streaming_platform_subscription_cost) VALUES
    (1, 'Netflix', 2007, 15.99),
    (2, 'Amazon Prime', 2006, 12.99),
    (3, 'Disney+', 2019, 7.99),
    (4, 'HBO Max', 2020, 14.99),
    (5, 'Hulu', 2007, 11.99)
ON CONFLICT DO NOTHING;

INSERT INTO movie (movie_id, movie_title, movie_release_year, movie_runtime, movie_rating, director_id, production_id) VALUES
    (1, 'Inception', 2010, 148, 8.8, 1, 1),
    (2, 'Forrest Gump', 1994, 142, 8.8, 2, 3),
    (3, 'The Wolf of Wall Street', 2013, 180, 8.2, 3, 3),
    (4, 'Pulp Fiction', 1994, 154, 8.9, 4, 4)
ON CONFLICT DO NOTHING;

INSERT INTO movie_actor (movie_id, actor_id) VALUES
    (1, 2), (2, 1), (3, 2)
ON CONFLICT DO NOTHING;

INSERT INTO movie_genre (movie_id, genre_id) VALUES
    (1, 1), (1, 4), (1, 5), (2, 2), (2, 3), (3, 2), (3, 3), (4, 2), (4, 4)
ON CONFLICT DO NOTHING;

INSERT INTO movie_streaming_platform (movie_id, streaming_platform_id) VALUES
    (1, 1), (1, 4), (2, 2), (2, 5), (3, 2), (4, 1), (4, 5)
ON CONFLICT DO NOTHING;
";

/// Create all tables if they do not exist.
pub async fn create_tables(conn: &impl GenericClient) -> DbResult<()> {
    conn.batch_execute(SCHEMA_SQL).await?;
    tracing::info!(tables = TABLES.len(), "schema ensured");
    Ok(())
}

/// Insert the sample rows and move identity sequences past them.
pub async fn seed(conn: &impl GenericClient) -> DbResult<()> {
    conn.batch_execute(SEED_SQL).await?;
    conn.batch_execute(&sync_identities_sql()).await?;
    tracing::info!("sample data ensured");
    Ok(())
}

/// Create tables and, when `with_seed` is set, insert sample rows.
pub async fn run(conn: &impl GenericClient, with_seed: bool) -> DbResult<()> {
    create_tables(conn).await?;
    if with_seed {
        seed(conn).await?;
    }
    Ok(())
}

fn sync_identities_sql() -> String {
    let mut out = String::new();
    for table in &TABLES[..6] {
        let id = format!("{table}_id");
        out.push_str(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', '{id}'), \
             GREATEST((SELECT MAX({id}) FROM {table}), 1));\n"
        ));
    }
    out
}
