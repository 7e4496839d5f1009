mod common;

use common::TestDb;
use moviedb::{
    Actor, DbError, DbResult, Director, Entity, FilterInput, GenericClient, InstrumentedClient,
    Movie, SortDir, StreamingPlatform, build_filter_spec, build_sort_spec, repo,
};
use rust_decimal::Decimal;
use std::time::Duration;

#[tokio::test]
async fn sorted_and_filtered_listings() -> DbResult<()> {
    let Some(db) = TestDb::connect("sorted_and_filtered_listings").await? else {
        return Ok(());
    };
    let conn = &db.client;

    // Default order is the schema default, ascending.
    let all = repo::list_all::<Movie>(conn).await?;
    let titles: Vec<&str> = all.data.iter().map(|m| m.movie_title.as_str()).collect();
    assert_eq!(
        titles,
        ["Forrest Gump", "Inception", "Pulp Fiction", "The Wolf of Wall Street"]
    );
    assert_eq!(all.count, 4);
    assert_eq!(all.data[1].director_name.as_deref(), Some("Christopher Nolan"));

    // Requested sort field and direction.
    let schema = Entity::Movie.schema();
    let spec = build_sort_spec(schema, Some("movie_rating"), Some("desc"));
    let by_rating = repo::list::<Movie>(conn, &spec).await?;
    assert_eq!(by_rating.sorted_by, "movie_rating");
    assert_eq!(by_rating.order, SortDir::Desc);
    assert_eq!(by_rating.data[0].movie_title, "Pulp Fiction");
    assert_eq!(by_rating.data[0].movie_rating, Some(Decimal::new(89, 1)));

    // Unknown sort field degrades to the default ordering.
    let spec = build_sort_spec(schema, Some("movie_id; DROP TABLE movie"), Some("sideways"));
    let fallback = repo::list::<Movie>(conn, &spec).await?;
    assert_eq!(fallback.sorted_by, "movie_title");
    assert_eq!(fallback.data, all.data);

    // Range filter.
    let filter = build_filter_spec(
        schema,
        "movie_release_year",
        FilterInput::range(Some("2000"), Some("2010")),
    )?;
    let spec = build_sort_spec(schema, None, None).with_filter(filter);
    let in_range = repo::list::<Movie>(conn, &spec).await?;
    assert_eq!(in_range.count, 1);
    assert_eq!(in_range.data[0].movie_title, "Inception");

    // Decimal range filter.
    let platforms = Entity::StreamingPlatform.schema();
    let filter = build_filter_spec(
        platforms,
        "streaming_platform_subscription_cost",
        FilterInput::range(Some("12"), Some("15.99")),
    )?;
    let spec = build_sort_spec(platforms, Some("streaming_platform_subscription_cost"), None)
        .with_filter(filter);
    let pricey = repo::list::<StreamingPlatform>(conn, &spec).await?;
    let names: Vec<&str> = pricey
        .data
        .iter()
        .map(|p| p.streaming_platform_name.as_str())
        .collect();
    assert_eq!(names, ["Amazon Prime", "HBO Max", "Netflix"]);

    db.teardown().await
}

#[tokio::test]
async fn substring_filters_bind_values() -> DbResult<()> {
    let Some(db) = TestDb::connect("substring_filters_bind_values").await? else {
        return Ok(());
    };
    let conn = &db.client;
    let actors = Entity::Actor.schema();

    let filter = build_filter_spec(actors, "actor_nationality", FilterInput::value("meric"))?;
    let spec = build_sort_spec(actors, None, None).with_filter(filter);
    assert_eq!(repo::list::<Actor>(conn, &spec).await?.count, 5);

    // Hostile values are data, not SQL.
    for value in ["'; DROP TABLE actor; --", "%", "_", "\\"] {
        let filter = build_filter_spec(actors, "actor_name", FilterInput::value(value))?;
        let spec = build_sort_spec(actors, None, None).with_filter(filter);
        assert_eq!(repo::list::<Actor>(conn, &spec).await?.count, 0, "{value}");
    }
    assert_eq!(repo::list_all::<Actor>(conn).await?.count, 5);

    db.teardown().await
}

#[tokio::test]
async fn lookups_and_reports() -> DbResult<()> {
    let Some(db) = TestDb::connect("lookups_and_reports").await? else {
        return Ok(());
    };
    let conn = &db.client;

    let nolan: Director = repo::get(conn, 1).await?;
    assert_eq!(nolan.director_name, "Christopher Nolan");
    assert!(repo::get::<Director>(conn, 999).await.unwrap_err().is_not_found());

    let detail = repo::movie_detail(conn, 1).await?;
    assert_eq!(detail.movie.movie_title, "Inception");
    assert_eq!(detail.actors.len(), 1);
    let genres: Vec<&str> = detail.genres.iter().map(|g| g.genre_name.as_str()).collect();
    assert_eq!(genres, ["Action", "Sci-Fi", "Thriller"]);
    assert_eq!(detail.streaming_platforms.len(), 2);

    let filter = build_filter_spec(Entity::Genre.schema(), "genre_name", FilterInput::value("DRAMA"))?;
    let spec = build_sort_spec(Entity::Movie.schema(), None, None).with_filter(filter);
    let dramas = repo::movies_by_genre(conn, &spec).await?;
    let titles: Vec<&str> = dramas.data.iter().map(|m| m.movie.movie_title.as_str()).collect();
    assert_eq!(titles, ["Forrest Gump", "Pulp Fiction", "The Wolf of Wall Street"]);
    assert_eq!(dramas.data[0].actor_count, 1);
    assert_eq!(dramas.data[1].actor_count, 0);

    let genres = repo::genres_with_movie_count(conn).await?;
    assert_eq!(genres[0].genre.genre_name, "Drama");
    assert_eq!(genres[0].movie_count, 3);

    let productions = repo::productions_with_movie_stats(conn).await?;
    assert_eq!(productions[0].production.production_name, "Universal Pictures");
    assert_eq!(productions[0].movie_count, 2);
    assert_eq!(productions[0].earliest_movie_year, Some(1994));
    assert_eq!(productions[0].latest_movie_year, Some(2013));

    let platforms = repo::streaming_platforms_with_analytics(conn).await?;
    let hbo = platforms
        .iter()
        .find(|p| p.platform.streaming_platform_name == "HBO Max")
        .expect("HBO Max row");
    assert_eq!(hbo.movie_count, 1);
    assert_eq!(hbo.avg_movie_rating, Some(Decimal::new(880, 2)));
    assert_eq!(hbo.recent_movies_count, 0);

    db.teardown().await
}

#[tokio::test]
async fn slow_statements_time_out_and_are_cancelled() -> DbResult<()> {
    let Some(db) = TestDb::connect("slow_statements_time_out_and_are_cancelled").await? else {
        return Ok(());
    };
    let conn =
        InstrumentedClient::new(&db.client).with_query_timeout(Duration::from_millis(100));

    let err = conn.execute("SELECT pg_sleep(30)", &[]).await.unwrap_err();
    assert!(matches!(err, DbError::Timeout(_)), "{err}");

    // The server-side sleep was cancelled, so the connection is free again.
    let ping = conn.inner().query_one("SELECT 1", &[]);
    let row = tokio::time::timeout(Duration::from_secs(10), ping)
        .await
        .expect("connection still busy with the timed-out statement")?;
    assert_eq!(row.get::<_, i32>(0), 1);

    db.teardown().await
}
