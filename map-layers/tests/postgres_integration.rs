//! Tests d'intégration PostgreSQL / PostGIS
//!
//! Ces tests nécessitent une base PostGIS disponible.
//! Configuration via variables d'environnement:
//! - DB_HOST, DB_PORT, DB_NAME, DB_USER, DB_PASSWORD
//!
//! Exécution:
//! ```bash
//! # Avec Docker
//! docker run -d --name postgis-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! DB_USER=postgres DB_PASSWORD=test DB_NAME=postgres cargo test --test postgres_integration -- --ignored
//! ```

use std::time::Duration;

use deadpool_postgres::Pool;
use map_layers::export::{export_table, run_statements, CrsNormalization};
use map_layers::{create_pool, run_pipeline, DatabaseConfig, ErrorKind, RunSettings};

const HEARTBEAT: Duration = Duration::from_secs(20);

/// Configuration de test
fn test_config() -> DatabaseConfig {
    let mut config = DatabaseConfig::from_env().expect("Invalid DB_* environment");
    if config.user.is_empty() {
        config.user = "postgres".into();
    }
    if config.password.is_empty() {
        config.password = "test".into();
    }
    config
}

fn test_pool() -> Pool {
    create_pool(&test_config()).expect("Failed to create pool")
}

async fn setup(pool: &Pool, sql: &str) {
    let client = pool.get().await.expect("Failed to get client");
    client.batch_execute(sql).await.expect("Setup failed");
}

async fn table_exists(pool: &Pool, table: &str) -> bool {
    let client = pool.get().await.expect("Failed to get client");
    let row = client
        .query_one("SELECT to_regclass($1) IS NOT NULL", &[&table])
        .await
        .expect("Query failed");
    row.get(0)
}

fn read_features(path: &std::path::Path) -> geojson::FeatureCollection {
    let content = std::fs::read_to_string(path).unwrap();
    content.parse::<geojson::GeoJson>().unwrap().try_into().unwrap()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_batch_commits() {
    let pool = test_pool();
    setup(&pool, "DROP TABLE IF EXISTS it_batch_commit;").await;

    let statements = sqlscript::split_statements(
        "CREATE TABLE it_batch_commit (id INT);\n\
         INSERT INTO it_batch_commit VALUES (1), (2);\n\
         -- fin\n",
    )
    .unwrap();

    let report = run_statements(&pool, &statements, HEARTBEAT).await.unwrap();
    assert_eq!(report.statements_executed, 2);

    let client = pool.get().await.unwrap();
    let count: i64 = client
        .query_one("SELECT count(*) FROM it_batch_commit", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_failed_statement_rolls_back_batch() {
    let pool = test_pool();
    setup(&pool, "DROP TABLE IF EXISTS it_batch_rollback;").await;

    let statements = sqlscript::split_statements(
        "CREATE TABLE it_batch_rollback (id INT);\n\
         INSERT INTO it_batch_rollback VALUES (1);\n\
         SELECT * FROM it_missing_relation;\n",
    )
    .unwrap();

    let err = run_statements(&pool, &statements, HEARTBEAT).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(!table_exists(&pool, "it_batch_rollback").await);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_export_without_srid_is_assigned() {
    let pool = test_pool();
    setup(
        &pool,
        "DROP TABLE IF EXISTS it_layer_nosrid;
         CREATE EXTENSION IF NOT EXISTS postgis;
         CREATE TABLE it_layer_nosrid (
             id INT, name TEXT, risk NUMERIC, fire_date DATE, seen_at TIMESTAMPTZ, geom geometry
         );
         INSERT INTO it_layer_nosrid VALUES
             (1, 'a', 0.7, DATE '2020-08-16', TIMESTAMPTZ '2020-08-16 14:05:00+00',
              ST_GeomFromText('LINESTRING(-121.5 38.5, -121.4 38.6)')),
             (2, 'b', NULL, NULL, NULL, NULL);",
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nosrid.geojson");
    let exported = export_table(&pool, "it_layer_nosrid", &path, "geom").await.unwrap();

    assert_eq!(exported.rows, 2);
    assert_eq!(exported.normalization, CrsNormalization::Assigned);

    let fc = read_features(&path);
    assert_eq!(fc.features.len(), 2);
    assert_eq!(
        fc.features[0].geometry.as_ref().unwrap().value,
        geojson::Value::LineString(vec![vec![-121.5, 38.5], vec![-121.4, 38.6]])
    );
    assert_eq!(fc.features[0].property("name"), Some(&serde_json::json!("a")));
    assert_eq!(fc.features[0].property("risk"), Some(&serde_json::json!(0.7)));
    assert_eq!(fc.features[0].property("fire_date"), Some(&serde_json::json!("2020-08-16")));
    assert_eq!(
        fc.features[0].property("seen_at"),
        Some(&serde_json::json!("2020-08-16T14:05:00+00:00"))
    );
    assert_eq!(fc.features[1].property("fire_date"), Some(&serde_json::Value::Null));
    assert!(fc.features[1].geometry.is_none());
    assert!(!fc.features[0].contains_property("geom"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_export_wgs84_unchanged() {
    let pool = test_pool();
    setup(
        &pool,
        "DROP TABLE IF EXISTS it_layer_wgs84;
         CREATE EXTENSION IF NOT EXISTS postgis;
         CREATE TABLE it_layer_wgs84 (id INT, geom geometry(Point, 4326));
         INSERT INTO it_layer_wgs84 VALUES (1, ST_SetSRID(ST_MakePoint(2.35, 48.85), 4326));",
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wgs84.geojson");
    let exported = export_table(&pool, "it_layer_wgs84", &path, "geom").await.unwrap();

    assert_eq!(exported.normalization, CrsNormalization::Unchanged);
    let fc = read_features(&path);
    assert_eq!(
        fc.features[0].geometry.as_ref().unwrap().value,
        geojson::Value::Point(vec![2.35, 48.85])
    );
}

#[cfg(feature = "reproject")]
#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_export_web_mercator_reprojected() {
    let pool = test_pool();
    setup(
        &pool,
        "DROP TABLE IF EXISTS it_layer_3857;
         CREATE EXTENSION IF NOT EXISTS postgis;
         CREATE TABLE it_layer_3857 (id INT, geom geometry(Point, 3857));
         INSERT INTO it_layer_3857 VALUES (1, ST_Transform(ST_SetSRID(ST_MakePoint(-120.0, 37.0), 4326), 3857));",
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mercator.geojson");
    let exported = export_table(&pool, "it_layer_3857", &path, "geom").await.unwrap();

    assert_eq!(exported.normalization, CrsNormalization::Reprojected { from: 3857 });
    let fc = read_features(&path);
    let geojson::Value::Point(coords) = &fc.features[0].geometry.as_ref().unwrap().value else {
        panic!("Expected Point geometry");
    };
    assert!((coords[0] + 120.0).abs() < 1e-6);
    assert!((coords[1] - 37.0).abs() < 1e-6);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_empty_table_fails_without_file() {
    let pool = test_pool();
    setup(
        &pool,
        "DROP TABLE IF EXISTS it_layer_empty;
         CREATE EXTENSION IF NOT EXISTS postgis;
         CREATE TABLE it_layer_empty (id INT, geom geometry);",
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.geojson");
    let err = export_table(&pool, "it_layer_empty", &path, "geom").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmptyResult);
    assert_eq!(err.to_string(), "Export table it_layer_empty returned 0 rows.");
    assert!(!path.exists());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_full_pipeline() {
    let pool = test_pool();
    let root = tempfile::tempdir().unwrap();
    let sql_dir = root.path().join("sql").join("queries");
    std::fs::create_dir_all(&sql_dir).unwrap();

    let mut sql = String::from("CREATE EXTENSION IF NOT EXISTS postgis;\n");
    for table in [
        "map_tx_lines_all",
        "map_tx_segments_vh",
        "map_tx_segments_joint",
        "map_polygons_vh",
        "map_polygons_fire_union",
    ] {
        sql.push_str(&format!(
            "-- {table}\n\
             DROP TABLE IF EXISTS {table};\n\
             CREATE TABLE {table} AS SELECT 1 AS id, ST_SetSRID(ST_MakePoint(-120, 37), 4326) AS geom;\n"
        ));
    }
    std::fs::write(sql_dir.join("05_create_map_layers.sql"), sql).unwrap();

    let settings = RunSettings::for_root(root.path());
    let report = run_pipeline(&pool, &settings).await.unwrap();

    assert_eq!(report.statements_executed, 11);
    assert_eq!(report.layers.len(), 5);
    assert_eq!(report.total_rows(), 5);
    for name in [
        "tx_lines_all.geojson",
        "tx_segments_vh.geojson",
        "tx_segments_joint.geojson",
        "polygons_vh.geojson",
        "polygons_fire_union.geojson",
    ] {
        assert!(settings.export_dir.join(name).exists(), "{name} missing");
    }
}
