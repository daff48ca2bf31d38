//! Tests d'intégration avec un script de couches réaliste

use std::io::Write;

const MAP_LAYERS_SQL: &str = r#"
-- 05_create_map_layers.sql
-- Couches cartographiques dérivées

DROP TABLE IF EXISTS map_tx_lines_all;
CREATE TABLE map_tx_lines_all AS
SELECT id, voltage, ST_Transform(geom, 4326) AS geom
FROM tx_lines;

-- segments dans les zones très sensibles
DROP TABLE IF EXISTS map_tx_segments_vh;
CREATE TABLE map_tx_segments_vh AS
SELECT s.id, s.geom
FROM tx_segments s
JOIN hazard_vh h ON ST_Intersects(s.geom, h.geom);

-- CREATE INDEX ON map_tx_segments_vh USING gist(geom);

CREATE OR REPLACE VIEW map_tx_segments_joint AS
SELECT * FROM map_tx_segments_vh WHERE id IS NOT NULL;
"#;

#[test]
fn test_split_map_layers_script() {
    let script = sqlscript::Script::from_text("05_create_map_layers.sql", MAP_LAYERS_SQL);
    let statements = script.statements().unwrap();

    assert_eq!(statements.len(), 5);
    for (i, statement) in statements.iter().enumerate() {
        assert_eq!(statement.ordinal, i + 1);
        assert!(!statement.sql.trim().is_empty());
        assert!(!statement.sql.ends_with(';'));
    }

    // L'ordre du fichier est conservé
    assert!(statements[0].sql.ends_with("DROP TABLE IF EXISTS map_tx_lines_all"));
    assert!(statements[1].sql.starts_with("CREATE TABLE map_tx_lines_all AS"));
    assert!(statements[2].sql.contains("DROP TABLE IF EXISTS map_tx_segments_vh"));
    assert!(statements[3].sql.starts_with("CREATE TABLE map_tx_segments_vh AS"));

    // Le ';' du CREATE INDEX commenté isole un bloc de commentaires, ignoré
    assert!(statements[4]
        .sql
        .starts_with("CREATE OR REPLACE VIEW map_tx_segments_joint"));
}

#[test]
fn test_preview_is_single_line() {
    let statements = sqlscript::split_statements(MAP_LAYERS_SQL).unwrap();
    let preview = statements[3].preview();

    assert!(!preview.contains('\n'));
    assert!(preview.starts_with("CREATE TABLE map_tx_segments_vh AS SELECT s.id, s.geom FROM"));
    assert!(preview.chars().count() <= sqlscript::PREVIEW_LEN);
}

#[test]
fn test_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("05_create_map_layers.sql");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(MAP_LAYERS_SQL.as_bytes()).unwrap();

    let script = sqlscript::load(&path).unwrap();
    assert_eq!(script.origin(), path.display().to_string());
    assert_eq!(script.statements().unwrap().len(), 5);
}
