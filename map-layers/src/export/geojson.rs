//! Écriture GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

use super::layer::LayerRow;
use crate::error::PipelineError;

/// Écrit une couche en GeoJSON (FeatureCollection avec membre `crs`)
///
/// Le fichier est d'abord écrit à côté de la cible puis renommé: un export
/// interrompu ne laisse jamais de fichier partiel à l'emplacement final.
pub fn write_layer(
    output_path: &Path,
    epsg: u32,
    columns: &[String],
    rows: &[LayerRow],
) -> Result<(), PipelineError> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = partial_path(output_path);
    let result = write_to(&tmp_path, epsg, columns, rows);
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, output_path)?;
    Ok(())
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    output_path.with_file_name(name)
}

fn write_to(
    path: &Path,
    epsg: u32,
    columns: &[String],
    rows: &[LayerRow],
) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        epsg
    )?;

    let mut geom_buf = Vec::with_capacity(1024);
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        write_feature(&mut writer, i, columns, row, &mut geom_buf)?;
    }

    // Footer
    writer.write_all(b"]}")?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(())
}

/// Écrit une feature; l'identifiant est la position de la ligne
fn write_feature<W: Write>(
    writer: &mut W,
    index: usize,
    columns: &[String],
    row: &LayerRow,
    geom_buf: &mut Vec<u8>,
) -> Result<(), PipelineError> {
    write!(writer, r#"{{"type":"Feature","id":"{}","geometry":"#, index)?;

    match &row.geometry {
        Some(geometry) => {
            geom_buf.clear();
            let mut geom_writer = GeoJsonWriter::new(&mut *geom_buf);
            geometry.process_geom(&mut geom_writer)?;
            writer.write_all(geom_buf)?;
        }
        None => writer.write_all(b"null")?,
    }

    writer.write_all(br#","properties":{"#)?;
    for (i, (key, value)) in columns.iter().zip(&row.properties).enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut *writer, key)?;
        writer.write_all(b":")?;
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"}}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point, Polygon, LineString};
    use serde_json::{json, Value};
    use std::io::Cursor;

    #[test]
    fn test_write_feature() {
        let row = LayerRow {
            geometry: Some(Geometry::Point(Point::new(1.0, 2.0))),
            properties: vec![json!(7), json!("Say \"hi\"\n"), Value::Null],
        };
        let columns = vec!["id".to_string(), "label".to_string(), "note".to_string()];

        let mut buffer = Cursor::new(Vec::new());
        write_feature(&mut buffer, 3, &columns, &row, &mut Vec::new()).unwrap();

        let json: Value = serde_json::from_slice(&buffer.into_inner()).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["id"], "3");
        assert_eq!(json["geometry"]["type"], "Point");
        // GeoJsonWriter écrit `[1,2]`: comparaison en f64
        let coords: Vec<f64> = json["geometry"]["coordinates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_f64().unwrap())
            .collect();
        assert_eq!(coords, vec![1.0, 2.0]);
        assert_eq!(json["properties"]["label"], "Say \"hi\"\n");
        assert_eq!(json["properties"]["note"], Value::Null);
    }

    #[test]
    fn test_write_feature_null_geometry() {
        let row = LayerRow {
            geometry: None,
            properties: vec![],
        };

        let mut buffer = Cursor::new(Vec::new());
        write_feature(&mut buffer, 0, &[], &row, &mut Vec::new()).unwrap();

        let json: Value = serde_json::from_slice(&buffer.into_inner()).unwrap();
        assert_eq!(json["geometry"], Value::Null);
        assert_eq!(json["properties"], json!({}));
    }

    #[test]
    fn test_write_layer() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("map").join("export").join("polygons_vh.geojson");

        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        let rows = vec![
            LayerRow {
                geometry: Some(Geometry::Polygon(square)),
                properties: vec![json!("VH")],
            },
            LayerRow {
                geometry: Some(Geometry::Point(Point::new(5.0, 47.0))),
                properties: vec![json!("H")],
            },
        ];

        write_layer(&output_path, 4326, &["zone".to_string()], &rows).unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        let json: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::4326");
        assert_eq!(json["features"].as_array().unwrap().len(), 2);
        assert_eq!(json["features"][1]["properties"]["zone"], "H");

        assert!(!partial_path(&output_path).exists());
    }

    #[test]
    fn test_write_layer_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("tx_lines_all.geojson");
        std::fs::write(&output_path, "stale").unwrap();

        let rows = vec![LayerRow {
            geometry: Some(Geometry::Point(Point::new(0.0, 0.0))),
            properties: vec![],
        }];
        write_layer(&output_path, 4326, &[], &rows).unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.starts_with(r#"{"type":"FeatureCollection""#));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("map/export/a.geojson")),
            PathBuf::from("map/export/a.geojson.partial")
        );
    }
}
