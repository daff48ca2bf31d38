//! Lecture des tables de couches dans PostgreSQL/PostGIS

use std::error::Error;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use deadpool_postgres::Pool;
use geozero::wkb::Ewkb;
use geozero::ToGeo;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::Row;
use tracing::{debug, info};
use uuid::Uuid;

use super::layer::{LayerData, LayerRow};
use crate::error::PipelineError;

/// Nom de la colonne géométrique par défaut
pub const DEFAULT_GEOM_COL: &str = "geom";

/// Bit "SRID présent" du type EWKB
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

/// Source de tables de couches
#[async_trait]
pub trait LayerSource: Send + Sync {
    /// Lit toutes les lignes d'une table, géométrie comprise
    async fn fetch_layer(&self, table: &str, geom_col: &str) -> Result<LayerData, PipelineError>;
}

#[async_trait]
impl LayerSource for Pool {
    async fn fetch_layer(&self, table: &str, geom_col: &str) -> Result<LayerData, PipelineError> {
        validate_table_name(table)?;

        let client = self.get().await?;
        let rows = client.query(&format!("SELECT * FROM {};", table), &[]).await?;
        debug!(table, rows = rows.len(), "Fetched layer rows");

        rows_to_layer(table, geom_col, &rows)
    }
}

/// Vérifie qu'un nom de table est un identifiant simple ou qualifié (`schema.table`)
pub fn validate_table_name(table: &str) -> Result<(), PipelineError> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*)?$")
            .expect("static identifier regex")
    });

    if re.is_match(table) {
        Ok(())
    } else {
        Err(PipelineError::InvalidTableName(table.to_string()))
    }
}

/// Convertit les lignes d'un `SELECT *` en couche
///
/// Le SRID déclaré est celui de la première géométrie non nulle; un SRID 0
/// signifie "non déclaré".
fn rows_to_layer(table: &str, geom_col: &str, rows: &[Row]) -> Result<LayerData, PipelineError> {
    let mut layer = LayerData::new(table);

    let Some(first) = rows.first() else {
        return Ok(layer);
    };

    let columns = first.columns();
    let geom_idx = columns
        .iter()
        .position(|c| c.name() == geom_col)
        .ok_or_else(|| PipelineError::MissingGeometryColumn {
            table: table.to_string(),
            column: geom_col.to_string(),
        })?;

    let property_idx: Vec<usize> = (0..columns.len())
        .filter(|&i| i != geom_idx && !is_spatial(columns[i].type_()))
        .collect();
    layer.columns = property_idx
        .iter()
        .map(|&i| columns[i].name().to_string())
        .collect();

    for row in rows {
        let geometry = match row.try_get::<_, Option<EwkbBytes>>(geom_idx)? {
            Some(EwkbBytes(bytes)) => {
                layer.observe_srid(ewkb_srid(&bytes))?;
                Some(Ewkb(bytes).to_geo()?)
            }
            None => None,
        };

        let properties = property_idx
            .iter()
            .map(|&i| column_value(row, i))
            .collect::<Result<Vec<Value>, PipelineError>>()?;

        layer.rows.push(LayerRow {
            geometry,
            properties,
        });
    }

    info!(
        table,
        rows = layer.rows.len(),
        srid = ?layer.srid,
        "Loaded layer"
    );
    Ok(layer)
}

fn is_spatial(ty: &Type) -> bool {
    matches!(ty.name(), "geometry" | "geography")
}

/// Convertit une colonne en valeur JSON selon son type SQL
///
/// Dates et UUID sont écrits en texte ISO 8601 / forme à tirets; les types
/// non gérés (intervalles, bytea...) sont exportés à `null`.
fn column_value(row: &Row, idx: usize) -> Result<Value, PipelineError> {
    let column = &row.columns()[idx];

    let value = match column.type_().name() {
        "bool" => row.try_get::<_, Option<bool>>(idx)?.map(Value::from),
        "int2" => row.try_get::<_, Option<i16>>(idx)?.map(Value::from),
        "int4" => row.try_get::<_, Option<i32>>(idx)?.map(Value::from),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.map(Value::from),
        "oid" => row.try_get::<_, Option<u32>>(idx)?.map(Value::from),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| Value::from(f64::from(v))),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.map(Value::from),
        "numeric" => row
            .try_get::<_, Option<PgNumeric>>(idx)?
            .map(|PgNumeric(v)| v.map_or(Value::Null, decimal_to_json)),
        "text" | "varchar" | "bpchar" | "name" | "citext" => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::from)
        }
        "json" | "jsonb" => row.try_get::<_, Option<Value>>(idx)?,
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|d| Value::from(d.to_string())),
        "time" => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|t| Value::from(t.to_string())),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(timestamp_to_json),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(timestamptz_to_json),
        "uuid" => row
            .try_get::<_, Option<Uuid>>(idx)?
            .map(|u| Value::from(u.hyphenated().to_string())),
        "_bool" => row.try_get::<_, Option<Vec<Option<bool>>>>(idx)?.map(array_to_json),
        "_int2" => row.try_get::<_, Option<Vec<Option<i16>>>>(idx)?.map(array_to_json),
        "_int4" => row.try_get::<_, Option<Vec<Option<i32>>>>(idx)?.map(array_to_json),
        "_int8" => row.try_get::<_, Option<Vec<Option<i64>>>>(idx)?.map(array_to_json),
        "_float8" => row.try_get::<_, Option<Vec<Option<f64>>>>(idx)?.map(array_to_json),
        "_text" | "_varchar" => row
            .try_get::<_, Option<Vec<Option<String>>>>(idx)?
            .map(array_to_json),
        other => {
            debug!(column = column.name(), sql_type = other, "Unsupported column type, exported as null");
            None
        }
    };

    Ok(value.unwrap_or(Value::Null))
}

/// EWKB brut d'une colonne `geometry`/`geography` (format binaire PostGIS)
#[derive(Debug)]
struct EwkbBytes(Vec<u8>);

impl<'a> FromSql<'a> for EwkbBytes {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self(raw.to_vec()))
    }

    fn accepts(ty: &Type) -> bool {
        is_spatial(ty)
    }
}

/// Extrait le SRID d'un en-tête EWKB (None si absent ou 0)
pub fn ewkb_srid(ewkb: &[u8]) -> Option<i32> {
    if ewkb.len() < 9 {
        return None;
    }

    let little_endian = ewkb[0] == 1;
    let read_u32 = |bytes: [u8; 4]| {
        if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        }
    };

    let geom_type = read_u32([ewkb[1], ewkb[2], ewkb[3], ewkb[4]]);
    if geom_type & EWKB_SRID_FLAG == 0 {
        return None;
    }

    let srid = read_u32([ewkb[5], ewkb[6], ewkb[7], ewkb[8]]) as i32;
    (srid != 0).then_some(srid)
}

/// Valeur `numeric` (None pour NaN et les infinis, absents de `Decimal`)
#[derive(Debug)]
struct PgNumeric(Option<Decimal>);

/// Signes spéciaux du format binaire: NaN, +Infinity, -Infinity
const NUMERIC_SPECIAL_SIGNS: [u16; 3] = [0xC000, 0xD000, 0xF000];

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() >= 6 && NUMERIC_SPECIAL_SIGNS.contains(&u16::from_be_bytes([raw[4], raw[5]])) {
            return Ok(Self(None));
        }
        Decimal::from_sql(ty, raw).map(|d| Self(Some(d)))
    }

    fn accepts(ty: &Type) -> bool {
        <Decimal as FromSql<'a>>::accepts(ty)
    }
}

/// Décimal vers nombre JSON, arrondi au f64 le plus proche
fn decimal_to_json(value: Decimal) -> Value {
    value
        .to_string()
        .parse::<f64>()
        .map_or(Value::Null, Value::from)
}

/// Date et heure locales au format ISO 8601 (`2024-07-01T12:30:00`)
fn timestamp_to_json(value: NaiveDateTime) -> Value {
    Value::from(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Horodatage UTC au format ISO 8601 (`2024-07-01T12:30:00+00:00`)
fn timestamptz_to_json(value: DateTime<Utc>) -> Value {
    Value::from(value.to_rfc3339())
}

fn array_to_json<T: Into<Value>>(values: Vec<Option<T>>) -> Value {
    Value::Array(
        values
            .into_iter()
            .map(|v| v.map_or(Value::Null, Into::into))
            .collect(),
    )
}
