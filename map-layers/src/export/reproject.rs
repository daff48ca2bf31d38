//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.

use geo::Geometry;

use crate::error::PipelineError;

/// Code EPSG du WGS84
pub const WGS84: u32 = 4326;

#[cfg(feature = "reproject")]
use geo::{Coord, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Reprojection de géométries entre deux systèmes de coordonnées
#[cfg(feature = "reproject")]
pub struct Reprojector {
    proj: Proj,
    source_epsg: u32,
    target_epsg: u32,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un nouveau reprojector entre deux EPSG
    ///
    /// Les axes sont en ordre SIG (x = longitude, y = latitude).
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, PipelineError> {
        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        let proj = Proj::new_known_crs(&source, &target, None).map_err(|e| {
            PipelineError::Reprojection(format!(
                "Failed to create projection from {} to {}: {}",
                source, target, e
            ))
        })?;

        Ok(Self {
            proj,
            source_epsg,
            target_epsg,
        })
    }

    /// Reprojector vers le WGS84
    pub fn to_wgs84(source_epsg: u32) -> Result<Self, PipelineError> {
        Self::new(source_epsg, WGS84)
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry, PipelineError> {
        if self.source_epsg == self.target_epsg {
            return Ok(geom.clone());
        }

        match geom {
            Geometry::Point(p) => Ok(Geometry::Point(Point(self.transform_coord(p.0)?))),
            Geometry::Line(l) => {
                let ls = LineString::new(vec![l.start, l.end]);
                Ok(Geometry::LineString(self.transform_linestring(&ls)?))
            }
            Geometry::LineString(ls) => Ok(Geometry::LineString(self.transform_linestring(ls)?)),
            Geometry::Polygon(p) => Ok(Geometry::Polygon(self.transform_polygon(p)?)),
            Geometry::MultiPoint(mp) => {
                let points = mp
                    .0
                    .iter()
                    .map(|p| Ok(Point(self.transform_coord(p.0)?)))
                    .collect::<Result<Vec<Point>, PipelineError>>()?;
                Ok(Geometry::MultiPoint(MultiPoint::new(points)))
            }
            Geometry::MultiLineString(mls) => {
                let lines = mls
                    .0
                    .iter()
                    .map(|ls| self.transform_linestring(ls))
                    .collect::<Result<Vec<LineString>, PipelineError>>()?;
                Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
            }
            Geometry::MultiPolygon(mp) => {
                let polys = mp
                    .0
                    .iter()
                    .map(|p| self.transform_polygon(p))
                    .collect::<Result<Vec<Polygon>, PipelineError>>()?;
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polys)))
            }
            Geometry::GeometryCollection(gc) => {
                let geoms = gc
                    .0
                    .iter()
                    .map(|g| self.transform_geometry(g))
                    .collect::<Result<Vec<Geometry>, PipelineError>>()?;
                Ok(Geometry::GeometryCollection(GeometryCollection::new_from(geoms)))
            }
            // Un rectangle ou un triangle reprojeté n'est plus axis-aligned
            Geometry::Rect(r) => Ok(Geometry::Polygon(self.transform_polygon(&r.to_polygon())?)),
            Geometry::Triangle(t) => {
                Ok(Geometry::Polygon(self.transform_polygon(&t.to_polygon())?))
            }
        }
    }

    /// Transforme une coordonnée unique
    fn transform_coord(&self, coord: Coord) -> Result<Coord, PipelineError> {
        let (x, y) = self
            .proj
            .convert((coord.x, coord.y))
            .map_err(|e| PipelineError::Reprojection(format!("Coordinate transformation failed: {}", e)))?;
        Ok(Coord { x, y })
    }

    /// Transforme une LineString (conversion par lot)
    fn transform_linestring(&self, ls: &LineString) -> Result<LineString, PipelineError> {
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        self.proj.convert_array(&mut coords).map_err(|e| {
            PipelineError::Reprojection(format!("Batch coordinate transformation failed: {}", e))
        })?;

        Ok(LineString::new(
            coords.into_iter().map(|(x, y)| Coord { x, y }).collect(),
        ))
    }

    /// Transforme un Polygon
    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon, PipelineError> {
        let exterior = self.transform_linestring(p.exterior())?;
        let interiors = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect::<Result<Vec<LineString>, PipelineError>>()?;
        Ok(Polygon::new(exterior, interiors))
    }
}


/// Reprojector factice - pas de reprojection disponible
#[cfg(not(feature = "reproject"))]
pub struct Reprojector;

#[cfg(not(feature = "reproject"))]
impl Reprojector {
    /// Tente de créer un reprojector - échoue toujours sans la feature
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, PipelineError> {
        if source_epsg == target_epsg {
            Ok(Self)
        } else {
            Err(PipelineError::Reprojection(format!(
                "Reprojection from EPSG:{} to EPSG:{} requires the 'reproject' feature. \
                 Build with: cargo build --features reproject",
                source_epsg, target_epsg
            )))
        }
    }

    /// Reprojector vers le WGS84
    pub fn to_wgs84(source_epsg: u32) -> Result<Self, PipelineError> {
        Self::new(source_epsg, WGS84)
    }

    /// Retourne la géométrie inchangée (pas de reprojection)
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry, PipelineError> {
        Ok(geom.clone())
    }
}
