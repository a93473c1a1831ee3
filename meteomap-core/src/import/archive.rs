use log::{debug, warn};
use shapefile::{
    Shape, ShapeReader,
    dbase::{self, FieldValue, Record},
};
use std::io::{Cursor, Read};
use zip::ZipArchive;

use super::{ImportError, PointFeature};
use crate::coord::Coordinate;

/// Attribute names tried, in order, for a feature's display name.
const NAME_FIELDS: [&str; 2] = ["name", "NAME"];

/// Decode every shapefile inside a zip archive into point features.
///
/// `.shp` entries are taken in archive order, each paired with the `.dbf`
/// of the same stem when one exists. Coordinates are used as stored
/// (x = longitude, y = latitude); non-point geometries are skipped.
pub fn decode_archive(bytes: &[u8]) -> Result<Vec<PointFeature>, ImportError> {
    let entries = read_entries(bytes)?;

    let shp_names: Vec<&String> = entries
        .iter()
        .map(|(name, _)| name)
        .filter(|name| name.to_lowercase().ends_with(".shp"))
        .collect();

    if shp_names.is_empty() {
        return Err(ImportError::Decode(
            "archive contains no .shp file".to_string(),
        ));
    }

    let mut features = Vec::new();
    for shp_name in shp_names {
        let stem = &shp_name[..shp_name.len() - 4];
        let dbf_name = format!("{}.dbf", stem.to_lowercase());

        let shp = entry_bytes(&entries, shp_name);
        let dbf = entries
            .iter()
            .find(|(name, _)| name.to_lowercase() == dbf_name)
            .map(|(_, data)| data.as_slice());

        debug!(
            "decoding {shp_name} ({} bytes, attributes: {})",
            shp.len(),
            dbf.is_some()
        );
        if has_sibling(&entries, stem, "prj") {
            warn!("{stem}.prj present: coordinates are used as stored, without reprojection");
        }

        let layer = decode_layer(shp, dbf)?;
        let outside = outside_geographic_range(&layer);
        if outside > 0 {
            warn!(
                "{outside} of {} points in {shp_name} lie outside ±180/±90; \
                 the layer is probably in a projected CRS and those fetches will fail",
                layer.len()
            );
        }
        features.extend(layer);
    }

    Ok(features)
}

fn read_entries(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>, ImportError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ImportError::Decode(format!("not a zip archive: {e}")))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| ImportError::Decode(format!("unreadable zip entry #{index}: {e}")))?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| ImportError::Decode(format!("unreadable zip entry '{name}': {e}")))?;
        entries.push((name, data));
    }

    Ok(entries)
}

fn has_sibling(entries: &[(String, Vec<u8>)], stem: &str, extension: &str) -> bool {
    let wanted = format!("{}.{extension}", stem.to_lowercase());
    entries.iter().any(|(name, _)| name.to_lowercase() == wanted)
}

/// Points whose x/y cannot be longitude/latitude.
fn outside_geographic_range(features: &[PointFeature]) -> usize {
    features
        .iter()
        .filter(|f| f.coord.lon.abs() > 180.0 || f.coord.lat.abs() > 90.0)
        .count()
}

fn entry_bytes<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> &'a [u8] {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, data)| data.as_slice())
        .unwrap_or_default()
}

fn decode_layer(shp: &[u8], dbf: Option<&[u8]>) -> Result<Vec<PointFeature>, ImportError> {
    let shape_reader = ShapeReader::new(Cursor::new(shp))
        .map_err(|e| ImportError::Decode(format!("invalid .shp: {e}")))?;

    let mut features = Vec::new();
    match dbf {
        Some(dbf) => {
            let dbase_reader = dbase::Reader::new(Cursor::new(dbf))
                .map_err(|e| ImportError::Decode(format!("invalid .dbf: {e}")))?;
            let mut reader = shapefile::Reader::new(shape_reader, dbase_reader);

            for item in reader.iter_shapes_and_records() {
                let (shape, record) =
                    item.map_err(|e| ImportError::Decode(format!("invalid record: {e}")))?;
                if let Some(coord) = point_of(&shape) {
                    features.push(PointFeature::new(coord, name_of(&record)));
                }
            }
        }
        None => {
            let mut shape_reader = shape_reader;
            for shape in shape_reader.iter_shapes() {
                let shape = shape.map_err(|e| ImportError::Decode(format!("invalid shape: {e}")))?;
                if let Some(coord) = point_of(&shape) {
                    features.push(PointFeature::new(coord, None));
                }
            }
        }
    }

    Ok(features)
}

fn point_of(shape: &Shape) -> Option<Coordinate> {
    match shape {
        Shape::Point(p) => Some(Coordinate::new(p.x, p.y)),
        Shape::PointM(p) => Some(Coordinate::new(p.x, p.y)),
        Shape::PointZ(p) => Some(Coordinate::new(p.x, p.y)),
        other => {
            warn!("skipping non-point geometry {:?}", other.shapetype());
            None
        }
    }
}

fn name_of(record: &Record) -> Option<String> {
    NAME_FIELDS.iter().find_map(|field| {
        let text = match record.get(field)? {
            FieldValue::Character(Some(s)) => s.trim().to_string(),
            FieldValue::Numeric(Some(n)) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::{ZipWriter, write::SimpleFileOptions};

    /// Minimal point `.shp` body: 100-byte header plus one record per point.
    pub(crate) fn point_shp(points: &[(f64, f64)]) -> Vec<u8> {
        let file_len = 100 + points.len() * 28;
        let mut out = Vec::with_capacity(file_len);
        out.extend_from_slice(&9994i32.to_be_bytes());
        out.extend_from_slice(&[0u8; 20]);
        out.extend_from_slice(&((file_len / 2) as i32).to_be_bytes());
        out.extend_from_slice(&1000i32.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes());
        for v in [-180.0f64, -90.0, 180.0, 90.0, 0.0, 0.0, 0.0, 0.0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for (i, (x, y)) in points.iter().enumerate() {
            out.extend_from_slice(&((i + 1) as i32).to_be_bytes());
            out.extend_from_slice(&10i32.to_be_bytes());
            out.extend_from_slice(&1i32.to_le_bytes());
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
        }
        out
    }

    /// Minimal dBase III table with one character column.
    pub(crate) fn name_dbf(field: &str, names: &[&str]) -> Vec<u8> {
        const WIDTH: usize = 20;
        let mut out = Vec::new();
        out.push(0x03);
        out.extend_from_slice(&[125, 1, 1]);
        out.extend_from_slice(&(names.len() as u32).to_le_bytes());
        out.extend_from_slice(&((32 + 32 + 1) as u16).to_le_bytes());
        out.extend_from_slice(&((1 + WIDTH) as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 20]);

        let mut descriptor = [0u8; 32];
        descriptor[..field.len()].copy_from_slice(field.as_bytes());
        descriptor[11] = b'C';
        descriptor[16] = WIDTH as u8;
        out.extend_from_slice(&descriptor);
        out.push(0x0D);

        for name in names {
            out.push(b' ');
            let mut cell = [b' '; WIDTH];
            cell[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&cell);
        }
        out.push(0x1A);
        out
    }

    pub(crate) fn zip_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn decodes_points_with_names() {
        let archive = zip_of(&[
            ("cities.shp", point_shp(&[(31.2357, 30.0444), (29.9187, 31.2001)])),
            ("cities.dbf", name_dbf("name", &["Cairo", "Alexandria"])),
        ]);

        let features = decode_archive(&archive).unwrap();
        assert_eq!(
            features,
            vec![
                PointFeature::new(Coordinate::new(31.2357, 30.0444), Some("Cairo".into())),
                PointFeature::new(Coordinate::new(29.9187, 31.2001), Some("Alexandria".into())),
            ]
        );
    }

    #[test]
    fn uppercase_name_field_is_used() {
        let archive = zip_of(&[
            ("PTS.SHP", point_shp(&[(1.0, 2.0)])),
            ("PTS.DBF", name_dbf("NAME", &["Aswan"])),
        ]);

        let features = decode_archive(&archive).unwrap();
        assert_eq!(features[0].display_name(), "Aswan");
    }

    #[test]
    fn missing_dbf_yields_unnamed_points() {
        let archive = zip_of(&[("pts.shp", point_shp(&[(1.0, 2.0), (3.0, 4.0)]))]);

        let features = decode_archive(&archive).unwrap();
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| f.display_name() == "Location"));
        assert_eq!(features[1].coord, Coordinate::new(3.0, 4.0));
    }

    #[test]
    fn projected_points_are_kept_but_flagged() {
        let archive = zip_of(&[
            ("utm.shp", point_shp(&[(300_000.0, 3_300_000.0), (31.2, 30.0)])),
            ("utm.prj", b"PROJCS[\"WGS 84 / UTM zone 36N\"]".to_vec()),
        ]);

        let features = decode_archive(&archive).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].coord, Coordinate::new(300_000.0, 3_300_000.0));
        assert_eq!(outside_geographic_range(&features), 1);

        let entries = read_entries(&archive).unwrap();
        assert!(has_sibling(&entries, "UTM", "prj"));
        assert!(!has_sibling(&entries, "utm", "dbf"));
    }

    #[test]
    fn not_a_zip_is_a_decode_error() {
        let err = decode_archive(b"plain text").unwrap_err();
        assert!(matches!(err, ImportError::Decode(msg) if msg.contains("not a zip")));
    }

    #[test]
    fn zip_without_shp_is_a_decode_error() {
        let archive = zip_of(&[("readme.txt", b"hello".to_vec())]);
        let err = decode_archive(&archive).unwrap_err();
        assert!(matches!(err, ImportError::Decode(msg) if msg.contains("no .shp")));
    }

    #[test]
    fn truncated_shp_is_a_decode_error() {
        let archive = zip_of(&[("broken.shp", vec![0u8; 12])]);
        assert!(matches!(decode_archive(&archive), Err(ImportError::Decode(_))));
    }
}
