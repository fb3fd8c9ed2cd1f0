//! PLY (Polygon File Format) I/O
//!
//! ASCII PLY with `x y z` and optional `nx ny nz` vertex properties. Other
//! vertex properties (colors, intensities) are skipped on read.

use align_core::{Error, PointCloud, Result};
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Vertices of a PLY file; normals only if the file declares them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlyVertices {
    pub points: Vec<Point3<f64>>,
    pub normals: Option<Vec<Vector3<f64>>>,
}

impl PlyVertices {
    /// Convert into a cloud, filling in normals with `estimate` when the
    /// file carried none.
    pub fn into_cloud_with<F>(self, estimate: F) -> Result<PointCloud>
    where
        F: FnOnce(&[Point3<f64>]) -> Vec<Vector3<f64>>,
    {
        let normals = match self.normals {
            Some(n) => n,
            None => estimate(&self.points),
        };
        PointCloud::new(self.points, normals)
    }
}

#[derive(Default)]
struct VertexLayout {
    count: usize,
    properties: Vec<String>,
}

impl VertexLayout {
    fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p == name)
    }
}

/// Read a PLY file from a reader
pub fn read_ply<R: BufRead>(reader: R) -> Result<PlyVertices> {
    let mut lines = reader.lines();

    // Parse header
    let mut in_header = true;
    let mut format = String::new();
    let mut layout = VertexLayout::default();
    let mut in_vertex_element = false;
    let mut seen_magic = false;

    while in_header {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse("Unexpected EOF in header".to_string()))??;

        let line = line.trim();

        if !seen_magic {
            if line != "ply" {
                return Err(Error::Parse("Missing 'ply' magic line".to_string()));
            }
            seen_magic = true;
        } else if line.starts_with("format ") {
            format = line
                .split_whitespace()
                .nth(1)
                .ok_or_else(|| Error::Parse("Invalid format line".to_string()))?
                .to_string();
        } else if line.starts_with("element ") {
            let mut parts = line.split_whitespace().skip(1);
            in_vertex_element = parts.next() == Some("vertex");
            if in_vertex_element {
                layout.count = parts
                    .next()
                    .ok_or_else(|| Error::Parse("Invalid vertex count".to_string()))?
                    .parse()
                    .map_err(|_| Error::Parse("Invalid vertex count number".to_string()))?;
            }
        } else if line.starts_with("property ") {
            if in_vertex_element {
                let name = line
                    .split_whitespace()
                    .last()
                    .ok_or_else(|| Error::Parse("Invalid property line".to_string()))?;
                layout.properties.push(name.to_string());
            }
        } else if line == "end_header" {
            in_header = false;
        }
    }

    if format != "ascii" {
        return Err(Error::UnsupportedFormat(format!(
            "PLY format '{}' not supported, only ASCII",
            format
        )));
    }

    let xyz = match (layout.position("x"), layout.position("y"), layout.position("z")) {
        (Some(x), Some(y), Some(z)) => [x, y, z],
        _ => {
            return Err(Error::Parse(
                "Vertex element lacks x/y/z properties".to_string(),
            ))
        }
    };
    let nxyz = match (
        layout.position("nx"),
        layout.position("ny"),
        layout.position("nz"),
    ) {
        (Some(x), Some(y), Some(z)) => Some([x, y, z]),
        _ => None,
    };

    // Parse data
    let mut points = Vec::with_capacity(layout.count);
    let mut normals = nxyz.map(|_| Vec::with_capacity(layout.count));

    for _ in 0..layout.count {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse("Unexpected EOF in data".to_string()))??;

        let values: Vec<f64> = line
            .split_whitespace()
            .map(|s| {
                s.parse()
                    .map_err(|_| Error::Parse(format!("Invalid number: {}", s)))
            })
            .collect::<Result<Vec<_>>>()?;

        if values.len() < layout.properties.len() {
            return Err(Error::InvalidInput(format!(
                "Vertex has {} values, header declares {}",
                values.len(),
                layout.properties.len()
            )));
        }

        points.push(Point3::new(values[xyz[0]], values[xyz[1]], values[xyz[2]]));

        if let (Some(idx), Some(normals)) = (nxyz, normals.as_mut()) {
            normals.push(Vector3::new(values[idx[0]], values[idx[1]], values[idx[2]]));
        }
    }

    Ok(PlyVertices { points, normals })
}

/// Write a point cloud to PLY format
pub fn write_ply<W: Write>(writer: &mut W, cloud: &PointCloud) -> Result<()> {
    // Write header
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "property double nx")?;
    writeln!(writer, "property double ny")?;
    writeln!(writer, "property double nz")?;
    writeln!(writer, "end_header")?;

    // Write data
    for (p, n) in cloud.points.iter().zip(&cloud.normals) {
        writeln!(writer, "{} {} {} {} {} {}", p.x, p.y, p.z, n.x, n.y, n.z)?;
    }

    Ok(())
}

pub fn read_ply_file<P: AsRef<Path>>(path: P) -> Result<PlyVertices> {
    read_ply(BufReader::new(File::open(path)?))
}

pub fn write_ply_file<P: AsRef<Path>>(path: P, cloud: &PointCloud) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_ply(&mut writer, cloud)?;
    writer.flush()?;
    Ok(())
}
