use nalgebra::{Point3, Vector3};

/// Snapshot of one series' points. The position of a point in `points`
/// is its index; `normals[i]` belongs to `points[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point3<f64>>,
    pub normals: Vec<Vector3<f64>>,
}

impl PointCloud {
    /// Rejects mismatched lengths and non-finite coordinates or normals.
    pub fn new(points: Vec<Point3<f64>>, normals: Vec<Vector3<f64>>) -> crate::Result<Self> {
        if normals.len() != points.len() {
            return Err(crate::Error::InvalidInput(format!(
                "Normal count {} does not match point count {}",
                normals.len(),
                points.len()
            )));
        }
        if let Some(i) = points.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(crate::Error::InvalidInput(format!(
                "Point {} has a non-finite coordinate",
                i
            )));
        }
        if let Some(i) = normals.iter().position(|n| !n.iter().all(|c| c.is_finite())) {
            return Err(crate::Error::InvalidInput(format!(
                "Normal {} has a non-finite component",
                i
            )));
        }
        Ok(Self { points, normals })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn coordinate(&self, index: usize) -> Option<&Point3<f64>> {
        self.points.get(index)
    }

    pub fn normal(&self, index: usize) -> Option<&Vector3<f64>> {
        self.normals.get(index)
    }

    /// Coordinates of `indices`, in the order given.
    pub fn extract_coordinates(&self, indices: &[usize]) -> crate::Result<Vec<Point3<f64>>> {
        indices
            .iter()
            .map(|&i| self.coordinate(i).copied().ok_or_else(|| self.out_of_range(i)))
            .collect()
    }

    /// Normals of `indices`, in the order given.
    pub fn extract_normals(&self, indices: &[usize]) -> crate::Result<Vec<Vector3<f64>>> {
        indices
            .iter()
            .map(|&i| self.normal(i).copied().ok_or_else(|| self.out_of_range(i)))
            .collect()
    }

    /// Checks that every index addresses a point of this cloud.
    pub fn check_indices(&self, indices: &[usize]) -> crate::Result<()> {
        match indices.iter().find(|&&i| i >= self.len()) {
            Some(&i) => Err(self.out_of_range(i)),
            None => Ok(()),
        }
    }

    /// Keeps the points for which `keep` returns true. Indices are
    /// renumbered, so this ends the lifetime of the current snapshot.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Point3<f64>, &Vector3<f64>) -> bool,
    {
        let before = self.len();
        let (points, normals): (Vec<_>, Vec<_>) = self
            .points
            .iter()
            .zip(self.normals.iter())
            .filter(|(p, n)| keep(p, n))
            .map(|(p, n)| (*p, *n))
            .unzip();
        self.points = points;
        self.normals = normals;
        before - self.len()
    }

    fn out_of_range(&self, index: usize) -> crate::Error {
        crate::Error::InvalidInput(format!(
            "Point index {} out of range for cloud of {} points",
            index,
            self.len()
        ))
    }
}
