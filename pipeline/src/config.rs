//! Alignment run configuration, loadable from YAML.

use align_core::{Error, Result, UpAxis};
use align_point_cloud::{NormalConfig, SegmentationConfig};
use align_registration::RegistrationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Temporary visualization markers drawn during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub enabled: bool,
    /// Edge length of the plane marker.
    pub plane_size: f64,
    pub circle_radius: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            plane_size: 1000.0,
            circle_radius: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub segmentation: SegmentationConfig,
    pub up_axis: UpAxis,
    pub markers: MarkerConfig,
    /// Fewer above-plane points than this fail the series. Never below 3.
    pub min_correspondences: usize,
    pub registration: RegistrationConfig,
    pub normals: NormalConfig,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            up_axis: UpAxis::Y,
            markers: MarkerConfig::default(),
            min_correspondences: align_registration::registration::MIN_CORRESPONDENCES,
            registration: RegistrationConfig::default(),
            normals: NormalConfig::default(),
        }
    }
}

impl AlignConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Parse(format!("config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Parse(format!("config: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Correspondence threshold actually enforced.
    pub fn effective_min_correspondences(&self) -> usize {
        self.min_correspondences
            .max(align_registration::registration::MIN_CORRESPONDENCES)
    }

    pub fn without_markers(mut self) -> Self {
        self.markers.enabled = false;
        self
    }
}
