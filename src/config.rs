//! Pricing and upload configuration
//!
//! [`PricingConfig`] holds every tunable number the estimator uses. The
//! defaults describe a typical FDM print service; shops override them from a
//! JSON file, where any omitted field keeps its default.
//!
//! ```
//! use printquote::PricingConfig;
//!
//! let config = PricingConfig::from_json_str(r#"{ "setup_fee": 3.5 }"#).unwrap();
//! assert_eq!(config.setup_fee, 3.5);
//! assert_eq!(config.machine_rate_per_minute, PricingConfig::default().machine_rate_per_minute);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Complexity, Material, Quality};
use crate::parser::MeshFormat;

/// Default upload ceiling: 50 MiB
pub const DEFAULT_MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Default ceiling on one decompressed 3MF part: 256 MiB
pub const DEFAULT_MAX_PART_SIZE: usize = 256 * 1024 * 1024;

/// Physical and commercial properties of one filament
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProfile {
    /// Density in g/cm³
    pub density_g_cm3: f64,
    /// Selling price per gram
    pub price_per_gram: f64,
}

/// Per-material profiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialTable {
    /// PLA profile
    pub pla: MaterialProfile,
    /// ABS profile
    pub abs: MaterialProfile,
    /// PETG profile
    pub petg: MaterialProfile,
    /// TPU profile
    pub tpu: MaterialProfile,
}

impl MaterialTable {
    /// Profile for a material
    pub fn get(&self, material: Material) -> &MaterialProfile {
        match material {
            Material::Pla => &self.pla,
            Material::Abs => &self.abs,
            Material::Petg => &self.petg,
            Material::Tpu => &self.tpu,
        }
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self {
            pla: MaterialProfile {
                density_g_cm3: 1.24,
                price_per_gram: 0.05,
            },
            abs: MaterialProfile {
                density_g_cm3: 1.04,
                price_per_gram: 0.055,
            },
            petg: MaterialProfile {
                density_g_cm3: 1.27,
                price_per_gram: 0.06,
            },
            tpu: MaterialProfile {
                density_g_cm3: 1.21,
                price_per_gram: 0.09,
            },
        }
    }
}

/// Timing properties of one quality tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Layer height in mm
    pub layer_height_mm: f64,
    /// Machine minutes per cm³ of deposited material
    pub minutes_per_cm3: f64,
}

/// Per-quality profiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityTable {
    /// Draft profile
    pub draft: QualityProfile,
    /// Standard profile
    pub standard: QualityProfile,
    /// Fine profile
    pub fine: QualityProfile,
}

impl QualityTable {
    /// Profile for a quality tier
    pub fn get(&self, quality: Quality) -> &QualityProfile {
        match quality {
            Quality::Draft => &self.draft,
            Quality::Standard => &self.standard,
            Quality::Fine => &self.fine,
        }
    }
}

impl Default for QualityTable {
    fn default() -> Self {
        Self {
            draft: QualityProfile {
                layer_height_mm: 0.3,
                minutes_per_cm3: 3.0,
            },
            standard: QualityProfile {
                layer_height_mm: 0.2,
                minutes_per_cm3: 4.5,
            },
            fine: QualityProfile {
                layer_height_mm: 0.1,
                minutes_per_cm3: 8.0,
            },
        }
    }
}

/// Print-time multipliers per complexity bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityMultipliers {
    /// Multiplier for [`Complexity::Low`]
    pub low: f64,
    /// Multiplier for [`Complexity::Medium`]
    pub medium: f64,
    /// Multiplier for [`Complexity::High`]
    pub high: f64,
}

impl ComplexityMultipliers {
    /// Multiplier for a complexity bucket
    pub fn get(&self, complexity: Complexity) -> f64 {
        match complexity {
            Complexity::Low => self.low,
            Complexity::Medium => self.medium,
            Complexity::High => self.high,
        }
    }
}

impl Default for ComplexityMultipliers {
    fn default() -> Self {
        Self {
            low: 1.0,
            medium: 1.2,
            high: 1.5,
        }
    }
}

/// Bucket boundaries for the complexity label
///
/// A mesh reaches a bucket when either its triangle count or its triangle
/// density (triangles per cm³) reaches that bucket's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityThresholds {
    /// Triangle count at which a mesh is at least medium
    pub medium_triangles: usize,
    /// Triangle count at which a mesh is high
    pub high_triangles: usize,
    /// Triangles per cm³ at which a mesh is at least medium
    pub medium_density: f64,
    /// Triangles per cm³ at which a mesh is high
    pub high_density: f64,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            medium_triangles: 1_000,
            high_triangles: 20_000,
            medium_density: 200.0,
            high_density: 2_000.0,
        }
    }
}

/// Upload gate applied before parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Largest accepted upload in bytes
    pub max_file_size: usize,
    /// Largest decompressed size in bytes of any part read from a 3MF package
    pub max_part_size: usize,
    /// Accepted mesh formats
    pub allowed_formats: Vec<MeshFormat>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_part_size: DEFAULT_MAX_PART_SIZE,
            allowed_formats: vec![MeshFormat::Stl, MeshFormat::ThreeMf],
        }
    }
}

/// Configuration for the cost estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Filament properties
    pub materials: MaterialTable,
    /// Quality tier properties
    pub qualities: QualityTable,
    /// Print-time multipliers per complexity bucket
    pub complexity_multipliers: ComplexityMultipliers,
    /// Complexity bucket boundaries
    pub complexity_thresholds: ComplexityThresholds,
    /// Machine time price per minute
    pub machine_rate_per_minute: f64,
    /// Fixed fee added to every estimate
    pub setup_fee: f64,
    /// Fraction of the solid volume always printed as walls and skins
    pub shell_fraction: f64,
    /// Extra machine minutes per layer (travel, z-hop, retraction)
    pub layer_overhead_minutes: f64,
    /// Smallest extent in mm used where a bounding-box dimension feeds a computation
    pub min_extent_mm: f64,
    /// Upload gate
    pub upload: UploadLimits,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            materials: MaterialTable::default(),
            qualities: QualityTable::default(),
            complexity_multipliers: ComplexityMultipliers::default(),
            complexity_thresholds: ComplexityThresholds::default(),
            machine_rate_per_minute: 0.04,
            setup_fee: 5.0,
            shell_fraction: 0.15,
            layer_overhead_minutes: 0.02,
            min_extent_mm: 0.001,
            upload: UploadLimits::default(),
        }
    }
}

impl PricingConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; omitted fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidParameter(format!("Invalid pricing configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Set the fixed setup fee
    pub fn with_setup_fee(mut self, fee: f64) -> Self {
        self.setup_fee = fee;
        self
    }

    /// Set the machine time price per minute
    pub fn with_machine_rate(mut self, rate_per_minute: f64) -> Self {
        self.machine_rate_per_minute = rate_per_minute;
        self
    }

    /// Set the profile of one material
    pub fn with_material(mut self, material: Material, profile: MaterialProfile) -> Self {
        match material {
            Material::Pla => self.materials.pla = profile,
            Material::Abs => self.materials.abs = profile,
            Material::Petg => self.materials.petg = profile,
            Material::Tpu => self.materials.tpu = profile,
        }
        self
    }

    /// Set the largest accepted upload in bytes
    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.upload.max_file_size = bytes;
        self
    }

    /// Set the largest decompressed 3MF part in bytes
    pub fn with_max_part_size(mut self, bytes: usize) -> Self {
        self.upload.max_part_size = bytes;
        self
    }

    /// Check that every rate, density and fraction is usable
    ///
    /// Finer quality must not be faster than coarser quality and higher
    /// complexity must not be cheaper than lower complexity; otherwise the
    /// estimator would stop being monotonic.
    pub fn validate(&self) -> Result<()> {
        for material in Material::ALL {
            let profile = self.materials.get(material);
            positive(&format!("{} density", material), profile.density_g_cm3)?;
            non_negative(&format!("{} price per gram", material), profile.price_per_gram)?;
        }

        let mut previous: Option<&QualityProfile> = None;
        for quality in Quality::ALL {
            let profile = self.qualities.get(quality);
            positive(&format!("{} layer height", quality), profile.layer_height_mm)?;
            positive(&format!("{} minutes per cm³", quality), profile.minutes_per_cm3)?;
            if let Some(prev) = previous {
                if profile.layer_height_mm > prev.layer_height_mm
                    || profile.minutes_per_cm3 < prev.minutes_per_cm3
                {
                    return Err(Error::InvalidParameter(format!(
                        "Quality '{}' must not be coarser or faster than the tier below it",
                        quality
                    )));
                }
            }
            previous = Some(profile);
        }

        let m = &self.complexity_multipliers;
        positive("low complexity multiplier", m.low)?;
        if m.medium < m.low || m.high < m.medium {
            return Err(Error::InvalidParameter(
                "Complexity multipliers must not decrease from low to high".to_string(),
            ));
        }

        let t = &self.complexity_thresholds;
        if t.high_triangles < t.medium_triangles || t.high_density < t.medium_density {
            return Err(Error::InvalidParameter(
                "High complexity thresholds must not be below medium thresholds".to_string(),
            ));
        }

        non_negative("machine rate per minute", self.machine_rate_per_minute)?;
        non_negative("setup fee", self.setup_fee)?;
        non_negative("layer overhead minutes", self.layer_overhead_minutes)?;
        positive("minimum extent", self.min_extent_mm)?;
        if !(self.shell_fraction > 0.0 && self.shell_fraction <= 1.0) {
            return Err(Error::out_of_range(
                "shell_fraction",
                self.shell_fraction,
                "greater than 0 and at most 1",
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::out_of_range(name, value, "a finite number greater than 0"))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::out_of_range(name, value, "a finite number of at least 0"))
    }
}
