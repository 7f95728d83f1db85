//! User-selected print parameters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lowest accepted infill percentage
pub const MIN_INFILL: u32 = 10;

/// Highest accepted infill percentage
pub const MAX_INFILL: u32 = 100;

/// Printable filament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Material {
    /// Polylactic acid
    Pla,
    /// Acrylonitrile butadiene styrene
    Abs,
    /// Glycol-modified polyethylene terephthalate
    Petg,
    /// Thermoplastic polyurethane (flexible)
    Tpu,
}

impl Material {
    /// All materials offered by the calculator
    pub const ALL: [Material; 4] = [Material::Pla, Material::Abs, Material::Petg, Material::Tpu];

    /// Display name as used on the storefront
    pub fn name(&self) -> &'static str {
        match self {
            Material::Pla => "PLA",
            Material::Abs => "ABS",
            Material::Petg => "PETG",
            Material::Tpu => "TPU",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Material {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Material::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "Unknown material '{}'. Must be one of: PLA, ABS, PETG, TPU",
                    s
                ))
            })
    }
}

/// Layer-height tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Thick layers, fastest
    Draft,
    /// Default layer height
    Standard,
    /// Thin layers, slowest
    Fine,
}

impl Quality {
    /// All quality tiers, coarsest first
    pub const ALL: [Quality; 3] = [Quality::Draft, Quality::Standard, Quality::Fine];

    /// Lowercase identifier used in requests
    pub fn name(&self) -> &'static str {
        match self {
            Quality::Draft => "draft",
            Quality::Standard => "standard",
            Quality::Fine => "fine",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Quality::ALL
            .into_iter()
            .find(|q| q.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "Unknown quality '{}'. Must be one of: draft, standard, fine",
                    s
                ))
            })
    }
}

/// Material, quality and infill chosen for a print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintParameters {
    /// Filament to print with
    pub material: Material,
    /// Layer-height tier
    pub quality: Quality,
    /// Infill percentage, 10 to 100 inclusive
    pub infill: u32,
}

impl PrintParameters {
    /// Create validated print parameters
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] when `infill` is outside 10..=100.
    pub fn new(material: Material, quality: Quality, infill: u32) -> Result<Self> {
        let params = Self {
            material,
            quality,
            infill,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the infill range; out-of-range values are rejected, never clamped
    pub fn validate(&self) -> Result<()> {
        if !(MIN_INFILL..=MAX_INFILL).contains(&self.infill) {
            return Err(Error::out_of_range(
                "infill",
                self.infill,
                "between 10 and 100 percent",
            ));
        }
        Ok(())
    }
}
