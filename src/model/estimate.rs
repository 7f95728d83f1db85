//! Price estimates produced by the cost estimator

use serde::{Deserialize, Serialize};
use std::fmt;

use super::params::{Material, Quality};

/// Qualitative surface complexity bucket
///
/// Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Few triangles, simple surfaces
    Low,
    /// Moderately detailed
    Medium,
    /// Highly detailed surfaces
    High,
}

impl Complexity {
    /// Lowercase label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name and size of the uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Uploaded file name
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

impl FileInfo {
    /// Create file info for an upload
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Itemized price of a print
///
/// Values keep full precision; round only when displaying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Filament cost
    pub material_cost: f64,
    /// Machine time cost
    pub time_cost: f64,
    /// Fixed per-order fee
    pub setup_fee: f64,
    /// Sum of the three components above
    pub total_cost: f64,
}

impl CostBreakdown {
    /// Build a breakdown whose total is the exact sum of its parts
    pub fn new(material_cost: f64, time_cost: f64, setup_fee: f64) -> Self {
        Self {
            material_cost,
            time_cost,
            setup_fee,
            total_cost: material_cost + time_cost + setup_fee,
        }
    }
}

impl fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Material: {}", format_money(self.material_cost))?;
        writeln!(f, "Time:     {}", format_money(self.time_cost))?;
        writeln!(f, "Setup:    {}", format_money(self.setup_fee))?;
        write!(f, "Total:    {}", format_money(self.total_cost))
    }
}

/// Format a monetary amount with two decimals
pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// The full result of pricing one uploaded mesh
///
/// An estimate is a value: recalculating with different parameters produces
/// a new `PrintEstimate` rather than mutating an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintEstimate {
    /// Uploaded file name
    pub file_name: String,
    /// Upload size in bytes
    pub file_size: u64,
    /// Filament
    pub material: Material,
    /// Layer-height tier
    pub quality: Quality,
    /// Infill percentage
    pub infill: u32,
    /// Enclosed volume in cm³
    pub volume_cm3: f64,
    /// Filament weight in grams
    pub weight_grams: f64,
    /// Estimated machine time in minutes
    pub print_time_minutes: f64,
    /// Surface complexity bucket
    pub complexity: Complexity,
    /// Bounding box size in millimeters (x, y, z)
    pub dimensions_mm: [f64; 3],
    /// Triangle count of the parsed mesh
    pub triangle_count: usize,
    /// Price breakdown
    pub cost: CostBreakdown,
}

impl PrintEstimate {
    /// One-paragraph human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} ({} bytes): {} {} at {}% infill, {:.2} cm³, {:.1} g, {:.0} min, {} complexity\n{}",
            self.file_name,
            self.file_size,
            self.material,
            self.quality,
            self.infill,
            self.volume_cm3,
            self.weight_grams,
            self.print_time_minutes,
            self.complexity,
            self.cost
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_sum_of_parts() {
        let cost = CostBreakdown::new(1.234, 5.678, 5.0);
        assert_eq!(cost.total_cost, 1.234 + 5.678 + 5.0);
    }

    #[test]
    fn test_rounding_only_at_display() {
        let cost = CostBreakdown::new(0.004, 0.004, 0.0);
        // Each part rounds to 0.00 but the precise total is kept
        assert_eq!(format_money(cost.material_cost), "0.00");
        assert_eq!(format_money(cost.total_cost), "0.01");
        assert!(cost.to_string().contains("Total:    0.01"));
    }

    #[test]
    fn test_complexity_ordering() {
        assert!(Complexity::Low < Complexity::Medium);
        assert!(Complexity::Medium < Complexity::High);
        assert_eq!(Complexity::High.to_string(), "high");
    }
}
