//! Cost estimation
//!
//! Turns a [`MeshAnalysis`] and the customer's [`PrintParameters`] into a
//! [`PrintEstimate`]. The model is deliberately simple:
//!
//! ```text
//! fill        = shell_fraction + (1 - shell_fraction) * infill / 100
//! weight      = volume_cm3 * density * fill
//! layers      = ceil(max(height, min_extent) / layer_height)
//! print_time  = volume_cm3 * fill * minutes_per_cm3 * multiplier + layers * layer_overhead
//! total       = weight * price_per_gram + print_time * machine_rate + setup_fee
//! ```
//!
//! All arithmetic keeps full `f64` precision. Rounding is a display concern.

use tracing::debug;

use crate::config::PricingConfig;
use crate::error::{Error, Result};
use crate::mesh_ops::MeshAnalysis;
use crate::model::{CostBreakdown, FileInfo, PrintEstimate, PrintParameters};

/// Fraction of the solid volume actually extruded
///
/// The shell is always printed, so even the lowest infill uses at least
/// `shell_fraction` of the volume.
pub fn fill_fraction(infill: u32, shell_fraction: f64) -> f64 {
    shell_fraction + (1.0 - shell_fraction) * f64::from(infill) / 100.0
}

/// Number of layers needed to print a part of the given height
pub fn layer_count(height_mm: f64, layer_height_mm: f64, min_extent_mm: f64) -> f64 {
    (height_mm.max(min_extent_mm) / layer_height_mm).ceil()
}

/// Price a print
///
/// # Errors
/// - [`Error::InvalidParameter`] for out-of-range parameters or an unusable
///   configuration
/// - [`Error::Computation`] if any derived quantity is not finite
pub fn estimate_cost(
    analysis: &MeshAnalysis,
    file: &FileInfo,
    params: &PrintParameters,
    config: &PricingConfig,
) -> Result<PrintEstimate> {
    params.validate()?;
    config.validate()?;

    let material = config.materials.get(params.material);
    let quality = config.qualities.get(params.quality);
    let multiplier = config.complexity_multipliers.get(analysis.complexity);

    let volume_cm3 = finite("volume", analysis.volume_cm3)?;
    let fill = fill_fraction(params.infill, config.shell_fraction);
    let weight_grams = finite("weight", volume_cm3 * material.density_g_cm3 * fill)?;

    let height = analysis
        .bounding_box()
        .guarded_extent(config.min_extent_mm)
        .z;
    let layers = layer_count(height, quality.layer_height_mm, config.min_extent_mm);
    let print_time_minutes = finite(
        "print time",
        volume_cm3 * fill * quality.minutes_per_cm3 * multiplier
            + layers * config.layer_overhead_minutes,
    )?;

    let cost = CostBreakdown::new(
        finite("material cost", weight_grams * material.price_per_gram)?,
        finite("time cost", print_time_minutes * config.machine_rate_per_minute)?,
        config.setup_fee,
    );
    finite("total cost", cost.total_cost)?;

    debug!(
        file = %file.name,
        material = %params.material,
        quality = %params.quality,
        infill = params.infill,
        weight_grams,
        print_time_minutes,
        total = cost.total_cost,
        "priced print"
    );

    Ok(PrintEstimate {
        file_name: file.name.clone(),
        file_size: file.size,
        material: params.material,
        quality: params.quality,
        infill: params.infill,
        volume_cm3,
        weight_grams,
        print_time_minutes,
        complexity: analysis.complexity,
        dimensions_mm: analysis.dimensions_mm(),
        triangle_count: analysis.triangle_count,
        cost,
    })
}

fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Computation(format!("{} is not finite ({})", name, value)))
    }
}
