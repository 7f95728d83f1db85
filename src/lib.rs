//! # printquote
//!
//! Print-cost estimation for customer-uploaded 3D models.
//!
//! A mesh file (binary STL, ASCII STL or 3MF) is parsed into triangles, its
//! volume, bounding box and complexity are derived, and those quantities are
//! combined with the chosen material, quality and infill into an itemized
//! price.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Binary and ASCII STL, 3MF packages with unit scaling and build transforms
//! - Deterministic pricing driven by a serde-loadable [`PricingConfig`]
//! - A calculator session state machine with last-write-wins parse tokens
//! - Custom print persistence and session-guarded carts
//!
//! ## Example
//!
//! ```no_run
//! use printquote::{Material, PrintParameters, Quality};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("bracket.stl")?;
//! let params = PrintParameters::new(Material::Petg, Quality::Standard, 20)?;
//! let estimate = printquote::estimate("bracket.stl", &bytes, &params)?;
//!
//! println!("{}", estimate.summary());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod calculator;
pub mod cart;
pub mod config;
pub mod error;
pub mod mesh_ops;
pub mod model;
pub mod parser;
pub mod pricing;
pub mod request;
pub mod storage;
pub mod writer;

pub use calculator::{CalculatorSession, CalculatorState, FileToken, ParseJob, ParseOutcome};
pub use cart::{Cart, CartItem, CartStore, LineId, SessionId};
pub use config::{PricingConfig, UploadLimits};
pub use error::{Error, ErrorKind, Result};
pub use mesh_ops::MeshAnalysis;
pub use model::{
    BoundingBox, Complexity, CostBreakdown, FileInfo, Material, Mesh, PrintEstimate,
    PrintParameters, Quality, Triangle,
};
pub use parser::MeshFormat;
pub use request::{AddToCartRequest, EstimateRequest, UpdateQuantityRequest};
pub use storage::{CustomPrintId, CustomPrintStore, DirectoryStore, MemoryStore};

use tracing::info;

/// Price an uploaded mesh with the default configuration
///
/// # Arguments
///
/// * `file_name` - Uploaded file name; its extension selects the reader
/// * `bytes` - File contents
/// * `params` - Material, quality and infill
pub fn estimate(file_name: &str, bytes: &[u8], params: &PrintParameters) -> Result<PrintEstimate> {
    estimate_with_config(file_name, bytes, params, &PricingConfig::default())
}

/// Price an uploaded mesh with an explicit configuration
///
/// Parameters are checked before the file is parsed, so a bad request never
/// pays for parsing a large upload.
pub fn estimate_with_config(
    file_name: &str,
    bytes: &[u8],
    params: &PrintParameters,
    config: &PricingConfig,
) -> Result<PrintEstimate> {
    params.validate()?;
    let mesh = parser::load_mesh(file_name, bytes, &config.upload)?;
    let analysis = mesh_ops::analyze(&mesh, &config.complexity_thresholds);
    let file = FileInfo::new(file_name, bytes.len() as u64);
    let estimate = pricing::estimate_cost(&analysis, &file, params, config)?;
    info!(
        file = file_name,
        triangles = estimate.triangle_count,
        total = estimate.cost.total_cost,
        "estimated upload"
    );
    Ok(estimate)
}
