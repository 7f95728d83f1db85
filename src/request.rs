//! Request bodies accepted by the estimate and cart endpoints
//!
//! Each body is a closed schema: unknown fields are rejected, and every type
//! has a `from_json` constructor that maps malformed input to
//! [`Error::InvalidRequest`]. Semantic checks (known material, infill range,
//! quantity range) happen when the body is converted into domain values.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cart::{MAX_QUANTITY, MIN_QUANTITY};
use crate::error::{Error, Result};
use crate::model::{MAX_INFILL, MIN_INFILL, Material, PrintParameters, Quality};
use crate::storage::CustomPrintId;

fn parse_body<T: DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::InvalidRequest(format!("{}: {}", what, e)))
}

/// Body of an estimate request
///
/// Material and quality are kept as strings so that an unknown value is
/// reported as an invalid parameter rather than a malformed body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimateRequest {
    /// Material name, e.g. `"PLA"`
    pub material: String,
    /// Quality tier, e.g. `"standard"`
    pub quality: String,
    /// Infill percentage
    pub infill: i64,
}

impl EstimateRequest {
    /// Parse an estimate request body
    pub fn from_json(json: &str) -> Result<Self> {
        parse_body(json, "estimate request")
    }
}

impl TryFrom<EstimateRequest> for PrintParameters {
    type Error = Error;

    fn try_from(request: EstimateRequest) -> Result<Self> {
        let material: Material = request.material.parse()?;
        let quality: Quality = request.quality.parse()?;
        let infill = u32::try_from(request.infill)
            .ok()
            .filter(|i| (MIN_INFILL..=MAX_INFILL).contains(i))
            .ok_or_else(|| {
                Error::out_of_range("infill", request.infill, "between 10 and 100 percent")
            })?;
        PrintParameters::new(material, quality, infill)
    }
}

/// Body of an add-to-cart request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddToCartRequest {
    /// Previously saved custom print
    pub custom_print_id: CustomPrintId,
    /// Number of copies; defaults to one
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

impl AddToCartRequest {
    /// Parse an add-to-cart request body
    pub fn from_json(json: &str) -> Result<Self> {
        parse_body(json, "add-to-cart request")
    }

    /// The requested quantity, checked against the cart's bounds
    pub fn validated_quantity(&self) -> Result<u32> {
        validate_quantity(self.quantity)
    }
}

/// Body of a quantity update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateQuantityRequest {
    /// New quantity for the line
    pub quantity: i64,
}

impl UpdateQuantityRequest {
    /// Parse a quantity update body
    pub fn from_json(json: &str) -> Result<Self> {
        parse_body(json, "quantity update")
    }

    /// The requested quantity, checked against the cart's bounds
    pub fn validated_quantity(&self) -> Result<u32> {
        validate_quantity(self.quantity)
    }
}

fn validate_quantity(quantity: i64) -> Result<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (MIN_QUANTITY..=MAX_QUANTITY).contains(q))
        .ok_or_else(|| Error::out_of_range("quantity", quantity, "between 1 and 99"))
}
