//! Session-scoped shopping carts
//!
//! A [`Cart`] belongs to exactly one [`SessionId`]. Every operation takes the
//! caller's session and is refused with [`Error::SessionMismatch`] when it
//! does not match the owner. Carts live in a [`CartStore`] that the caller
//! owns and passes around explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::PrintEstimate;
use crate::storage::{CustomPrintId, CustomPrintStore};

/// Smallest quantity of a cart line
pub const MIN_QUANTITY: u32 = 1;

/// Largest quantity of a cart line
pub const MAX_QUANTITY: u32 = 99;

/// Opaque identifier of a browser session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a session identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a line within a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u64);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One line of a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line identifier, unique within the cart
    pub line_id: LineId,
    /// The saved custom print this line orders
    pub custom_print_id: CustomPrintId,
    /// Number of copies, 1 to 99
    pub quantity: u32,
    /// Price of one copy when the line was added
    pub unit_price: f64,
}

impl CartItem {
    /// `unit_price * quantity`
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

fn check_quantity(quantity: u32) -> Result<()> {
    if (MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(Error::out_of_range("quantity", quantity, "between 1 and 99"))
    }
}

/// A shopping cart owned by one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    owner: SessionId,
    items: Vec<CartItem>,
    last_line: u64,
}

impl Cart {
    /// Create an empty cart for a session
    pub fn new(owner: SessionId) -> Self {
        Self {
            owner,
            items: Vec::new(),
            last_line: 0,
        }
    }

    /// The owning session
    pub fn owner(&self) -> &SessionId {
        &self.owner
    }

    fn guard(&self, session: &SessionId) -> Result<()> {
        if *session == self.owner {
            Ok(())
        } else {
            Err(Error::SessionMismatch)
        }
    }

    /// Add copies of a saved custom print
    ///
    /// A second add of the same custom print increases the existing line's
    /// quantity instead of creating a new line. The merged quantity must stay
    /// within 1..=99.
    pub fn add(
        &mut self,
        session: &SessionId,
        custom_print_id: CustomPrintId,
        quantity: u32,
        unit_price: f64,
    ) -> Result<LineId> {
        self.guard(session)?;
        check_quantity(quantity)?;
        if !(unit_price.is_finite() && unit_price >= 0.0) {
            return Err(Error::out_of_range(
                "unit_price",
                unit_price,
                "a finite number of at least 0",
            ));
        }

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.custom_print_id == custom_print_id)
        {
            let merged = item.quantity + quantity;
            check_quantity(merged)?;
            item.quantity = merged;
            debug!(line = %item.line_id, quantity = merged, "merged cart line");
            return Ok(item.line_id);
        }

        self.last_line += 1;
        let line_id = LineId(self.last_line);
        self.items.push(CartItem {
            line_id,
            custom_print_id,
            quantity,
            unit_price,
        });
        debug!(line = %line_id, custom_print = %custom_print_id, quantity, "added cart line");
        Ok(line_id)
    }

    /// Save an estimate as a custom print, then add it to the cart
    ///
    /// The unit price is the estimate's total. The quantity is checked before
    /// anything is persisted.
    pub fn add_estimate<S: CustomPrintStore + ?Sized>(
        &mut self,
        session: &SessionId,
        store: &mut S,
        estimate: &PrintEstimate,
        quantity: u32,
    ) -> Result<(CustomPrintId, LineId)> {
        self.guard(session)?;
        check_quantity(quantity)?;
        let custom_print_id = store.save(estimate)?;
        let line_id = self.add(session, custom_print_id, quantity, estimate.cost.total_cost)?;
        Ok((custom_print_id, line_id))
    }

    /// Replace the quantity of a line
    pub fn update_quantity(&mut self, session: &SessionId, line_id: LineId, quantity: u32) -> Result<()> {
        self.guard(session)?;
        check_quantity(quantity)?;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.line_id == line_id)
            .ok_or_else(|| Error::NotFound(format!("cart line {}", line_id)))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Remove a line
    pub fn remove(&mut self, session: &SessionId, line_id: LineId) -> Result<CartItem> {
        self.guard(session)?;
        let index = self
            .items
            .iter()
            .position(|item| item.line_id == line_id)
            .ok_or_else(|| Error::NotFound(format!("cart line {}", line_id)))?;
        Ok(self.items.remove(index))
    }

    /// Remove every line
    pub fn clear(&mut self, session: &SessionId) -> Result<()> {
        self.guard(session)?;
        self.items.clear();
        Ok(())
    }

    /// Lines in insertion order
    pub fn items(&self, session: &SessionId) -> Result<&[CartItem]> {
        self.guard(session)?;
        Ok(&self.items)
    }

    /// Sum of all line totals
    pub fn subtotal(&self, session: &SessionId) -> Result<f64> {
        self.guard(session)?;
        Ok(self.items.iter().map(CartItem::line_total).sum())
    }
}

/// All carts, keyed by session
#[derive(Debug, Default)]
pub struct CartStore {
    carts: HashMap<SessionId, Cart>,
}

impl CartStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The cart of a session, created empty on first use
    pub fn cart_mut(&mut self, session: &SessionId) -> &mut Cart {
        self.carts
            .entry(session.clone())
            .or_insert_with(|| Cart::new(session.clone()))
    }

    /// The cart of a session, if it has one
    pub fn cart(&self, session: &SessionId) -> Option<&Cart> {
        self.carts.get(session)
    }

    /// Drop a session's cart, e.g. after checkout
    pub fn remove(&mut self, session: &SessionId) -> Option<Cart> {
        self.carts.remove(session)
    }
}
