use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_catalog::ProductId;
use storefront_core::{AggregateRoot, DomainError, DomainResult, Identifier, record_id_newtype};

record_id_newtype! {
    /// Cart identifier.
    pub struct CartId;
}

/// Line-item quantity: always a positive integer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(n: i64) -> DomainResult<Self> {
        if n <= 0 {
            return Err(DomainError::invalid_quantity(format!(
                "{n} is not a positive integer"
            )));
        }
        u32::try_from(n)
            .map(Self)
            .map_err(|_| DomainError::invalid_quantity(format!("{n} is too large")))
    }

    /// Accepts integral floats (`2.0`); rejects fractions, NaN and infinities.
    pub fn from_f64(n: f64) -> DomainResult<Self> {
        if !n.is_finite() || n.fract() != 0.0 {
            return Err(DomainError::invalid_quantity(format!(
                "{n} is not a positive integer"
            )));
        }
        if n > i64::MAX as f64 || n < i64::MIN as f64 {
            return Err(DomainError::invalid_quantity(format!("{n} is out of range")));
        }
        Self::new(n as i64)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u64> for Quantity {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let n = i64::try_from(value)
            .map_err(|_| DomainError::invalid_quantity(format!("{value} is too large")))?;
        Self::new(n)
    }
}

impl From<Quantity> for u64 {
    fn from(value: Quantity) -> Self {
        u64::from(value.0)
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Self::new(n);
        }
        match s.parse::<f64>() {
            Ok(n) => Self::from_f64(n),
            Err(_) => Err(DomainError::invalid_quantity(format!("'{s}' is not a number"))),
        }
    }
}

/// Line item: a product reference and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl LineItem {
    pub fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Aggregate root: Cart.
///
/// Invariant: at most one line item per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    #[serde(rename = "products", default)]
    items: Vec<LineItem>,
}

impl Cart {
    /// A fresh cart with no line items.
    pub fn new(id: CartId) -> Self {
        Self {
            id,
            items: Vec::new(),
        }
    }

    pub fn id_typed(&self) -> CartId {
        self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Add `quantity` of a product, merging into an existing line item.
    pub fn add_item(&mut self, product_id: ProductId, quantity: Quantity) -> DomainResult<()> {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                let current = item.quantity;
                item.quantity = current.checked_add(quantity).ok_or_else(|| {
                    DomainError::invalid_quantity(format!("adding {quantity} to {current} overflows"))
                })?;
            }
            None => self.items.push(LineItem::new(product_id, quantity)),
        }
        Ok(())
    }

    /// Replace every line item. Rejects lists naming a product twice.
    pub fn replace_items(&mut self, items: Vec<LineItem>) -> DomainResult<()> {
        for (idx, item) in items.iter().enumerate() {
            if items[..idx].iter().any(|prev| prev.product_id == item.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears more than once",
                    item.product_id
                )));
            }
        }
        self.items = items;
        Ok(())
    }

    /// Overwrite the quantity of an existing line item.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: Quantity) -> DomainResult<()> {
        let cart_id = self.id;
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(DomainError::ItemNotFound {
                cart_id: cart_id.record(),
                product_id: product_id.record(),
            })?;
        item.quantity = quantity;
        Ok(())
    }

    /// Remove a product's line item. Returns whether anything was removed.
    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
