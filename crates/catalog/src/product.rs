use serde::{Deserialize, Serialize};

use storefront_core::{AggregateRoot, DomainError, DomainResult, record_id_newtype};

record_id_newtype! {
    /// Product identifier.
    pub struct ProductId;
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    title: String,
    description: String,
    code: String,
    price: f64,
    status: bool,
    stock: u32,
    category: String,
    #[serde(default)]
    thumbnails: Vec<String>,
}

/// Fields for a product that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub price: f64,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

fn default_status() -> bool {
    true
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub price: Option<f64>,
    pub status: Option<bool>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub thumbnails: Option<Vec<String>>,
}

impl NewProduct {
    /// Check the fields without building a product.
    pub fn validate(&self) -> DomainResult<()> {
        validate_fields(&self.title, &self.code, self.price)
    }
}

fn validate_fields(title: &str, code: &str, price: f64) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title cannot be empty"));
    }
    if code.trim().is_empty() {
        return Err(DomainError::validation("code cannot be empty"));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(())
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Product {
    /// Build a product from validated fields and a store-assigned identifier.
    pub fn create(id: ProductId, fields: NewProduct) -> DomainResult<Self> {
        let product = Self {
            id,
            title: fields.title,
            description: fields.description,
            code: fields.code,
            price: fields.price,
            status: fields.status,
            stock: fields.stock,
            category: fields.category,
            thumbnails: fields.thumbnails,
        };
        product.validate()?;
        Ok(product)
    }

    /// Apply a partial update. On a validation failure `self` is left unchanged.
    pub fn apply_patch(&mut self, patch: ProductPatch) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = title;
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(code) = patch.code {
            next.code = code;
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(stock) = patch.stock {
            next.stock = stock;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(thumbnails) = patch.thumbnails {
            next.thumbnails = thumbnails;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn validate(&self) -> DomainResult<()> {
        validate_fields(&self.title, &self.code, self.price)
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Availability flag.
    pub fn status(&self) -> bool {
        self.status
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn thumbnails(&self) -> &[String] {
        &self.thumbnails
    }

    /// The fields of this product without its identifier.
    pub fn to_fields(&self) -> NewProduct {
        NewProduct {
            title: self.title.clone(),
            description: self.description.clone(),
            code: self.code.clone(),
            price: self.price,
            status: self.status,
            stock: self.stock,
            category: self.category.clone(),
            thumbnails: self.thumbnails.clone(),
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
