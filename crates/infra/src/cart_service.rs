//! Cart operations.
//!
//! Every mutation loads the cart, applies the change to the aggregate and
//! saves the whole cart back. Concurrent mutations of the same cart are not
//! serialized; the later save wins.
//!
//! Product references are checked on the way in (`add_item`, `set_items`).
//! A product deleted afterwards stays referenced by the carts holding it and
//! resolves to `None` in [`CartDetails`].

use std::collections::HashMap;

use serde::Serialize;

use storefront_carts::{Cart, CartId, LineItem, Quantity};
use storefront_catalog::{Product, ProductId};
use storefront_core::{DomainError, Identifier};

use crate::error::ServiceResult;
use crate::store::AggregateStore;

/// Acknowledgement of a delete, carrying how many carts were removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub deleted_count: u64,
}

/// A cart line joined with the product it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// `None` when the product no longer exists.
    pub product: Option<Product>,
    pub line_total: Option<f64>,
}

/// Cart view with products resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartDetails {
    pub id: CartId,
    pub products: Vec<CartLine>,
    /// Sum of the resolvable line totals.
    pub subtotal: f64,
}

pub struct CartService<C, P> {
    carts: C,
    products: P,
}

impl<C, P> CartService<C, P>
where
    C: AggregateStore<Cart>,
    P: AggregateStore<Product>,
{
    pub fn new(carts: C, products: P) -> Self {
        Self { carts, products }
    }

    pub async fn create_cart(&self) -> ServiceResult<Cart> {
        let id = self.carts.next_id().await?;
        let cart = Cart::new(id);
        self.carts.save(&cart).await?;
        Ok(cart)
    }

    pub async fn get_cart(&self, id: CartId) -> ServiceResult<Cart> {
        self.carts
            .load(&id)
            .await?
            .ok_or_else(|| DomainError::CartNotFound(id.record()).into())
    }

    pub async fn get_cart_with_products(&self, id: CartId) -> ServiceResult<CartDetails> {
        let cart = self.get_cart(id).await?;
        let mut catalog: HashMap<ProductId, Product> = if cart.is_empty() {
            HashMap::new()
        } else {
            self.products
                .load_all()
                .await?
                .into_iter()
                .map(|p| (p.id_typed(), p))
                .collect()
        };
        let mut lines = Vec::with_capacity(cart.items().len());
        let mut subtotal = 0.0;

        for item in cart.items() {
            let product = catalog.remove(&item.product_id);
            let line_total = product
                .as_ref()
                .map(|p| p.price() * f64::from(item.quantity.get()));
            subtotal += line_total.unwrap_or(0.0);
            lines.push(CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
                product,
                line_total,
            });
        }

        Ok(CartDetails {
            id,
            products: lines,
            subtotal,
        })
    }

    /// Add a product, merging with an existing line. `quantity` defaults to 1.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Option<Quantity>,
    ) -> ServiceResult<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        self.ensure_product(product_id).await?;

        cart.add_item(product_id, quantity.unwrap_or_default())?;
        self.carts.save(&cart).await?;
        Ok(cart)
    }

    /// Replace every line. The list is checked in full before the cart is
    /// touched.
    pub async fn set_items(&self, cart_id: CartId, items: Vec<LineItem>) -> ServiceResult<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        for item in &items {
            self.ensure_product(item.product_id).await?;
        }

        cart.replace_items(items)?;
        self.carts.save(&cart).await?;
        Ok(cart)
    }

    pub async fn set_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> ServiceResult<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        cart.set_quantity(product_id, quantity)?;
        self.carts.save(&cart).await?;
        Ok(cart)
    }

    /// Remove a product's line. Removing an absent product is a no-op that
    /// returns the cart unchanged.
    pub async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> ServiceResult<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        if cart.remove_item(product_id) {
            self.carts.save(&cart).await?;
        }
        Ok(cart)
    }

    /// Empty the cart; the cart itself remains.
    pub async fn clear(&self, cart_id: CartId) -> ServiceResult<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        if !cart.is_empty() {
            cart.clear();
            self.carts.save(&cart).await?;
        }
        Ok(cart)
    }

    /// Delete the cart itself. Unknown ids acknowledge zero deletions.
    pub async fn delete_cart(&self, cart_id: CartId) -> ServiceResult<DeleteAck> {
        let removed = self.carts.remove(&cart_id).await?;
        Ok(DeleteAck {
            deleted_count: u64::from(removed.is_some()),
        })
    }

    pub async fn delete_all_carts(&self) -> ServiceResult<DeleteAck> {
        let deleted_count = self.carts.remove_all().await?;
        Ok(DeleteAck { deleted_count })
    }

    async fn ensure_product(&self, id: ProductId) -> ServiceResult<()> {
        match self.products.load(&id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::ProductNotFound(id.record()).into()),
        }
    }
}
