//! The cart manager: active-cart resolution, line-item arithmetic, totals
//! and checkout.
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::{
    gateway::{
        CartGateway, GatewayError, LineItemKey, LineItemPatch, NewCart, NewLineItem, OrderGateway,
    },
    models::{CartId, CartProductDetail, CartStatus, OrderLine, Product},
    money::Money,
};

mod checkout;
mod locks;

pub use checkout::{CheckoutError, CheckoutPolicy, CheckoutValidation};
pub use locks::{ActiveCartCache, KeyedLocks};

/// Upper bound on the quantity of a single (product, size) line.
pub const MAX_LINE_QUANTITY: i32 = 999;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("no user id available")]
    MissingUser,

    #[error("a cart line cannot hold more than {max} units")]
    QuantityLimit { max: i32 },

    #[error("cart total is out of range")]
    AmountOverflow,

    #[error("cart unavailable: {0}")]
    Gateway(#[from] GatewayError),
}

pub type CartResult<T> = Result<T, CartError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOp {
    Increment,
    Decrement,
}

impl QuantityOp {
    pub fn apply(self, current: i32, delta: i32) -> i32 {
        match self {
            QuantityOp::Increment => current.saturating_add(delta),
            QuantityOp::Decrement => current.saturating_sub(delta),
        }
    }
}

/// What an upsert did to the row for (cart, product, size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemOutcome {
    Inserted { quantity: i32 },
    Updated { quantity: i32 },
    Deleted,
    /// The quantity fell to zero or below and there was no row to remove.
    Unchanged,
}

/// A line-item change made through the user's active cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartChange {
    pub cart_id: CartId,
    pub outcome: LineItemOutcome,
}

pub struct CartManager<G: ?Sized> {
    gateway: Arc<G>,
    cache: Arc<ActiveCartCache>,
    user_locks: KeyedLocks<String>,
    line_locks: KeyedLocks<LineItemKey>,
    policy: CheckoutPolicy,
}

impl<G> CartManager<G>
where
    G: CartGateway + OrderGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_cache(gateway, Arc::new(ActiveCartCache::default()))
    }

    pub fn with_cache(gateway: Arc<G>, cache: Arc<ActiveCartCache>) -> Self {
        Self {
            gateway,
            cache,
            user_locks: KeyedLocks::default(),
            line_locks: KeyedLocks::default(),
            policy: CheckoutPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CheckoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn cache(&self) -> &ActiveCartCache {
        &self.cache
    }

    /// Returns the user's active cart, creating one if none exists.
    ///
    /// Resolution for a given user is serialised, so two concurrent first
    /// calls produce a single insert.
    pub async fn get_or_create_active_cart(&self, user_id: &str) -> CartResult<CartId> {
        let user_id = require_user(user_id)?;
        if let Some(cart_id) = self.cache.get(user_id) {
            return Ok(cart_id);
        }

        let _guard = self.lock_user(user_id).await;
        self.resolve_active_cart(user_id).await
    }

    /// Serialises cart mutations and checkout for one user.
    async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        self.user_locks.lock(&user_id.to_string()).await
    }

    // The caller holds the user's lock.
    async fn resolve_active_cart(&self, user_id: &str) -> CartResult<CartId> {
        if let Some(cart_id) = self.cache.get(user_id) {
            return Ok(cart_id);
        }

        let resolved = match self.gateway.find_active_cart(user_id).await {
            Ok(Some(cart)) => Ok(cart.id),
            Ok(None) => self
                .gateway
                .insert_cart(NewCart {
                    user_id: user_id.to_string(),
                    status: CartStatus::Active,
                })
                .await
                .map(|cart| {
                    tracing::info!(user_id, cart_id = cart.id, "active cart created");
                    cart.id
                }),
            Err(err) => Err(err),
        };

        match resolved {
            Ok(cart_id) => {
                self.cache.insert(user_id, cart_id);
                Ok(cart_id)
            }
            Err(err) => {
                tracing::error!(user_id, error = %err, "failed to resolve or create active cart");
                Err(err.into())
            }
        }
    }

    /// Like [`Self::get_or_create_active_cart`] but never writes.
    pub async fn find_active_cart(&self, user_id: &str) -> CartResult<Option<CartId>> {
        let user_id = require_user(user_id)?;
        if let Some(cart_id) = self.cache.get(user_id) {
            return Ok(Some(cart_id));
        }

        // A lookup racing a checkout must not cache the retired cart.
        let _guard = self.lock_user(user_id).await;
        self.lookup_active_cart(user_id).await
    }

    // The caller holds the user's lock.
    async fn lookup_active_cart(&self, user_id: &str) -> CartResult<Option<CartId>> {
        if let Some(cart_id) = self.cache.get(user_id) {
            return Ok(Some(cart_id));
        }

        let cart = self
            .gateway
            .find_active_cart(user_id)
            .await
            .inspect_err(|err| tracing::error!(user_id, error = %err, "failed to look up active cart"))?;

        Ok(cart.map(|cart| {
            self.cache.insert(user_id, cart.id);
            cart.id
        }))
    }

    /// Adds or removes `delta` units of (product, size) in the cart.
    ///
    /// A resulting quantity of zero or less deletes the row; decrementing a
    /// row that does not exist is a successful no-op.
    pub async fn upsert_line_item(
        &self,
        cart_id: CartId,
        product: &Product,
        delta: i32,
        op: QuantityOp,
        size: &str,
    ) -> CartResult<LineItemOutcome> {
        let key = LineItemKey {
            cart_id,
            product_id: product.id,
            size: size.to_string(),
        };
        let _guard = self.line_locks.lock(&key).await;

        let outcome = self.apply_line_item(&key, product, delta, op).await;
        match &outcome {
            Ok(outcome) => tracing::debug!(
                cart_id,
                product_id = product.id,
                size,
                ?outcome,
                "cart item updated"
            ),
            Err(CartError::QuantityLimit { max }) => tracing::warn!(
                cart_id,
                product_id = product.id,
                size,
                max,
                "cart item over the quantity limit"
            ),
            Err(err) => tracing::error!(
                cart_id,
                product_id = product.id,
                size,
                error = %err,
                "failed to update cart item"
            ),
        }
        outcome
    }

    async fn apply_line_item(
        &self,
        key: &LineItemKey,
        product: &Product,
        delta: i32,
        op: QuantityOp,
    ) -> CartResult<LineItemOutcome> {
        let existing = self.gateway.find_line_item(key).await?;
        let current = existing.as_ref().map_or(0, |item| item.quantity);
        let quantity = op.apply(current, delta);
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityLimit {
                max: MAX_LINE_QUANTITY,
            });
        }

        if quantity <= 0 {
            return match existing {
                Some(item) => {
                    self.gateway.delete_line_item(item.id).await?;
                    Ok(LineItemOutcome::Deleted)
                }
                None => Ok(LineItemOutcome::Unchanged),
            };
        }

        let unit_price = Money::from_decimal(product.price);
        match existing {
            Some(item) => {
                self.gateway
                    .update_line_item(
                        item.id,
                        LineItemPatch {
                            quantity,
                            unit_price,
                        },
                    )
                    .await?;
                Ok(LineItemOutcome::Updated { quantity })
            }
            None => {
                self.gateway
                    .insert_line_item(NewLineItem {
                        cart_id: key.cart_id,
                        product_id: key.product_id,
                        quantity,
                        unit_price,
                        size: key.size.clone(),
                    })
                    .await?;
                Ok(LineItemOutcome::Inserted { quantity })
            }
        }
    }

    /// Adds `quantity` units to the user's active cart, creating the cart
    /// if needed.
    pub async fn add_product(
        &self,
        user_id: &str,
        product: &Product,
        quantity: i32,
        size: &str,
    ) -> CartResult<CartChange> {
        self.change_line(user_id, product, quantity, QuantityOp::Increment, size)
            .await
    }

    pub async fn plus_item(
        &self,
        user_id: &str,
        product: &Product,
        size: &str,
    ) -> CartResult<CartChange> {
        self.change_line(user_id, product, 1, QuantityOp::Increment, size)
            .await
    }

    pub async fn minus_item(
        &self,
        user_id: &str,
        product: &Product,
        size: &str,
    ) -> CartResult<CartChange> {
        self.change_line(user_id, product, 1, QuantityOp::Decrement, size)
            .await
    }

    // Resolve and upsert under the user's lock; checkout holds the same lock.
    async fn change_line(
        &self,
        user_id: &str,
        product: &Product,
        delta: i32,
        op: QuantityOp,
        size: &str,
    ) -> CartResult<CartChange> {
        let user_id = require_user(user_id)?;
        let _guard = self.lock_user(user_id).await;
        let cart_id = self.resolve_active_cart(user_id).await?;
        let outcome = self
            .upsert_line_item(cart_id, product, delta, op, size)
            .await?;
        Ok(CartChange { cart_id, outcome })
    }

    /// Line items with their live product rows. Blank user or no active
    /// cart gives an empty list.
    pub async fn list_cart_details(&self, user_id: &str) -> CartResult<Vec<CartProductDetail>> {
        if user_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        let cart_id = self.find_active_cart(user_id).await?;
        self.cart_details(user_id, cart_id).await
    }

    async fn cart_details(
        &self,
        user_id: &str,
        cart_id: Option<CartId>,
    ) -> CartResult<Vec<CartProductDetail>> {
        let Some(cart_id) = cart_id else {
            return Ok(Vec::new());
        };
        let details = self
            .gateway
            .list_cart_details(cart_id)
            .await
            .inspect_err(|err| tracing::error!(user_id, cart_id, error = %err, "failed to list cart"))?;
        Ok(details)
    }

    /// Sum of live catalog price times quantity. The stored per-line price
    /// snapshot is not used.
    pub async fn get_total(&self, user_id: &str) -> CartResult<Money> {
        let details = self.list_cart_details(user_id).await?;
        cart_total(&details)
    }

    /// The cart as order lines priced at the live catalog price.
    pub async fn items_for_checkout(&self, user_id: &str) -> CartResult<Vec<OrderLine>> {
        let details = self.list_cart_details(user_id).await?;
        Ok(order_lines(details))
    }

    /// Deletes every line item of the cart. The cart row and the cache entry
    /// are left alone.
    pub async fn clear_cart(&self, cart_id: CartId) -> CartResult<u64> {
        tracing::debug!(cart_id, "clearing cart items");
        let removed = self
            .gateway
            .delete_cart_items(cart_id)
            .await
            .inspect_err(|err| tracing::error!(cart_id, error = %err, "failed to clear cart"))?;
        Ok(removed)
    }

    /// Drops the cached cart for a user, e.g. on logout.
    pub fn forget_user(&self, user_id: &str) {
        if let Some(cart_id) = self.cache.remove(user_id) {
            tracing::debug!(user_id, cart_id, "active cart evicted from cache");
        }
    }
}

fn order_lines(details: Vec<CartProductDetail>) -> Vec<OrderLine> {
    details
        .into_iter()
        .map(|detail| OrderLine {
            product_id: detail.product_id,
            quantity: detail.quantity,
            unit_price: Money::from_decimal(detail.product.price),
            size: Some(detail.size),
        })
        .collect()
}

/// Sum of the live line totals.
pub fn cart_total(details: &[CartProductDetail]) -> CartResult<Money> {
    details
        .iter()
        .try_fold(Money::ZERO, |total, detail| {
            detail.line_total().and_then(|line| total.checked_add(line))
        })
        .ok_or(CartError::AmountOverflow)
}

fn require_user(user_id: &str) -> CartResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(CartError::MissingUser);
    }
    Ok(user_id)
}
