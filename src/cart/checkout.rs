use thiserror::Error;
use uuid::Uuid;

use super::{CartError, CartManager, order_lines};
use crate::{
    gateway::{CartGateway, GatewayError, NewOrder, NewOrderItem, OrderGateway},
    models::{CartStatus, ORDER_STATUS_PENDING, Order, OrderId, OrderLine},
    money::Money,
};

/// What to do with an order header whose items could not be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutPolicy {
    /// Leave the empty order in place for later inspection.
    #[default]
    KeepOrphan,
    /// Delete the order again before reporting the failure.
    DeleteOrphan,
}

/// Rejections raised before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckoutValidation {
    #[error("shipping address is required")]
    BlankAddress,

    #[error("order total must be greater than 0")]
    NonPositiveTotal,

    #[error("no user session")]
    MissingUser,

    #[error("cart is empty")]
    EmptyCart,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(#[from] CheckoutValidation),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("failed to create order")]
    OrderInsert(#[source] GatewayError),

    #[error("order {order_id} was created but its items were not saved")]
    OrderItems {
        order_id: OrderId,
        compensated: bool,
        #[source]
        source: GatewayError,
    },
}

impl<G> CartManager<G>
where
    G: CartGateway + OrderGateway + ?Sized,
{
    /// Writes an order and its items, then empties and retires the cart.
    ///
    /// The order header and its items are two separate writes. If the items
    /// fail, the header is kept or deleted according to the
    /// [`CheckoutPolicy`], and the error carries the order id either way.
    pub async fn checkout(
        &self,
        user_id: &str,
        shipping_address: &str,
        total_amount: Money,
        lines: Vec<OrderLine>,
    ) -> Result<Order, CheckoutError> {
        let shipping_address = shipping_address.trim();
        let user_id = user_id.trim();
        reject_invalid(user_id, shipping_address, total_amount, &lines)?;

        let _guard = self.lock_user(user_id).await;
        self.place_order(user_id, shipping_address, total_amount, lines)
            .await
    }

    /// Checks out the user's current cart at live catalog prices.
    ///
    /// The user's lock is held from reading the cart until it is retired, so
    /// concurrent checkouts place one order and a concurrent add lands
    /// either in that order or in the next cart.
    ///
    /// Payment is simulated: a `SIMULATED-<uuid>` reference is logged and
    /// always succeeds.
    pub async fn checkout_cart(
        &self,
        user_id: &str,
        shipping_address: &str,
    ) -> Result<Order, CheckoutError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(CheckoutValidation::MissingUser.into());
        }
        let shipping_address = shipping_address.trim();

        let _guard = self.lock_user(user_id).await;
        let cart_id = self.lookup_active_cart(user_id).await?;
        let lines = order_lines(self.cart_details(user_id, cart_id).await?);
        if lines.is_empty() {
            return Err(CheckoutValidation::EmptyCart.into());
        }
        let total = lines
            .iter()
            .try_fold(Money::ZERO, |total, line| {
                line.unit_price
                    .checked_times(line.quantity)
                    .and_then(|amount| total.checked_add(amount))
            })
            .ok_or(CartError::AmountOverflow)?;
        reject_invalid(user_id, shipping_address, total, &lines)?;

        let payment_reference = format!("SIMULATED-{}", Uuid::new_v4());
        tracing::debug!(user_id, %payment_reference, total = %total, "payment simulated");

        self.place_order(user_id, shipping_address, total, lines)
            .await
    }

    // The caller holds the user's lock and has validated the input.
    async fn place_order(
        &self,
        user_id: &str,
        shipping_address: &str,
        total_amount: Money,
        lines: Vec<OrderLine>,
    ) -> Result<Order, CheckoutError> {
        let order = self
            .gateway
            .insert_order(NewOrder {
                user_id: user_id.to_string(),
                total_amount,
                status: ORDER_STATUS_PENDING.to_string(),
                address_shipping: shipping_address.to_string(),
            })
            .await
            .map_err(|source| {
                tracing::error!(user_id, error = %source, "order insert failed");
                CheckoutError::OrderInsert(source)
            })?;
        tracing::info!(user_id, order_id = order.id, "order created");

        let items = lines
            .into_iter()
            .map(|line| NewOrderItem {
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                selected_size: line.size,
            })
            .collect();

        if let Err(source) = self.gateway.insert_order_items(items).await {
            let compensated = self.compensate(order.id).await;
            tracing::error!(
                user_id,
                order_id = order.id,
                compensated,
                error = %source,
                "order items insert failed"
            );
            return Err(CheckoutError::OrderItems {
                order_id: order.id,
                compensated,
                source,
            });
        }

        self.retire_cart(user_id).await;
        tracing::info!(
            user_id,
            order_id = order.id,
            total = %order.total_amount,
            "checkout completed"
        );
        Ok(order)
    }

    async fn compensate(&self, order_id: OrderId) -> bool {
        match self.policy {
            CheckoutPolicy::KeepOrphan => false,
            CheckoutPolicy::DeleteOrphan => match self.gateway.delete_order(order_id).await
            {
                Ok(_) => true,
                Err(err) => {
                    tracing::error!(order_id, error = %err, "failed to delete orphaned order");
                    false
                }
            },
        }
    }

    // The order already exists at this point, so cleanup problems are
    // logged rather than returned.
    async fn retire_cart(&self, user_id: &str) {
        let cart_id = match self.lookup_active_cart(user_id).await {
            Ok(Some(cart_id)) => cart_id,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "could not resolve cart after checkout");
                return;
            }
        };

        if let Err(err) = self.clear_cart(cart_id).await {
            tracing::warn!(user_id, cart_id, error = %err, "cart not cleared after checkout");
        }
        if let Err(err) = self
            .gateway
            .set_cart_status(cart_id, CartStatus::Completed)
            .await
        {
            tracing::warn!(user_id, cart_id, error = %err, "cart not marked completed");
        }
        self.forget_user(user_id);
    }
}

fn reject_invalid(
    user_id: &str,
    shipping_address: &str,
    total_amount: Money,
    lines: &[OrderLine],
) -> Result<(), CheckoutValidation> {
    validate(user_id, shipping_address, total_amount, lines).inspect_err(|err| {
        tracing::warn!(user_id, error = %err, "checkout rejected");
    })
}

fn validate(
    user_id: &str,
    shipping_address: &str,
    total_amount: Money,
    lines: &[OrderLine],
) -> Result<(), CheckoutValidation> {
    if shipping_address.is_empty() {
        return Err(CheckoutValidation::BlankAddress);
    }
    if !total_amount.is_positive() {
        return Err(CheckoutValidation::NonPositiveTotal);
    }
    if user_id.is_empty() {
        return Err(CheckoutValidation::MissingUser);
    }
    if lines.is_empty() {
        return Err(CheckoutValidation::EmptyCart);
    }
    Ok(())
}
