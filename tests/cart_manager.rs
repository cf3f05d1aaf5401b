mod common;

use std::sync::Arc;

use storefront::{
    cart::{CartError, CartManager, LineItemOutcome, MAX_LINE_QUANTITY, QuantityOp},
    gateway::memory::{GatewayOp, MemoryGateway},
    models::CartStatus,
    money::Money,
};

use common::{category, manager, product};

const USER: &str = "user-1";

#[tokio::test]
async fn decrement_of_missing_line_is_a_successful_noop() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Shoes").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["42"]);
    let carts = manager(&gateway);

    let cart_id = carts.get_or_create_active_cart(USER).await?;
    let outcome = carts
        .upsert_line_item(cart_id, &shoe, 1, QuantityOp::Decrement, "42")
        .await?;

    assert_eq!(outcome, LineItemOutcome::Unchanged);
    assert!(gateway.cart_items().is_empty());
    assert_eq!(gateway.calls(GatewayOp::DeleteLineItem), 0);
    assert_eq!(gateway.calls(GatewayOp::InsertLineItem), 0);
    Ok(())
}

#[tokio::test]
async fn sequential_increments_merge_into_one_row() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Shoes").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["42"]);
    let carts = manager(&gateway);

    let first = carts.add_product(USER, &shoe, 2, "42").await?;
    let second = carts.add_product(USER, &shoe, 3, "42").await?;

    assert_eq!(first.outcome, LineItemOutcome::Inserted { quantity: 2 });
    assert_eq!(second.outcome, LineItemOutcome::Updated { quantity: 5 });
    assert_eq!(first.cart_id, second.cart_id);
    let items = gateway.cart_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);
    assert_eq!(items[0].unit_price, Money::from_cents(1000));
    Ok(())
}

#[tokio::test]
async fn sizes_are_separate_lines() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Tees").id;
    let tee = product(&gateway, brand, "Basic", "12.99", &["M", "L"]);
    let carts = manager(&gateway);

    carts.plus_item(USER, &tee, "M").await?;
    carts.plus_item(USER, &tee, "L").await?;
    carts.plus_item(USER, &tee, "M").await?;

    let mut lines: Vec<(String, i32)> = carts
        .list_cart_details(USER)
        .await?
        .into_iter()
        .map(|d| (d.size, d.quantity))
        .collect();
    lines.sort();
    assert_eq!(lines, vec![("L".to_string(), 1), ("M".to_string(), 2)]);
    Ok(())
}

#[tokio::test]
async fn decrement_below_zero_deletes_the_row() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Shoes").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["42"]);
    let carts = manager(&gateway);

    let cart_id = carts.get_or_create_active_cart(USER).await?;
    carts
        .upsert_line_item(cart_id, &shoe, 2, QuantityOp::Increment, "42")
        .await?;
    let outcome = carts
        .upsert_line_item(cart_id, &shoe, 5, QuantityOp::Decrement, "42")
        .await?;

    assert_eq!(outcome, LineItemOutcome::Deleted);
    assert!(carts.list_cart_details(USER).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn minus_to_zero_removes_the_line() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Shoes").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["42"]);
    let carts = manager(&gateway);

    carts.plus_item(USER, &shoe, "42").await?;
    assert_eq!(
        carts.minus_item(USER, &shoe, "42").await?.outcome,
        LineItemOutcome::Deleted
    );
    assert_eq!(
        carts.minus_item(USER, &shoe, "42").await?.outcome,
        LineItemOutcome::Unchanged
    );
    assert!(gateway.cart_items().is_empty());
    Ok(())
}

#[tokio::test]
async fn total_is_live_price_times_quantity() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Mixed").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["42"]);
    let cap = product(&gateway, brand, "Cap", "5.50", &["U"]);
    let carts = manager(&gateway);

    carts.add_product(USER, &shoe, 2, "42").await?;
    carts.add_product(USER, &cap, 1, "U").await?;
    assert_eq!(carts.get_total(USER).await?, Money::from_cents(2550));

    // The stored snapshot is not consulted.
    gateway.set_product_price(cap.id, "6.00".parse()?);
    assert_eq!(carts.get_total(USER).await?, Money::from_cents(2600));
    Ok(())
}

#[tokio::test]
async fn line_quantity_is_capped() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Watches").id;
    let watch = product(&gateway, brand, "Chrono", "9999999999.99", &["U"]);
    let carts = manager(&gateway);

    let err = carts
        .add_product(USER, &watch, i32::MAX, "U")
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::QuantityLimit { max: MAX_LINE_QUANTITY }));
    assert!(gateway.cart_items().is_empty());

    carts.add_product(USER, &watch, MAX_LINE_QUANTITY, "U").await?;
    let err = carts.plus_item(USER, &watch, "U").await.unwrap_err();
    assert!(matches!(err, CartError::QuantityLimit { .. }));
    assert_eq!(gateway.cart_items()[0].quantity, MAX_LINE_QUANTITY);

    // 999 units at the largest price still fit.
    assert_eq!(
        carts.get_total(USER).await?,
        Money::from_cents(999_999_999_999 * i64::from(MAX_LINE_QUANTITY))
    );
    Ok(())
}

#[tokio::test]
async fn clearing_keeps_the_cart_active_and_cached() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Mixed").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["41", "42"]);
    let cap = product(&gateway, brand, "Cap", "5.50", &["U"]);
    let carts = manager(&gateway);

    carts.add_product(USER, &shoe, 2, "42").await?;
    carts.add_product(USER, &shoe, 1, "41").await?;
    let cart_id = carts.add_product(USER, &cap, 1, "U").await?.cart_id;

    assert_eq!(carts.clear_cart(cart_id).await?, 3);

    assert!(gateway.cart_items().is_empty());
    let cart = gateway
        .carts()
        .into_iter()
        .find(|cart| cart.id == cart_id)
        .ok_or_else(|| anyhow::anyhow!("cart row is gone"))?;
    assert_eq!(cart.status, CartStatus::Active);
    assert_eq!(carts.cache().get(USER), Some(cart_id));
    assert_eq!(gateway.calls(GatewayOp::SetCartStatus), 0);

    // The next add reuses the same cart.
    assert_eq!(carts.plus_item(USER, &cap, "U").await?.cart_id, cart_id);
    assert_eq!(gateway.carts().len(), 1);
    Ok(())
}

#[tokio::test]
async fn active_cart_is_cached_after_first_resolution() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let carts = manager(&gateway);

    let first = carts.get_or_create_active_cart(USER).await?;
    let second = carts.get_or_create_active_cart(USER).await?;

    assert_eq!(first, second);
    assert_eq!(gateway.calls(GatewayOp::InsertCart), 1);
    assert_eq!(gateway.calls(GatewayOp::FindActiveCart), 1);
    assert_eq!(carts.cache().get(USER), Some(first));
    Ok(())
}

#[tokio::test]
async fn forgetting_a_user_requeries_but_reuses_the_cart() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let carts = manager(&gateway);

    let first = carts.get_or_create_active_cart(USER).await?;
    carts.forget_user(USER);
    let again = carts.get_or_create_active_cart(USER).await?;

    assert_eq!(first, again);
    assert_eq!(gateway.calls(GatewayOp::FindActiveCart), 2);
    assert_eq!(gateway.calls(GatewayOp::InsertCart), 1);
    Ok(())
}

#[tokio::test]
async fn listing_without_a_cart_is_empty_and_creates_nothing() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let carts = manager(&gateway);

    assert!(carts.list_cart_details(USER).await?.is_empty());
    assert_eq!(carts.get_total(USER).await?, Money::ZERO);
    assert!(gateway.carts().is_empty());
    assert_eq!(gateway.calls(GatewayOp::InsertCart), 0);
    Ok(())
}

#[tokio::test]
async fn blank_user_is_rejected_on_writes_and_empty_on_reads() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let carts = manager(&gateway);

    let err = carts.get_or_create_active_cart("   ").await.unwrap_err();
    assert!(matches!(err, CartError::MissingUser));
    assert!(carts.list_cart_details("").await?.is_empty());
    assert_eq!(gateway.calls(GatewayOp::FindActiveCart), 0);
    Ok(())
}

#[tokio::test]
async fn gateway_failure_is_returned_not_swallowed() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let brand = category(&gateway, "Shoes").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["42"]);
    let carts = manager(&gateway);

    gateway.fail_next(GatewayOp::FindLineItem, "connection reset");
    let err = carts.plus_item(USER, &shoe, "42").await.unwrap_err();
    assert!(matches!(err, CartError::Gateway(_)));
    assert!(err.to_string().contains("connection reset"));

    // One-shot: the retry goes through.
    carts.plus_item(USER, &shoe, "42").await?;
    assert_eq!(gateway.cart_items().len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_cart_lookup_is_not_cached() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let carts = manager(&gateway);

    gateway.fail_next(GatewayOp::FindActiveCart, "timeout");
    assert!(carts.get_or_create_active_cart(USER).await.is_err());
    assert_eq!(carts.cache().get(USER), None);

    let cart_id = carts.get_or_create_active_cart(USER).await?;
    assert_eq!(carts.cache().get(USER), Some(cart_id));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_not_lost() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::with_interleaving());
    let brand = category(&gateway, "Shoes").id;
    let shoe = product(&gateway, brand, "Runner", "10.00", &["42"]);
    let carts = Arc::new(CartManager::new(gateway.clone()));

    let tasks: Vec<_> = (0..25)
        .map(|_| {
            let carts = carts.clone();
            let shoe = shoe.clone();
            tokio::spawn(async move { carts.plus_item(USER, &shoe, "42").await })
        })
        .collect();
    for task in tasks {
        task.await??;
    }

    let items = gateway.cart_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 25);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_resolution_creates_one_cart() -> anyhow::Result<()> {
    let gateway = Arc::new(MemoryGateway::with_interleaving());
    let carts = Arc::new(CartManager::new(gateway.clone()));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let carts = carts.clone();
            tokio::spawn(async move { carts.get_or_create_active_cart(USER).await })
        })
        .collect();
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await??);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(gateway.calls(GatewayOp::InsertCart), 1);
    assert_eq!(gateway.carts().len(), 1);
    Ok(())
}
