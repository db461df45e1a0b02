use campus_market_engine::{
    db_types::{Currency, NewOrderItem, NewProduct, OrderStatusType, PaymentUpdate, ProductUpdate},
    order_objects::Pagination,
    ErrorCode,
    StoreManagement,
};
use support::prepare_env::{address, prepare_test_env, stocked_store, tear_down, units, DEFAULT_TEST_FEE_BPS};

mod support;

#[tokio::test]
async fn order_amount_is_the_sum_of_captured_line_prices() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let merchant = address("merchant");
    let buyer = address("buyer");
    let (store, noodles) = stocked_store(market, &merchant, "Noodles", "5.00", 10).await;
    let tea = market
        .stores
        .create_product(&merchant, store.id, NewProduct::new("Tea", "drinks", units("1.25"), 3))
        .await
        .unwrap();

    let items = vec![NewOrderItem::new(noodles.id, 2), NewOrderItem::new(tea.id, 3)];
    let order = market.orders.create_order(&buyer, store.id, items, Currency::Usdc).await.unwrap();
    assert_eq!(order.order.amount, units("13.75"));
    assert_eq!(order.items_total(), Some(order.order.amount));
    assert_eq!(order.order.status, OrderStatusType::Pending);
    assert!(!order.order.withdrawn);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].line_no, 0);
    assert_eq!(order.items[1].unit_price, units("1.25"));

    // Stock is reserved
    let noodles_now = test.db.fetch_product(noodles.id).await.unwrap().unwrap();
    assert_eq!(noodles_now.inventory, 8);
    let tea_now = test.db.fetch_product(tea.id).await.unwrap().unwrap();
    assert_eq!(tea_now.inventory, 0);

    // A later price change does not touch the stored order
    let repriced = ProductUpdate::default().with_price(units("7.00"));
    market.stores.update_product(&merchant, noodles.id, repriced).await.unwrap();
    let fetched = market.orders.fetch_order(order.order.id).await.unwrap();
    assert_eq!(fetched.order.amount, units("13.75"));
    assert_eq!(fetched.items[0].unit_price, units("5.00"));
    tear_down(test).await;
}

#[tokio::test]
async fn order_creation_is_all_or_nothing() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let merchant = address("merchant");
    let buyer = address("buyer");
    let (store, noodles) = stocked_store(market, &merchant, "Noodles", "5.00", 10).await;
    let tea = market
        .stores
        .create_product(&merchant, store.id, NewProduct::new("Tea", "drinks", units("1.25"), 1))
        .await
        .unwrap();

    let items = vec![NewOrderItem::new(noodles.id, 4), NewOrderItem::new(tea.id, 2)];
    let err = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientInventory);
    // The first line's reservation was rolled back
    assert_eq!(test.db.fetch_product(noodles.id).await.unwrap().unwrap().inventory, 10);
    let page = market.orders.list_for_buyer(&buyer, None, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 0);

    // Products of another store cannot be bought through this one
    let (_, other_product) = stocked_store(market, &address("other"), "Pens", "2.00", 5).await;
    let items = vec![NewOrderItem::new(other_product.id, 1)];
    let err = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = market.orders.create_order(&buyer, store.id, vec![], Currency::Sol).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    let items = vec![NewOrderItem::new(noodles.id, 0)];
    let err = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    tear_down(test).await;
}

#[tokio::test]
async fn payment_confirmation_is_idempotent_on_the_signature() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let merchant = address("merchant");
    let buyer = address("buyer");
    let (store, noodles) = stocked_store(market, &merchant, "Noodles", "5.00", 10).await;
    let items = vec![NewOrderItem::new(noodles.id, 1)];
    let order = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap();
    let id = order.order.id;

    let update = market.orders.confirm_payment(id, "sigA").await.unwrap();
    assert!(matches!(update, PaymentUpdate::Confirmed(_)));
    assert_eq!(update.order().status, OrderStatusType::Paid);
    assert_eq!(update.order().tx_signature.as_deref(), Some("sigA"));

    let again = market.orders.confirm_payment(id, "sigA").await.unwrap();
    assert!(matches!(again, PaymentUpdate::AlreadyConfirmed(_)));

    let err = market.orders.confirm_payment(id, "sigB").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);

    let err = market.orders.confirm_payment(id.value().saturating_add(100).into(), "sigC").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    let err = market.orders.confirm_payment(id, "  ").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    tear_down(test).await;
}

#[tokio::test]
async fn only_the_store_owner_moves_paid_orders_forward() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let merchant = address("merchant");
    let buyer = address("buyer");
    let stranger = address("stranger");
    let (store, noodles) = stocked_store(market, &merchant, "Noodles", "5.00", 10).await;
    let items = vec![NewOrderItem::new(noodles.id, 2)];
    let order = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap();
    let id = order.order.id;

    // Not paid yet
    let err = market.orders.update_status(&merchant, id, OrderStatusType::Fulfilled).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTransition);

    market.orders.confirm_payment(id, "sigA").await.unwrap();
    for target in [OrderStatusType::Fulfilled, OrderStatusType::Cancelled, OrderStatusType::Pending] {
        let err = market.orders.update_status(&stranger, id, target).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        let err = market.orders.update_status(&buyer, id, target).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
    let err = market.orders.update_status(&merchant, id, OrderStatusType::Pending).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTransition);

    let fulfilled = market.orders.update_status(&merchant, id, OrderStatusType::Fulfilled).await.unwrap();
    assert_eq!(fulfilled.status, OrderStatusType::Fulfilled);
    for target in [OrderStatusType::Cancelled, OrderStatusType::Paid, OrderStatusType::Fulfilled] {
        let err = market.orders.update_status(&merchant, id, target).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
    }
    tear_down(test).await;
}

#[tokio::test]
async fn cancelling_restocks_inventory() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let merchant = address("merchant");
    let buyer = address("buyer");
    let (store, noodles) = stocked_store(market, &merchant, "Noodles", "5.00", 10).await;
    let items = vec![NewOrderItem::new(noodles.id, 3), NewOrderItem::new(noodles.id, 1)];
    let order = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap();
    assert_eq!(test.db.fetch_product(noodles.id).await.unwrap().unwrap().inventory, 6);
    market.orders.confirm_payment(order.order.id, "sigA").await.unwrap();
    let cancelled = market.orders.update_status(&merchant, order.order.id, OrderStatusType::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(test.db.fetch_product(noodles.id).await.unwrap().unwrap().inventory, 10);
    let err = market.orders.update_status(&merchant, order.order.id, OrderStatusType::Fulfilled).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    tear_down(test).await;
}

#[tokio::test]
async fn buyer_listing_is_paginated_with_exact_totals() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let merchant = address("merchant");
    let buyer = address("buyer");
    let (store, noodles) = stocked_store(market, &merchant, "Noodles", "5.00", 10).await;
    let mut ids = Vec::new();
    for qty in 1..=3 {
        let items = vec![NewOrderItem::new(noodles.id, qty)];
        let order = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap();
        ids.push(order.order.id);
    }
    market.orders.confirm_payment(ids[0], "sig-first").await.unwrap();

    let page = market.orders.list_for_buyer(&buyer, None, Pagination::new(0, 2)).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page.has_more);
    assert_eq!(page.items.len(), 2);
    // Newest first
    assert_eq!(page.items[0].id, ids[2]);
    assert_eq!(page.items[1].id, ids[1]);

    let page = market.orders.list_for_buyer(&buyer, None, Pagination::new(2, 2)).await.unwrap();
    assert!(!page.has_more);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, ids[0]);

    let paid = market
        .orders
        .list_for_buyer(&buyer, Some(vec![OrderStatusType::Paid]), Pagination::default())
        .await
        .unwrap();
    assert_eq!(paid.total, 1);
    assert_eq!(paid.items[0].id, ids[0]);

    let err = market.orders.list_for_buyer(&buyer, None, Pagination::new(0, 0)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    // An offset far past the end is an empty last page
    let beyond = market.orders.list_for_buyer(&buyer, None, Pagination::new(i64::MAX, 1)).await.unwrap();
    assert!(beyond.items.is_empty());
    assert!(!beyond.has_more);
    assert_eq!(beyond.total, 3);

    let store_orders = market.orders.list_for_seller_store(store.id).await.unwrap();
    assert_eq!(store_orders.len(), 3);
    let other = market.orders.list_for_buyer(&address("stranger"), None, Pagination::default()).await.unwrap();
    assert_eq!(other.total, 0);
    tear_down(test).await;
}

#[tokio::test]
async fn admin_report_splits_fees_exactly() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let merchant = address("merchant");
    let buyer = address("buyer");
    let (store, noodles) = stocked_store(market, &merchant, "Noodles", "5.00", 10).await;
    let items = vec![NewOrderItem::new(noodles.id, 2)];
    let order = market.orders.create_order(&buyer, store.id, items, Currency::Sol).await.unwrap();
    market.orders.confirm_payment(order.order.id, "sigA").await.unwrap();
    let odd = market
        .stores
        .create_product(&merchant, store.id, NewProduct::new("Gum", "snacks", units("0.000013"), 5))
        .await
        .unwrap();
    market.orders.create_order(&buyer, store.id, vec![NewOrderItem::new(odd.id, 1)], Currency::Usdc).await.unwrap();

    let err = market.orders.transaction_report(&buyer, 30, 100).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let report = market.orders.transaction_report(&test.admin, 30, 100).await.unwrap();
    assert_eq!(report.fee_rate_bps, 500);
    assert_eq!(report.rows.len(), 2);
    let row = report.rows.iter().find(|r| r.order_id == order.order.id).unwrap();
    assert_eq!(row.amount, units("10.00"));
    assert_eq!(row.platform_fee, units("0.50"));
    assert_eq!(row.seller_revenue, units("9.50"));
    assert_eq!(row.status, OrderStatusType::Paid);
    assert!(!row.withdrawn);
    for row in &report.rows {
        assert_eq!(row.platform_fee + row.seller_revenue, row.amount);
    }
    assert_eq!(report.totals.len(), 2);

    let limited = market.orders.transaction_report(&test.admin, 30, 1).await.unwrap();
    assert_eq!(limited.rows.len(), 1);
    let err = market.orders.transaction_report(&test.admin, 0, 10).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    tear_down(test).await;
}
