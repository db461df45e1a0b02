use campus_market_engine::{
    db_types::{Currency, NewOrderItem, OrderId, OrderStatusType, PaymentUpdate, WithdrawalStatus},
    StoreManagement,
};
use cucumber::{then, when};

use crate::{
    cucumber::MarketWorld,
    support::prepare_env::{address, units},
};

fn order_ids(world: &MarketWorld, labels: &str) -> Vec<OrderId> {
    labels.split(',').map(|l| world.order_id(l.trim())).collect()
}

#[when(expr = "'{word}' orders {int} '{word}' from '{word}' in {word} as order {word}")]
async fn place_order(
    world: &mut MarketWorld,
    buyer: String,
    quantity: i64,
    product: String,
    seller: String,
    currency: String,
    label: String,
) {
    let store = world.store_of(&seller);
    let product = world.product(&product);
    let currency = currency.parse::<Currency>().expect("Not a valid currency");
    let items = vec![NewOrderItem::new(product.id, quantity)];
    let result = world.market().orders.create_order(&address(&buyer), store.id, items, currency).await;
    if let Some(order) = world.record(result) {
        world.sys().orders.insert(label, order.order.id);
    }
}

#[when(expr = "payment {word} confirms order {word}")]
async fn confirm_payment(world: &mut MarketWorld, signature: String, label: String) {
    let id = world.order_id(&label);
    let result = world.market().orders.confirm_payment(id, &signature).await;
    world.record(result);
}

#[when(expr = "'{word}' marks order {word} as {word}")]
async fn mark_order(world: &mut MarketWorld, caller: String, label: String, status: String) {
    let id = world.order_id(&label);
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let result = world.market().orders.update_status(&address(&caller), id, status).await;
    world.record(result);
}

#[when(expr = "'{word}' requests a withdrawal for orders {word}")]
async fn request_withdrawal(world: &mut MarketWorld, seller: String, labels: String) {
    let ids = order_ids(world, &labels);
    let result = world.market().withdrawals.create_withdrawal_request(&address(&seller), &ids, None).await;
    if let Some(detail) = world.record(result) {
        world.sys().last_withdrawal = Some(detail);
    }
}

#[when(expr = "the withdrawal moves to {word}")]
async fn advance_withdrawal(world: &mut MarketWorld, status: String) {
    let status = status.parse::<WithdrawalStatus>().expect("Not a valid withdrawal status");
    let id = world.sys().last_withdrawal.as_ref().expect("No withdrawal has been requested").request.id;
    let result = world.market().withdrawals.advance_status(id, status, None).await;
    if let Some(request) = world.record(result) {
        if let Some(detail) = world.sys().last_withdrawal.as_mut() {
            detail.request = request;
        }
    }
}

#[then(expr = "order {word} has an amount of {word}")]
async fn check_order_amount(world: &mut MarketWorld, label: String, amount: String) {
    let id = world.order_id(&label);
    let order = world.market().orders.fetch_order(id).await.expect("Error fetching order");
    assert_eq!(order.order.amount, units(&amount), "Order amount is incorrect");
}

#[then(expr = "order {word} is {word}")]
async fn check_order_status(world: &mut MarketWorld, label: String, status: String) {
    let id = world.order_id(&label);
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let order = world.market().orders.fetch_order(id).await.expect("Error fetching order");
    assert_eq!(order.order.status, expected, "Order status is incorrect");
}

#[then(expr = "order {word} has been withdrawn")]
async fn check_withdrawn(world: &mut MarketWorld, label: String) {
    let id = world.order_id(&label);
    let order = world.market().orders.fetch_order(id).await.expect("Error fetching order");
    assert!(order.order.withdrawn, "Order {label} should be withdrawn");
}

#[then(expr = "order {word} can be withdrawn")]
async fn check_eligible(world: &mut MarketWorld, label: String) {
    let id = world.order_id(&label);
    let order = world.market().orders.fetch_order(id).await.expect("Error fetching order");
    let seller = world
        .market()
        .stores
        .fetch_store(order.order.store_id)
        .await
        .expect("Error fetching store")
        .owner_address;
    let eligible = world.market().withdrawals.list_eligible_orders(&seller).await.expect("Error listing orders");
    assert!(eligible.iter().any(|o| o.id == id), "Order {label} should be eligible for withdrawal");
}

#[then(expr = "confirming payment {word} for order {word} again changes nothing")]
async fn check_already_confirmed(world: &mut MarketWorld, signature: String, label: String) {
    let id = world.order_id(&label);
    let update = world.market().orders.confirm_payment(id, &signature).await.expect("Error confirming payment");
    assert!(matches!(update, PaymentUpdate::AlreadyConfirmed(_)), "Payment was applied twice");
}

#[then(expr = "the {int} day report shows {word} in fees and {word} for sellers")]
async fn check_report(world: &mut MarketWorld, days: i64, fees: String, revenue: String) {
    let admin = world.admin();
    let report = world.market().orders.transaction_report(&admin, days, 100).await.expect("Error fetching report");
    let fee_total = report.rows.iter().map(|r| r.platform_fee.value()).sum::<i64>();
    let revenue_total = report.rows.iter().map(|r| r.seller_revenue.value()).sum::<i64>();
    assert_eq!(fee_total, units(&fees).value(), "Platform fee is incorrect");
    assert_eq!(revenue_total, units(&revenue).value(), "Seller revenue is incorrect");
}

#[then(expr = "the withdrawal is {word} for {word}")]
async fn check_withdrawal(world: &mut MarketWorld, status: String, amount: String) {
    assert!(world.last_error_code().is_none(), "The last step failed: {:?}", world.sys().last_error);
    let expected = status.parse::<WithdrawalStatus>().expect("Not a valid withdrawal status");
    let detail = world.sys().last_withdrawal.clone().expect("No withdrawal has been requested");
    let stored = world
        .market()
        .withdrawals
        .fetch_withdrawal(&detail.request.seller_address, detail.request.id)
        .await
        .expect("Error fetching withdrawal");
    assert_eq!(stored.request.status, expected, "Withdrawal status is incorrect");
    assert_eq!(stored.request.amount, units(&amount), "Withdrawal amount is incorrect");
}

#[then(expr = "the step fails with {word}")]
async fn check_failure(world: &mut MarketWorld, code: String) {
    let actual = world.last_error_code().expect("The last step did not fail");
    assert_eq!(format!("{actual:?}"), code, "Unexpected error: {:?}", world.sys().last_error);
}

#[then(expr = "'{word}' has {int} left in stock")]
async fn check_inventory(world: &mut MarketWorld, product: String, inventory: i64) {
    let id = world.product(&product).id;
    let db = &world.system.as_ref().expect("Marketplace not initialised").test.db;
    let product = db.fetch_product(id).await.expect("Error fetching product").expect("Product was deleted");
    assert_eq!(product.inventory, inventory, "Inventory is incorrect");
}
