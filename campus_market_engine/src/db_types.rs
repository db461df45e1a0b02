use std::{fmt::Display, str::FromStr, sync::OnceLock};

pub use campus_common::MicroUnits;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------       Address        ---------------------------------------------------------
/// A wallet public key in base58, the primary identity of every actor in the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid wallet address")]
pub struct AddressError(pub String);

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("address regex is valid"))
}

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if address_pattern().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(AddressError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      Entity ids      ---------------------------------------------------------
macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

entity_id!(StoreId);
entity_id!(ProductId);
entity_id!(OrderId);
entity_id!(WithdrawalId);

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

//--------------------------------------       Currency        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Sol,
    Usdc,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Sol => write!(f, "SOL"),
            Currency::Usdc => write!(f, "USDC"),
        }
    }
}

impl FromStr for Currency {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOL" => Ok(Self::Sol),
            "USDC" => Ok(Self::Usdc),
            _ => Err(ConversionError { kind: "currency", value: s.to_string() }),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The closed set of order states.
///
/// | From \ To | Pending | Paid | Fulfilled | Cancelled |
/// |-----------|---------|------|-----------|-----------|
/// | Pending   | -       | ok   | Err       | Err       |
/// | Paid      | Err     | -    | ok        | ok        |
/// | Fulfilled | Err     | Err  | -         | Err       |
/// | Cancelled | Err     | Err  | Err       | -         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created and is awaiting payment.
    Pending,
    /// A payment transaction signature has been recorded against the order.
    Paid,
    /// The seller has handed over the goods.
    Fulfilled,
    /// The seller cancelled a paid order.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Pending, Paid) | (Paid, Fulfilled) | (Paid, Cancelled))
    }

    /// Orders whose revenue a seller may withdraw.
    pub fn is_settleable(&self) -> bool {
        matches!(self, Self::Paid | Self::Fulfilled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Fulfilled => write!(f, "fulfilled"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "fulfilled" => Ok(Self::Fulfilled),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ConversionError { kind: "order status", value: s.to_string() }),
        }
    }
}

//--------------------------------------   WithdrawalStatus    ---------------------------------------------------------
/// `Requested -> Processing -> Completed`, with `Failed` reachable from either non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Requested,
    Processing,
    Completed,
    Failed,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!((self, next), (Requested, Processing) | (Processing, Completed) | (Requested | Processing, Failed))
    }

    /// The states a request must currently be in for a move to `next` to be legal.
    pub fn allowed_sources(next: WithdrawalStatus) -> &'static [WithdrawalStatus] {
        use WithdrawalStatus::*;
        match next {
            Requested => &[],
            Processing => &[Requested],
            Completed => &[Processing],
            Failed => &[Requested, Processing],
        }
    }
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Requested => write!(f, "requested"),
            WithdrawalStatus::Processing => write!(f, "processing"),
            WithdrawalStatus::Completed => write!(f, "completed"),
            WithdrawalStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requested" => Ok(Self::Requested),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ConversionError { kind: "withdrawal status", value: s.to_string() }),
        }
    }
}

//--------------------------------------        Store         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub owner_address: Address,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Always `geohash::encode(latitude, longitude, precision)`; rewritten whenever the coordinates change.
    pub geohash: String,
    pub banner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStore {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub banner: Option<String>,
}

impl NewStore {
    pub fn new<S: Into<String>>(name: S, category: S, latitude: f64, longitude: f64) -> Self {
        Self { name: name.into(), category: category.into(), description: None, latitude, longitude, banner: None }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_banner<S: Into<String>>(mut self, banner: S) -> Self {
        self.banner = Some(banner.into());
        self
    }
}

/// Changes to a store's descriptive fields. Location changes go through their own call so the geohash is always
/// recomputed alongside them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub banner: Option<String>,
}

impl StoreUpdate {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_banner<S: Into<String>>(mut self, banner: S) -> Self {
        self.banner = Some(banner.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.category.is_none() && self.description.is_none() && self.banner.is_none()
    }
}

//--------------------------------------       Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub category: String,
    pub price: MicroUnits,
    pub inventory: i64,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: MicroUnits,
    pub inventory: i64,
    pub image: Option<String>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, category: S, price: MicroUnits, inventory: i64) -> Self {
        Self { name: name.into(), category: category.into(), price, inventory, image: None }
    }

    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<MicroUnits>,
    pub inventory: Option<i64>,
    pub image: Option<String>,
}

impl ProductUpdate {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_price(mut self, price: MicroUnits) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_inventory(mut self, inventory: i64) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() &&
            self.category.is_none() &&
            self.price.is_none() &&
            self.inventory.is_none() &&
            self.image.is_none()
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer: Address,
    pub store_id: StoreId,
    pub currency: Currency,
    /// The sum of the order lines at creation time. Never rewritten, fees are derived at read time.
    pub amount: MicroUnits,
    pub status: OrderStatusType,
    pub tx_signature: Option<String>,
    pub withdrawn: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single order line. The unit price is captured when the order is created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub line_no: i64,
    pub product_id: ProductId,
    pub unit_price: MicroUnits,
    pub quantity: i64,
}

impl OrderItem {
    /// `unit_price * quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<MicroUnits> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl NewOrderItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub buyer: Address,
    pub store_id: StoreId,
    pub currency: Currency,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new(buyer: Address, store_id: StoreId, currency: Currency) -> Self {
        Self { buyer, store_id, currency, items: Vec::new() }
    }

    pub fn with_item(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.items.push(NewOrderItem::new(product_id, quantity));
        self
    }
}

/// An order together with its lines, in line order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl FullOrder {
    /// The sum of the line totals, or `None` on overflow.
    pub fn items_total(&self) -> Option<MicroUnits> {
        self.items.iter().try_fold(MicroUnits::default(), |acc, item| acc.checked_add(item.line_total()?))
    }
}

/// The outcome of recording a payment signature against an order.
#[derive(Debug, Clone)]
pub enum PaymentUpdate {
    /// The order moved from `Pending` to `Paid`.
    Confirmed(Order),
    /// The order was already paid with the same signature; nothing changed.
    AlreadyConfirmed(Order),
}

impl PaymentUpdate {
    pub fn order(&self) -> &Order {
        match self {
            Self::Confirmed(o) | Self::AlreadyConfirmed(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Self::Confirmed(o) | Self::AlreadyConfirmed(o) => o,
        }
    }
}

//--------------------------------------  WithdrawalRequest   ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub seller_address: Address,
    /// Sum of the seller revenue of every constituent order.
    pub amount: MicroUnits,
    pub currency: Currency,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tx_signature: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalDetail {
    pub request: WithdrawalRequest,
    pub order_ids: Vec<OrderId>,
}

//--------------------------------------   PointsLedgerEntry  ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PointsLedgerEntry {
    pub id: i64,
    pub address: Address,
    pub delta: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPointsEntry {
    pub address: Address,
    pub delta: i64,
    pub reason: String,
}

//--------------------------------------       Profile        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub address: Address,
    pub name: Option<String>,
    pub school: Option<String>,
    pub campus: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    /// Derived from the points ledger on every read.
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub school: Option<String>,
    pub campus: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_school<S: Into<String>>(mut self, school: S) -> Self {
        self.school = Some(school.into());
        self
    }

    pub fn with_campus<S: Into<String>>(mut self, campus: S) -> Self {
        self.campus = Some(campus.into());
        self
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_avatar<S: Into<String>>(mut self, avatar: S) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}
