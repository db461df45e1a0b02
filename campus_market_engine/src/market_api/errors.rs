use campus_common::{FeeRateError, MicroUnitsConversionError};
use serde::{Deserialize, Serialize};
use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::{
    db_types::{
        Address,
        AddressError,
        ConversionError,
        OrderId,
        OrderStatusType,
        ProductId,
        StoreId,
        WithdrawalId,
        WithdrawalStatus,
    },
    geohash::GeohashError,
};

/// The stable error codes surfaced to route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    Unauthorized,
    Forbidden,
    InvalidTransition,
    AlreadyWithdrawn,
    InsufficientInventory,
    MixedCurrency,
    NoEligibleOrders,
    Conflict,
    ValidationError,
    StoreUnavailable,
    InternalError,
}

impl ErrorCode {
    /// Only a failed backing-store call may be retried blindly by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketError {
    #[error("The requested store {0} does not exist")]
    StoreNotFound(StoreId),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested withdrawal request {0} does not exist")]
    WithdrawalNotFound(WithdrawalId),
    #[error("There is no profile for {0}")]
    ProfileNotFound(Address),
    #[error("This action requires an authenticated wallet")]
    Unauthenticated,
    #[error("{0} is not an administrator")]
    NotAdmin(Address),
    #[error("{caller} is not allowed to {action}")]
    Forbidden { caller: Address, action: String },
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidOrderTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Withdrawal request {id} cannot move from {from} to {to}")]
    InvalidWithdrawalTransition { id: WithdrawalId, from: WithdrawalStatus, to: WithdrawalStatus },
    #[error("Order {0} is not eligible for withdrawal")]
    OrderNotEligible(OrderId),
    #[error("Order {0} has already been claimed by another withdrawal request")]
    AlreadyWithdrawn(OrderId),
    #[error("Product {product_id} has {available} units left, but {requested} were requested")]
    InsufficientInventory { product_id: ProductId, requested: i64, available: i64 },
    #[error("All orders in a withdrawal request must use the same currency")]
    MixedCurrency,
    #[error("A withdrawal request needs at least one eligible order")]
    NoEligibleOrders,
    #[error("Order {order_id} was already paid with transaction {existing}")]
    PaymentConflict { order_id: OrderId, existing: String },
    #[error("{address} has {available} points, cannot deduct {requested}")]
    InsufficientPoints { address: Address, requested: i64, available: i64 },
    #[error("Latitude {latitude} / longitude {longitude} is not a valid coordinate")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("Invalid input. {0}")]
    ValidationError(String),
    #[error("The request conflicts with existing data. {0}")]
    Conflict(String),
    #[error("The backing store could not complete the request. {0}")]
    StoreUnavailable(String),
    #[error("Unexpected internal error. {0}")]
    InternalError(String),
}

impl MarketError {
    pub fn code(&self) -> ErrorCode {
        use MarketError::*;
        match self {
            StoreNotFound(_) | ProductNotFound(_) | OrderNotFound(_) | WithdrawalNotFound(_) | ProfileNotFound(_) => {
                ErrorCode::NotFound
            },
            Unauthenticated | NotAdmin(_) => ErrorCode::Unauthorized,
            Forbidden { .. } => ErrorCode::Forbidden,
            InvalidOrderTransition { .. } | InvalidWithdrawalTransition { .. } | OrderNotEligible(_) => {
                ErrorCode::InvalidTransition
            },
            AlreadyWithdrawn(_) => ErrorCode::AlreadyWithdrawn,
            InsufficientInventory { .. } => ErrorCode::InsufficientInventory,
            MixedCurrency => ErrorCode::MixedCurrency,
            NoEligibleOrders => ErrorCode::NoEligibleOrders,
            PaymentConflict { .. } | Conflict(_) => ErrorCode::Conflict,
            InsufficientPoints { .. } | InvalidCoordinate { .. } | ValidationError(_) => ErrorCode::ValidationError,
            StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            InternalError(_) => ErrorCode::InternalError,
        }
    }

    pub fn forbidden<S: Into<String>>(caller: &Address, action: S) -> Self {
        Self::Forbidden { caller: caller.clone(), action: action.into() }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
}

impl From<sqlx::Error> for MarketError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation => MarketError::Conflict(db.message().to_string()),
                ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    MarketError::ValidationError(db.message().to_string())
                },
                _ => MarketError::StoreUnavailable(e.to_string()),
            },
            sqlx::Error::ColumnDecode { .. } |
            sqlx::Error::ColumnNotFound(_) |
            sqlx::Error::ColumnIndexOutOfBounds { .. } |
            sqlx::Error::TypeNotFound { .. } |
            sqlx::Error::Decode(_) |
            sqlx::Error::Migrate(_) => MarketError::InternalError(e.to_string()),
            _ => MarketError::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<GeohashError> for MarketError {
    fn from(e: GeohashError) -> Self {
        match e {
            GeohashError::InvalidCoordinate { latitude, longitude } => {
                MarketError::InvalidCoordinate { latitude, longitude }
            },
            other => MarketError::ValidationError(other.to_string()),
        }
    }
}

impl From<AddressError> for MarketError {
    fn from(e: AddressError) -> Self {
        MarketError::ValidationError(e.to_string())
    }
}

impl From<ConversionError> for MarketError {
    fn from(e: ConversionError) -> Self {
        MarketError::ValidationError(e.to_string())
    }
}

impl From<MicroUnitsConversionError> for MarketError {
    fn from(e: MicroUnitsConversionError) -> Self {
        MarketError::ValidationError(e.to_string())
    }
}

impl From<FeeRateError> for MarketError {
    fn from(e: FeeRateError) -> Self {
        MarketError::ValidationError(e.to_string())
    }
}
