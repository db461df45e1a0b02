use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MicroUnits;

pub const BPS_DENOMINATOR: u32 = 10_000;
/// 5%, the rate the marketplace has always charged.
pub const DEFAULT_FEE_RATE_BPS: u32 = 500;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Fee rate must be between 0 and {BPS_DENOMINATOR} basis points, got {0}")]
pub struct FeeRateError(pub u32);

/// The platform's share of every order, in basis points.
///
/// Reporting and settlement must both derive fees from the same `FeeRate` instance. `platform_fee` rounds half-up to
/// the nearest micro-unit and `seller_revenue` is defined as the remainder, so
/// `platform_fee(a) + seller_revenue(a) == a` holds exactly for every amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRate {
    bps: u32,
}

impl Default for FeeRate {
    fn default() -> Self {
        Self { bps: DEFAULT_FEE_RATE_BPS }
    }
}

impl FeeRate {
    pub fn from_bps(bps: u32) -> Result<Self, FeeRateError> {
        if bps > BPS_DENOMINATOR {
            return Err(FeeRateError(bps));
        }
        Ok(Self { bps })
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    pub fn platform_fee(&self, amount: MicroUnits) -> MicroUnits {
        let num = i128::from(amount.value()) * i128::from(self.bps);
        let den = i128::from(BPS_DENOMINATOR);
        let half = den / 2;
        let fee = if num >= 0 { (num + half) / den } else { (num - half) / den };
        // |fee| <= |amount| since bps <= denominator
        #[allow(clippy::cast_possible_truncation)]
        MicroUnits::from(fee as i64)
    }

    pub fn seller_revenue(&self, amount: MicroUnits) -> MicroUnits {
        amount - self.platform_fee(amount)
    }
}

impl Display for FeeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.bps / 100, self.bps % 100)
    }
}
