//! Currencies and exact monetary conversions.
//!
//! The marketplace settles exactly two currencies: the fiat side (NGN,
//! minor unit kobo) and the stablecoin asset side (USDT). All amounts are
//! [`rust_decimal::Decimal`] — never binary floating point. The payment
//! gateway speaks minor-unit integers; conversions here are exact.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::constants::MINOR_UNITS_PER_MAJOR;

/// A settleable currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Currency {
    /// The fiat currency (minor unit: kobo).
    Ngn,
    /// The stablecoin-like traded asset.
    Usdt,
}

impl Currency {
    /// Whether this is the fiat side.
    #[must_use]
    pub fn is_fiat(self) -> bool {
        self == Self::Ngn
    }

    /// Whether this is the traded asset side.
    #[must_use]
    pub fn is_asset(self) -> bool {
        self == Self::Usdt
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ngn => write!(f, "NGN"),
            Self::Usdt => write!(f, "USDT"),
        }
    }
}

/// Convert a minor-unit integer amount (e.g. kobo) to a major-unit decimal.
///
/// Exact: 500_000 minor units become `5000.00`.
#[must_use]
pub fn minor_to_major(amount_minor: u64) -> Decimal {
    Decimal::from(amount_minor) / Decimal::from(MINOR_UNITS_PER_MAJOR)
}

/// Convert a major-unit decimal to a minor-unit integer.
///
/// Returns `None` if the amount is negative or does not land exactly on a
/// minor unit (sub-kobo precision would silently lose value).
#[must_use]
pub fn major_to_minor(amount: Decimal) -> Option<u64> {
    if amount.is_sign_negative() {
        return None;
    }
    let scaled = amount * Decimal::from(MINOR_UNITS_PER_MAJOR);
    if scaled.fract().is_zero() {
        scaled.to_u64()
    } else {
        None
    }
}
