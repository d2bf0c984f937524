//! FFCSA price derivation for `pricelist` rows.
//!
//! Every row carries a retail price and a unit of measure. The purchase price
//! is the discounted retail basis; member and guest sales prices apply their
//! markups on top of the unrounded purchase price. All arithmetic stays in
//! [`Decimal`] and is rounded once, at the end, to whole cents.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decimal places kept on every currency value.
const CURRENCY_DP: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("unknown unit of measure: {0:?}")]
    UnknownUnitOfMeasure(String),
    #[error("weight-priced product is missing its weight bounds")]
    MissingWeightBounds,
    #[error("lowest weight {lowest} exceeds highest weight {highest}")]
    InvertedWeightBounds { lowest: Decimal, highest: Decimal },
    #[error("retail sales price {0} is negative")]
    NegativeRetailPrice(Decimal),
}

/// How a product is sold: by the piece, or by weight within a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    Each,
    Weight,
}

impl FromStr for UnitOfMeasure {
    type Err = PricingError;

    /// `lbs` is the token the `pricelist` table has always stored for
    /// weight-priced products; `weight` is accepted as its canonical name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "each" => Ok(Self::Each),
            "lbs" | "weight" => Ok(Self::Weight),
            other => Err(PricingError::UnknownUnitOfMeasure(other.to_string())),
        }
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOfMeasure::Each => write!(f, "each"),
            UnitOfMeasure::Weight => write!(f, "weight"),
        }
    }
}

/// Process-wide markup and discount rates, loaded once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupConfig {
    pub member_markup: Decimal,
    pub guest_markup: Decimal,
    pub discount: Decimal,
}

/// The subset of a `pricelist` row the calculator reads.
#[derive(Debug, Clone, Copy)]
pub struct PriceInputs<'a> {
    /// Raw unit token as stored, e.g. `"each"` or `"lbs"`.
    pub unit_of_measure: &'a str,
    pub retail_sales_price: Decimal,
    pub lowest_weight: Option<Decimal>,
    pub highest_weight: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBundle {
    pub purchase_price: Decimal,
    pub member_sales_price: Decimal,
    pub guest_sales_price: Decimal,
}

/// Derives purchase, member and guest prices for a single row.
///
/// # Errors
///
/// - [`PricingError::UnknownUnitOfMeasure`] if the unit token is not recognized.
/// - [`PricingError::MissingWeightBounds`] / [`PricingError::InvertedWeightBounds`]
///   for weight-priced rows with unusable bounds.
/// - [`PricingError::NegativeRetailPrice`] if the retail price is below zero.
pub fn calculate_prices(
    inputs: &PriceInputs<'_>,
    markups: &MarkupConfig,
) -> Result<PriceBundle, PricingError> {
    let unit: UnitOfMeasure = inputs.unit_of_measure.parse()?;

    if inputs.retail_sales_price < Decimal::ZERO {
        return Err(PricingError::NegativeRetailPrice(inputs.retail_sales_price));
    }

    let basis = match unit {
        UnitOfMeasure::Each => inputs.retail_sales_price,
        UnitOfMeasure::Weight => {
            let (Some(lowest), Some(highest)) = (inputs.lowest_weight, inputs.highest_weight)
            else {
                return Err(PricingError::MissingWeightBounds);
            };
            if lowest > highest {
                return Err(PricingError::InvertedWeightBounds { lowest, highest });
            }
            let average_weight = (lowest + highest) / Decimal::TWO;
            average_weight * inputs.retail_sales_price
        }
    };

    let purchase = basis * markups.discount;

    Ok(PriceBundle {
        purchase_price: round_currency(purchase),
        member_sales_price: apply_markup(purchase, markups.member_markup),
        guest_sales_price: apply_markup(purchase, markups.guest_markup),
    })
}

/// `basis × (1 + markup)`, rounded to cents.
#[must_use]
pub fn apply_markup(basis: Decimal, markup: Decimal) -> Decimal {
    round_currency(basis * (Decimal::ONE + markup))
}

/// Rounds to two decimal places, ties to even.
#[must_use]
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointNearestEven)
}
