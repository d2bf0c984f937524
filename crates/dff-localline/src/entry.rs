//! Builds the package price patch sent to LocalLine for one price list.

use dff_core::round_currency;
use rust_decimal::Decimal;

use crate::types::{
    PackagePriceUpdate, PriceListEntryUpdate, ProductPackagesPatch, RemotePackage,
    RemotePriceListEntry,
};

/// LocalLine's code for a percentage markup adjustment.
const ADJUSTMENT_TYPE_PERCENT: u8 = 2;

/// Formats a price as a two-decimal string (`"6.5"` becomes `"6.50"`).
#[must_use]
pub fn format_price(value: Decimal) -> String {
    let mut rounded = round_currency(value);
    rounded.rescale(2);
    rounded.to_string()
}

/// Builds the price-list entry for `basis` marked up by `markup`.
///
/// Returns `None` when the product has no entry on the target list; entries
/// are never created here, the caller records the miss instead.
#[must_use]
pub fn build_price_list_entry(
    basis: Decimal,
    existing: Option<&RemotePriceListEntry>,
    markup: Decimal,
) -> Option<PriceListEntryUpdate> {
    let entry = existing?;

    Some(PriceListEntryUpdate {
        adjustment: true,
        adjustment_type: ADJUSTMENT_TYPE_PERCENT,
        adjustment_value: round_currency(markup * Decimal::ONE_HUNDRED),
        price_list: entry.price_list,
        checked: true,
        not_submitted: false,
        edited: false,
        dirty: true,
        product_price_list_entry: entry.id,
        calculated_value: round_currency(basis * (Decimal::ONE + markup)),
        on_sale: false,
        on_sale_toggle: false,
        max_units_per_order: None,
        strikethrough_display_value: None,
    })
}

/// Wraps `entry` in the single-package patch body.
#[must_use]
pub fn build_package_update(
    package: &RemotePackage,
    basis: Decimal,
    entry: PriceListEntryUpdate,
) -> ProductPackagesPatch {
    let price = format_price(basis);
    ProductPackagesPatch {
        packages: vec![PackagePriceUpdate {
            id: package.id,
            name: package.name.clone(),
            unit_price: price.clone(),
            package_price: price.clone(),
            package_unit_price: price,
            inventory_per_unit: 1,
            price_list_entries: vec![entry],
        }],
    }
}
