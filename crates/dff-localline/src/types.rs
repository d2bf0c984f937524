//! Wire types for the LocalLine backoffice API.
//!
//! Only the fields the sync and inventory paths read or write are modelled;
//! unknown response fields are ignored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Short-lived bearer credential returned by `POST token`.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    access: String,
}

impl AccessToken {
    #[must_use]
    pub fn new(access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.access
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// A product as returned by `GET products/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    /// Not every response echoes the id; callers key on the id they requested.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub packages: Vec<RemotePackage>,
    #[serde(default)]
    pub product_price_list_entries: Vec<RemotePriceListEntry>,
}

impl RemoteProduct {
    /// The package price updates are applied to.
    #[must_use]
    pub fn first_package(&self) -> Option<&RemotePackage> {
        self.packages.first()
    }

    /// The product's existing entry on `price_list_id`, if it has one.
    #[must_use]
    pub fn entry_for(&self, price_list_id: i64) -> Option<&RemotePriceListEntry> {
        self.product_price_list_entries
            .iter()
            .find(|e| e.price_list == price_list_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePackage {
    pub id: i64,
    pub name: String,
}

/// Association between a product and a price list.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePriceListEntry {
    pub id: i64,
    pub price_list: i64,
    #[serde(default)]
    pub price_list_name: Option<String>,
}

/// One entry in `packages[].price_list_entries` of a package price patch.
///
/// Field names and the flag values are what the backoffice UI sends when a
/// package price is edited; LocalLine rejects partial shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceListEntryUpdate {
    pub adjustment: bool,
    pub adjustment_type: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub adjustment_value: Decimal,
    pub price_list: i64,
    pub checked: bool,
    #[serde(rename = "notSubmitted")]
    pub not_submitted: bool,
    pub edited: bool,
    pub dirty: bool,
    pub product_price_list_entry: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub calculated_value: Decimal,
    pub on_sale: bool,
    pub on_sale_toggle: bool,
    pub max_units_per_order: Option<u32>,
    pub strikethrough_display_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagePriceUpdate {
    pub id: i64,
    pub name: String,
    /// Two-decimal string, as the backoffice sends it.
    pub unit_price: String,
    pub package_price: String,
    pub package_unit_price: String,
    pub inventory_per_unit: u32,
    pub price_list_entries: Vec<PriceListEntryUpdate>,
}

/// Body of `PATCH products/{id}/?expand=vendor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPackagesPatch {
    pub packages: Vec<PackagePriceUpdate>,
}

/// Body of `PATCH products/{id}/` from the inventory page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    pub visible: bool,
    pub track_inventory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_inventory: Option<i32>,
}

impl ProductUpdate {
    /// Builds the inventory patch. Stock is only pushed when LocalLine is
    /// tracking inventory for the product, or when it has run out.
    #[must_use]
    pub fn from_inventory(
        visible: bool,
        track_inventory: bool,
        stock_inventory: i32,
        description: Option<&str>,
        name: Option<&str>,
    ) -> Self {
        let set_inventory = (track_inventory || stock_inventory == 0).then_some(stock_inventory);
        Self {
            visible,
            track_inventory,
            description: description.map(ToOwned::to_owned),
            name: name.map(ToOwned::to_owned),
            set_inventory,
        }
    }
}
