//! Client for the LocalLine backoffice REST API and the payloads the price
//! sync sends to it.

pub mod client;
pub mod entry;
pub mod error;
pub mod types;

pub use client::LocalLineClient;
pub use entry::{build_package_update, build_price_list_entry, format_price};
pub use error::LocalLineError;
pub use types::{
    AccessToken, PackagePriceUpdate, PriceListEntryUpdate, ProductPackagesPatch, ProductUpdate,
    RemotePackage, RemotePriceListEntry, RemoteProduct,
};
