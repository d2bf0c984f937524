//! LocalLine price-list targets the price sync writes to.

use rust_decimal::Decimal;

use crate::pricing::MarkupConfig;

/// Targets used when `DFF_PRICE_LISTS` is unset: two member lists and the
/// guest list of the test storefront.
pub const DEFAULT_PRICE_LISTS: &str = "test1:5332:member,test2:5333:member,guest:4757:guest";

/// A remote price list paired with the markup the sync applies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceListTarget {
    pub name: String,
    pub id: i64,
    pub markup: Decimal,
}

impl PriceListTarget {
    /// Human-readable description used in the missing-link log.
    #[must_use]
    pub fn missing_description(&self) -> String {
        format!(
            "product does not appear in pricelist {} ({})",
            self.name, self.id
        )
    }
}

/// Parses a comma-separated list of `name:id:markup` triples.
///
/// `markup` is either `member`, `guest`, or a literal decimal rate such as
/// `0.42`. Order is preserved; it is the order in which the sync visits lists.
///
/// # Errors
///
/// Returns a human-readable reason when an entry is malformed, an id is not an
/// integer, a literal markup is not a positive decimal, or the list is empty.
pub fn parse_price_list_targets(
    raw: &str,
    markups: &MarkupConfig,
) -> Result<Vec<PriceListTarget>, String> {
    let mut targets = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let [name, id, markup] = parts.as_slice() else {
            return Err(format!("expected name:id:markup, got {entry:?}"));
        };
        if name.is_empty() {
            return Err(format!("empty price list name in {entry:?}"));
        }

        let id = id
            .parse::<i64>()
            .map_err(|e| format!("invalid price list id in {entry:?}: {e}"))?;

        let markup = match *markup {
            "member" => markups.member_markup,
            "guest" => markups.guest_markup,
            literal => {
                let rate = literal
                    .parse::<Decimal>()
                    .map_err(|e| format!("invalid markup in {entry:?}: {e}"))?;
                if rate <= Decimal::ZERO {
                    return Err(format!("markup must be positive in {entry:?}"));
                }
                rate
            }
        };

        targets.push(PriceListTarget {
            name: (*name).to_string(),
            id,
            markup,
        });
    }

    if targets.is_empty() {
        return Err("at least one price list target is required".to_string());
    }

    Ok(targets)
}
