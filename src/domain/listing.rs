// src/domain/listing.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One offer as it appeared on the search results at crawl time.
///
/// Only `id`, `price` and the identity-key fields are typed; everything else the
/// extractor produced (title, metro, address, url, ...) rides along in `attributes`
/// and is written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "offer_id")]
    pub id: String,

    /// Numeric monthly price. `None` when the card did not show one.
    /// The display string ("95 000 ₽/мес.") stays in `attributes["price"]`.
    #[serde(default, rename = "price_numeric")]
    pub price: Option<i64>,

    // Identity-key fields (see `identity_key`)
    #[serde(default)]
    pub building_id: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub rooms: Option<i32>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Physical identity of a listing, independent of the id the site assigned.
/// Two offers with the same key are treated as the same flat re-posted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey<'a> {
    pub building_id: &'a str,
    pub price: i64,
    pub floor: i32,
    pub rooms: i32,
}

impl Record {
    pub fn new(id: impl Into<String>, price: Option<i64>) -> Self {
        Self {
            id: id.into(),
            price,
            building_id: None,
            floor: None,
            rooms: None,
            attributes: Map::new(),
        }
    }

    /// `None` unless all four fields are present. An empty building id counts as missing.
    pub fn identity_key(&self) -> Option<IdentityKey<'_>> {
        Some(IdentityKey {
            building_id: self.building_id.as_deref().filter(|b| !b.is_empty())?,
            price: self.price?,
            floor: self.floor?,
            rooms: self.rooms?,
        })
    }

    /// String attribute lookup; blank values read as absent.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}
