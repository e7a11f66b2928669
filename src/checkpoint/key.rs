//! Collection key derivation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one (exchange, asset pair) combination in the checkpoint store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionKey(String);

impl CollectionKey {
    /// Build the key for an exchange and asset pair
    ///
    /// The key is the plain concatenation `exchange + pair`, no separator.
    pub fn new(exchange: &str, pair: &str) -> Self {
        let mut key = String::with_capacity(exchange.len() + pair.len());
        key.push_str(exchange);
        key.push_str(pair);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CollectionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
