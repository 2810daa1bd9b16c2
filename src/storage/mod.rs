//! Record persistence.
//!
//! A [`RecordStore`] is a small document store: named collections of JSON
//! documents supporting insert, find-by-field-match and remove-by-field-match.
//! Typed stores (wallets, favorites, second factor) sit on top of it.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::errors::WalletError;

mod favorites;
mod memory;
mod second_factor;
mod sqlite;
mod wallets;

pub use favorites::FavoriteStore;
pub use memory::MemoryStore;
pub use second_factor::SecondFactorStore;
pub use sqlite::SqliteStore;
pub use wallets::{WalletStore, PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Wallets,
    Favorites,
    SecondFactor,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Wallets => "wallets",
            Collection::Favorites => "favorites",
            Collection::SecondFactor => "secondFactor",
        }
    }
}

/// Field-equality filter. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Matching documents in insertion order.
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, WalletError>;

    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), WalletError>;

    /// Remove every matching document and report how many went.
    async fn remove(&self, collection: Collection, filter: &Filter) -> Result<usize, WalletError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matching() {
        let doc = json!({"name": "a", "address": "H1"});
        assert!(Filter::all().matches(&doc));
        assert!(Filter::all().eq("name", "a").matches(&doc));
        assert!(!Filter::all().eq("name", "b").matches(&doc));
        assert!(!Filter::all().eq("missing", "a").matches(&doc));
        assert!(Filter::all().eq("name", "a").eq("address", "H1").matches(&doc));
    }
}
