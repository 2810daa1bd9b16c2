// Saved destination addresses. Aliases are labels only; duplicates are kept.

use std::sync::Arc;

use tracing::debug;

use super::{Collection, Filter, RecordStore};
use crate::core::errors::WalletError;
use crate::core::wallet_info::Favorite;

#[derive(Clone)]
pub struct FavoriteStore {
    records: Arc<dyn RecordStore>,
}

impl FavoriteStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    pub async fn list(&self) -> Result<Vec<Favorite>, WalletError> {
        self.records
            .find(Collection::Favorites, &Filter::all())
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(WalletError::from))
            .collect()
    }

    pub async fn add(&self, favorite: &Favorite) -> Result<(), WalletError> {
        self.records
            .insert(Collection::Favorites, serde_json::to_value(favorite)?)
            .await?;
        debug!(alias = %favorite.alias, "favorite added");
        Ok(())
    }

    /// Removes every favorite carrying `alias`.
    pub async fn remove(&self, alias: &str) -> Result<usize, WalletError> {
        self.records
            .remove(Collection::Favorites, &Filter::all().eq("alias", alias))
            .await
    }
}
