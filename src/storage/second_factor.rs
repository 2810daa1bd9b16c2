// The single encrypted one-time-code secret.

use std::sync::Arc;

use super::{Collection, Filter, RecordStore};
use crate::core::errors::WalletError;
use crate::core::wallet_info::StoredSecondFactor;

#[derive(Clone)]
pub struct SecondFactorStore {
    records: Arc<dyn RecordStore>,
}

impl SecondFactorStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    pub async fn get(&self) -> Result<Option<StoredSecondFactor>, WalletError> {
        let docs = self.records.find(Collection::SecondFactor, &Filter::all()).await?;
        docs.into_iter()
            .next()
            .map(|doc| serde_json::from_value(doc).map_err(WalletError::from))
            .transpose()
    }

    pub async fn save(&self, record: &StoredSecondFactor) -> Result<(), WalletError> {
        if self.get().await?.is_some() {
            return Err(WalletError::SecondFactorAlreadyEnabled);
        }
        self.records
            .insert(Collection::SecondFactor, serde_json::to_value(record)?)
            .await
    }

    pub async fn clear(&self) -> Result<usize, WalletError> {
        self.records.remove(Collection::SecondFactor, &Filter::all()).await
    }
}
