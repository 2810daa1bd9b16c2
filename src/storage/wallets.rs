//! Typed access to stored wallet records.

use std::sync::Arc;

use tracing::{debug, info};

use super::{Collection, Filter, RecordStore};
use crate::core::errors::WalletError;
use crate::core::wallet_info::{StoredWalletRecord, WalletSummary};

/// Records per listing page.
pub const PAGE_SIZE: usize = 12;

#[derive(Clone)]
pub struct WalletStore {
    records: Arc<dyn RecordStore>,
}

impl WalletStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Insert a new record.
    ///
    /// Checks name, then address (non-empty addresses only), then inserts.
    /// The checks and the insert are separate store calls, not one atomic step.
    pub async fn insert(&self, record: &StoredWalletRecord) -> Result<(), WalletError> {
        if self.exists(&record.name).await? {
            return Err(WalletError::DuplicateName(record.name.clone()));
        }
        if !record.address.is_empty() && self.address_in_use(&record.address).await? {
            return Err(WalletError::DuplicateAddress(record.address.clone()));
        }
        self.records
            .insert(Collection::Wallets, serde_json::to_value(record)?)
            .await?;
        info!(wallet = %record.name, hd = record.is_hd_root(), "wallet stored");
        Ok(())
    }

    pub async fn find(&self, name: &str) -> Result<StoredWalletRecord, WalletError> {
        let docs = self
            .records
            .find(Collection::Wallets, &Filter::all().eq("name", name))
            .await?;
        match docs.into_iter().next() {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(WalletError::NotFound(format!("wallet '{}'", name))),
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool, WalletError> {
        Ok(!self
            .records
            .find(Collection::Wallets, &Filter::all().eq("name", name))
            .await?
            .is_empty())
    }

    pub async fn address_in_use(&self, address: &str) -> Result<bool, WalletError> {
        Ok(!self
            .records
            .find(Collection::Wallets, &Filter::all().eq("address", address))
            .await?
            .is_empty())
    }

    /// Name and address of stored wallets; `Some(i)` returns page `i` of
    /// [`PAGE_SIZE`] records in store order, `None` returns everything.
    pub async fn list(&self, page: Option<usize>) -> Result<Vec<WalletSummary>, WalletError> {
        let docs = self.records.find(Collection::Wallets, &Filter::all()).await?;
        let (skip, take) = match page {
            Some(index) => (index.saturating_mul(PAGE_SIZE), PAGE_SIZE),
            None => (0, usize::MAX),
        };
        docs.into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| -> Result<WalletSummary, WalletError> {
                let record: StoredWalletRecord = serde_json::from_value(doc)?;
                Ok(WalletSummary {
                    name: record.name,
                    address: record.address,
                })
            })
            .collect()
    }

    pub async fn remove(&self, name: &str) -> Result<usize, WalletError> {
        let removed = self
            .records
            .remove(Collection::Wallets, &Filter::all().eq("name", name))
            .await?;
        debug!(wallet = %name, removed, "wallet removal");
        Ok(removed)
    }
}
