use super::WalletManager;
use crate::core::address::Address;
use crate::core::errors::WalletError;
use crate::core::wallet_info::Favorite;

impl WalletManager {
    pub async fn list_favorites(&self) -> Result<Vec<Favorite>, WalletError> {
        self.favorites.list().await
    }

    /// Save a destination under `alias`. The address must decode.
    pub async fn add_favorite(&self, alias: &str, address: &str) -> Result<(), WalletError> {
        if alias.trim().is_empty() {
            return Err(WalletError::InvalidInput("alias must not be empty".to_string()));
        }
        let parsed: Address = address
            .parse()
            .map_err(|e| WalletError::InvalidDestinationAddress(format!("{}: {}", address, e)))?;
        self.favorites
            .add(&Favorite {
                alias: alias.trim().to_string(),
                address: parsed.to_string(),
            })
            .await
    }

    pub async fn remove_favorite(&self, alias: &str) -> Result<usize, WalletError> {
        self.favorites.remove(alias).await
    }
}
