//! Wallet lifecycle management
//!
//! Mnemonic generation, create/recover/import, listing, detail and deletion.
//! Stored secrets are always encrypted with the wallet password before they
//! reach the record store.

use tracing::{info, warn};
use zeroize::Zeroizing;

use super::WalletManager;
use crate::core::address::Address;
use crate::core::bip44::{derive_account, DerivedKeyPair, ExtendedPrivateKey};
use crate::core::errors::WalletError;
use crate::core::mnemonic::{self, Wordlist};
use crate::core::wallet_info::{StoredWalletRecord, WalletDetail, WalletSummary};
use crate::security::secret::hex_to_secret;

/// Input for creating or recovering a wallet from a mnemonic.
pub struct WalletImport {
    pub name: String,
    pub mnemonic: Zeroizing<String>,
    /// Wordlist tag, e.g. `english` or `chinese_simplified`.
    pub language: String,
    /// Optional BIP39 passphrase.
    pub passphrase: Zeroizing<String>,
    /// Encrypts the stored key.
    pub password: Zeroizing<String>,
    pub hint: String,
}

impl WalletImport {
    pub fn new(name: &str, mnemonic: &str, language: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            mnemonic: Zeroizing::new(mnemonic.to_string()),
            language: language.to_string(),
            passphrase: Zeroizing::new(String::new()),
            password: Zeroizing::new(password.to_string()),
            hint: String::new(),
        }
    }

    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = Zeroizing::new(passphrase.to_string());
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = hint.to_string();
        self
    }
}

impl std::fmt::Debug for WalletImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletImport")
            .field("name", &self.name)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

/// Master key for a mnemonic in the given wordlist.
fn root_key(phrase: &str, language: &str, passphrase: &str) -> Result<ExtendedPrivateKey, WalletError> {
    let wordlist = Wordlist::from_tag(language)?;
    let phrase = phrase.trim();
    if !mnemonic::validate_mnemonic(phrase, wordlist) {
        return Err(WalletError::InvalidMnemonic(format!("not a valid {} mnemonic", wordlist)));
    }
    let seed = mnemonic::seed_from_mnemonic(phrase, wordlist, passphrase)?;
    ExtendedPrivateKey::from_seed(&seed[..])
}

/// Split an exported key into `(hint, iv, data)`; the hint is optional.
fn parse_export(key: &str) -> Result<(String, Vec<u8>, Vec<u8>), WalletError> {
    let parts: Vec<&str> = key.trim().split(':').collect();
    let (hint, iv, data) = match parts.as_slice() {
        [iv, data] => ("", *iv, *data),
        [hint, iv, data] => (*hint, *iv, *data),
        _ => {
            return Err(WalletError::InvalidInput(
                "expected hint:iv:data or iv:data".to_string(),
            ))
        }
    };
    let iv = hex::decode(iv).map_err(|_| WalletError::InvalidInput("iv is not hex".to_string()))?;
    let data = hex::decode(data).map_err(|_| WalletError::InvalidInput("data is not hex".to_string()))?;
    Ok((hint.to_string(), iv, data))
}

impl WalletManager {
    fn check_new_wallet(name: &str, password: &str) -> Result<(), WalletError> {
        if name.trim().is_empty() {
            return Err(WalletError::InvalidInput("wallet name must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(WalletError::InvalidInput("password must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn generate_mnemonic(&self, language: &str) -> Result<Zeroizing<String>, WalletError> {
        mnemonic::generate_mnemonic(Wordlist::from_tag(language)?)
    }

    /// Address of account 0 for a mnemonic, without storing anything.
    pub fn preview_address(&self, phrase: &str, language: &str, passphrase: &str) -> Result<Address, WalletError> {
        let root = root_key(phrase, language, passphrase)?;
        Ok(derive_account(&root, self.coin_type(), 0)?.address())
    }

    /// Store the account-0 key of a mnemonic as a single-key wallet.
    pub async fn recover_wallet(&self, import: WalletImport) -> Result<Address, WalletError> {
        Self::check_new_wallet(&import.name, &import.password)?;
        if self.wallets.exists(&import.name).await? {
            return Err(WalletError::DuplicateName(import.name));
        }
        let root = root_key(&import.mnemonic, &import.language, &import.passphrase)?;
        let pair = derive_account(&root, self.coin_type(), 0)?;
        let address = pair.address();

        let hex_key = Zeroizing::new(hex::encode(&pair.private_key[..]));
        let blob = self.cipher.encrypt(&import.password, hex_key.as_bytes())?;
        self.wallets
            .insert(&StoredWalletRecord {
                name: import.name.clone(),
                address: address.to_string(),
                data: blob.data,
                iv: blob.iv,
                hint: import.hint.clone(),
            })
            .await?;
        info!(wallet = %import.name, %address, "wallet recovered");
        Ok(address)
    }

    /// Store the encrypted master key so any account can be derived later.
    pub async fn recover_hd_wallet(&self, import: WalletImport) -> Result<(), WalletError> {
        Self::check_new_wallet(&import.name, &import.password)?;
        if self.wallets.exists(&import.name).await? {
            return Err(WalletError::DuplicateName(import.name));
        }
        let root = root_key(&import.mnemonic, &import.language, &import.passphrase)?;
        let encoded = root.to_base58()?;
        let blob = self.cipher.encrypt(&import.password, encoded.as_bytes())?;
        self.wallets
            .insert(&StoredWalletRecord {
                name: import.name.clone(),
                address: String::new(),
                data: blob.data,
                iv: blob.iv,
                hint: import.hint.clone(),
            })
            .await?;
        info!(wallet = %import.name, "HD wallet recovered");
        Ok(())
    }

    /// Generate a fresh mnemonic and store its account-0 key. Returns the
    /// address and the phrase for the user to back up.
    pub async fn create_wallet(
        &self,
        name: &str,
        language: &str,
        password: &str,
        hint: &str,
    ) -> Result<(Address, Zeroizing<String>), WalletError> {
        let phrase = self.generate_mnemonic(language)?;
        let import = WalletImport::new(name, &phrase, language, password).with_hint(hint);
        let address = self.recover_wallet(import).await?;
        Ok((address, phrase))
    }

    /// Import an exported key string (`hint:iv:data` or `iv:data`).
    ///
    /// The ciphertext is kept as exported; the password only has to open it.
    pub async fn import_wallet(&self, name: &str, password: &str, exported: &str) -> Result<String, WalletError> {
        Self::check_new_wallet(name, password)?;
        let (hint, iv, data) = parse_export(exported)?;
        let plain = self.cipher.decrypt_string(password, &iv, &data)?;

        let address = if let Ok(key) = hex_to_secret(&plain) {
            DerivedKeyPair::from_private_key(&key)
                .map_err(|_| WalletError::InvalidPassword)?
                .address()
                .to_string()
        } else {
            ExtendedPrivateKey::from_base58(&plain).map_err(|_| WalletError::InvalidPassword)?;
            String::new()
        };

        self.wallets
            .insert(&StoredWalletRecord {
                name: name.to_string(),
                address: address.clone(),
                data,
                iv,
                hint,
            })
            .await?;
        info!(wallet = %name, hd = address.is_empty(), "wallet imported");
        Ok(address)
    }

    /// Export a wallet as `hint:iv:data` after checking the password opens it.
    pub async fn export_wallet(&self, name: &str, password: &str) -> Result<String, WalletError> {
        let record = self.wallets.find(name).await?;
        self.cipher.decrypt(password, &record.iv, &record.data)?;
        Ok(record.export_key())
    }

    pub async fn list_wallets(&self, page: Option<usize>) -> Result<Vec<WalletSummary>, WalletError> {
        self.wallets.list(page).await
    }

    /// Address, hint and a fresh ledger view. HD roots carry no balance.
    pub async fn wallet_detail(&self, name: &str) -> Result<WalletDetail, WalletError> {
        let record = self.wallets.find(name).await?;
        let (balance, pending) = if record.is_hd_root() {
            (None, Vec::new())
        } else {
            match self.ledger.address_snapshot(&record.address).await {
                Ok(snapshot) => (Some(snapshot.balance), snapshot.pending),
                Err(e) => {
                    warn!(wallet = %name, "ledger lookup failed: {}", e);
                    return Err(e);
                }
            }
        };
        Ok(WalletDetail {
            name: record.name,
            address: record.address,
            hint: record.hint,
            balance,
            pending,
        })
    }

    pub async fn wallet_hint(&self, name: &str) -> Result<String, WalletError> {
        Ok(self.wallets.find(name).await?.hint)
    }

    /// `true` when no stored wallet uses `name`.
    pub async fn name_available(&self, name: &str) -> Result<bool, WalletError> {
        Ok(!self.wallets.exists(name).await?)
    }

    pub async fn delete_wallet(&self, name: &str) -> Result<usize, WalletError> {
        let removed = self.wallets.remove(name).await?;
        if removed > 0 {
            info!(wallet = %name, "wallet deleted");
        }
        Ok(removed)
    }
}
