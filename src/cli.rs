use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// HD hot wallet CLI (library-facing definitions)
///
/// Secrets are never taken as arguments. They are read from the environment
/// (`WALLET_PASSWORD`, `WALLET_MNEMONIC`, `WALLET_MNEMONIC_PASSPHRASE`,
/// `WALLET_DEVICE_PASSWORD`, `WALLET_2FA_PASSPHRASE`) or prompted for.
#[derive(Debug, Parser)]
#[command(name = "wallet-cli", about = "HD hot wallet CLI", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Configuration file; missing file means defaults
    #[arg(long, env = "WALLET_CONFIG", default_value = "wallet.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SignerChoice {
    /// Stored single-key wallet
    Local,
    /// Stored HD root, signs with `--account`
    Hd,
    /// Device that signs the encoded transaction
    Simple,
    /// Password protected device
    Gated,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a 12-word mnemonic
    GenerateMnemonic {
        #[arg(long, default_value = "english")]
        language: String,
    },
    /// Show the first address of a mnemonic without storing it
    Preview {
        #[arg(long, default_value = "english")]
        language: String,
    },
    /// Create a wallet from a fresh mnemonic
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "english")]
        language: String,
        #[arg(long, default_value = "")]
        hint: String,
    },
    /// Recover a wallet from a mnemonic
    Recover {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "english")]
        language: String,
        #[arg(long, default_value = "")]
        hint: String,
        /// Store the HD root instead of account 0
        #[arg(long)]
        hd: bool,
    },
    /// Import an exported key (`hint:iv:data` or `iv:data`)
    Import {
        #[arg(long)]
        name: String,
        #[arg(long)]
        key: String,
    },
    /// Print the exported key of a wallet
    Export {
        #[arg(long)]
        name: String,
    },
    List {
        /// Zero-based page of 12 wallets; all wallets when omitted
        #[arg(long)]
        page: Option<usize>,
    },
    Info {
        #[arg(long)]
        name: String,
    },
    Hint {
        #[arg(long)]
        name: String,
    },
    /// Check whether a wallet name is still free
    CheckName {
        #[arg(long)]
        name: String,
    },
    Delete {
        #[arg(long)]
        name: String,
    },
    /// List accounts of an HD wallet or a device
    Accounts {
        #[arg(long, value_enum, default_value = "hd")]
        signer: SignerChoice,
        /// HD wallet name
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 0)]
        start: u32,
        #[arg(long, default_value_t = 5)]
        count: u32,
    },
    /// Password and wallet state of the gated device
    DeviceStatus,
    /// Set the gated device password
    DevicePassword,
    /// Create the wallet on the gated device
    DeviceWallet {
        #[arg(long)]
        name: String,
    },
    /// Prepare, sign and submit a transaction
    Send {
        #[arg(long, value_enum, default_value = "local")]
        signer: SignerChoice,
        /// Wallet name (local and hd signers)
        #[arg(long)]
        wallet: Option<String>,
        #[arg(long, default_value_t = 0)]
        account: u32,
        /// Source address (device signers)
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        fee: String,
        #[arg(long)]
        nonce: Option<u32>,
        /// One-time code when the second factor is enabled
        #[arg(long)]
        otp: Option<String>,
    },
    /// Look a transaction up by hash
    Tx {
        #[arg(long)]
        hash: String,
    },
    Favorites,
    AddFavorite {
        #[arg(long)]
        alias: String,
        #[arg(long)]
        address: String,
    },
    RemoveFavorite {
        #[arg(long)]
        alias: String,
    },
    /// Generate a one-time-code secret and provisioning URI
    OtpGenerate {
        #[arg(long)]
        label: String,
    },
    /// Enable the second factor after confirming a code for the secret
    OtpEnable {
        #[arg(long)]
        secret: String,
        #[arg(long)]
        code: String,
    },
    OtpDisable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_arguments() {
        let cli = Cli::try_parse_from([
            "wallet-cli", "send", "--signer", "gated", "--account", "2", "--from", "Habc", "--to", "Hdef",
            "--amount", "1.5", "--fee", "0.001",
        ])
        .unwrap();
        match cli.command {
            Commands::Send { signer, account, from, nonce, .. } => {
                assert_eq!(signer, SignerChoice::Gated);
                assert_eq!(account, 2);
                assert_eq!(from.as_deref(), Some("Habc"));
                assert_eq!(nonce, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_list_page_is_optional() {
        let cli = Cli::try_parse_from(["wallet-cli", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { page: None }));
        let cli = Cli::try_parse_from(["wallet-cli", "--config", "x.toml", "list", "--page", "1"]).unwrap();
        assert!(matches!(cli.command, Commands::List { page: Some(1) }));
        assert_eq!(cli.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn test_command_tree_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
