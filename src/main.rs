// src/main.rs
//! HD hot wallet command-line entry point.
use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use hd_hot_wallet::cli::{Cli, Commands, SignerChoice};
use hd_hot_wallet::core::config::WalletConfig;
use hd_hot_wallet::core::errors::codes;
use hd_hot_wallet::core::wallet_manager::{SecondFactorProof, SendRequest, SignerKind, WalletImport};
use hd_hot_wallet::core::WalletManager;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = WalletConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    debug!(database = %config.storage.database_url, ledger = %config.ledger.base_url, "configuration ready");
    let manager = WalletManager::from_config(config).await?;

    run(&manager, cli.command).await
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,hd_hot_wallet=info"));

    // stdout carries command output only
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Secret from `var`, else prompted on stderr and read from stdin.
fn secret(var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(var) {
        return Ok(Zeroizing::new(value));
    }
    if io::stdin().is_terminal() {
        eprint!("{}: ", prompt);
        io::stderr().flush()?;
    }
    let mut line = Zeroizing::new(String::new());
    io::stdin()
        .read_line(&mut line)
        .with_context(|| format!("reading {}", prompt))?;
    Ok(Zeroizing::new(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

fn optional_secret(var: &str) -> Zeroizing<String> {
    Zeroizing::new(std::env::var(var).unwrap_or_default())
}

fn wallet_password() -> Result<Zeroizing<String>> {
    secret("WALLET_PASSWORD", "Wallet password")
}

fn device_password() -> Result<Zeroizing<String>> {
    secret("WALLET_DEVICE_PASSWORD", "Device password")
}

fn mnemonic() -> Result<Zeroizing<String>> {
    secret("WALLET_MNEMONIC", "Mnemonic")
}

async fn run(manager: &WalletManager, command: Commands) -> Result<()> {
    match command {
        Commands::GenerateMnemonic { language } => {
            let phrase = manager.generate_mnemonic(&language)?;
            println!("{}", phrase.as_str());
        }
        Commands::Preview { language } => {
            let phrase = mnemonic()?;
            let passphrase = optional_secret("WALLET_MNEMONIC_PASSPHRASE");
            let address = manager.preview_address(&phrase, &language, &passphrase)?;
            println!("{}", address);
        }
        Commands::Create { name, language, hint } => {
            let password = wallet_password()?;
            let (address, phrase) = manager.create_wallet(&name, &language, &password, &hint).await?;
            info!(wallet = %name, %address, "wallet created");
            eprintln!("Write down this mnemonic; it is not stored:");
            println!("{}", phrase.as_str());
            println!("{}", address);
        }
        Commands::Recover { name, language, hint, hd } => {
            let import = WalletImport::new(&name, &mnemonic()?, &language, &wallet_password()?)
                .with_passphrase(&optional_secret("WALLET_MNEMONIC_PASSPHRASE"))
                .with_hint(&hint);
            if hd {
                manager.recover_hd_wallet(import).await?;
                println!("{}", name);
            } else {
                println!("{}", manager.recover_wallet(import).await?);
            }
        }
        Commands::Import { name, key } => {
            let address = manager.import_wallet(&name, &wallet_password()?, &key).await?;
            println!("{}", if address.is_empty() { name } else { address });
        }
        Commands::Export { name } => {
            println!("{}", manager.export_wallet(&name, &wallet_password()?).await?);
        }
        Commands::List { page } => print_json(&manager.list_wallets(page).await?)?,
        Commands::Info { name } => print_json(&manager.wallet_detail(&name).await?)?,
        Commands::Hint { name } => println!("{}", manager.wallet_hint(&name).await?),
        Commands::CheckName { name } => {
            print_json(&serde_json::json!({ "name": name, "available": manager.name_available(&name).await? }))?
        }
        Commands::Delete { name } => {
            let removed = manager.delete_wallet(&name).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Accounts { signer, name, start, count } => {
            let accounts = match signer {
                SignerChoice::Local | SignerChoice::Hd => {
                    let name = name.context("--name is required for HD accounts")?;
                    manager.hd_accounts(&name, &wallet_password()?, start, count).await?
                }
                SignerChoice::Simple => manager.simple_device_accounts(start, count).await?,
                SignerChoice::Gated => manager.gated_device_accounts(&device_password()?, start, count).await?,
            };
            print_json(&accounts)?;
        }
        Commands::DeviceStatus => {
            let password_set = manager.gated_device_password_set().await?;
            let wallet_set = if password_set {
                Some(manager.gated_device_wallet_set(&device_password()?).await?)
            } else {
                None
            };
            print_json(&serde_json::json!({ "passwordSet": password_set, "walletSet": wallet_set }))?;
        }
        Commands::DevicePassword => manager.set_gated_device_password(&device_password()?).await?,
        Commands::DeviceWallet { name } => manager.create_gated_device_wallet(&name, &device_password()?).await?,
        Commands::Send { signer, wallet, account, from, to, amount, fee, nonce, otp } => {
            let signer = match signer {
                SignerChoice::Local => SignerKind::LocalKey {
                    wallet: wallet.context("--wallet is required")?,
                    passphrase: wallet_password()?,
                },
                SignerChoice::Hd => SignerKind::LocalHdKey {
                    wallet: wallet.context("--wallet is required")?,
                    passphrase: wallet_password()?,
                    account,
                },
                SignerChoice::Simple => SignerKind::SimpleDevice {
                    account,
                    from: from.context("--from is required")?,
                },
                SignerChoice::Gated => SignerKind::GatedDevice {
                    account,
                    from: from.context("--from is required")?,
                    password: device_password()?,
                },
            };
            let second_factor = match otp {
                Some(token) => Some(SecondFactorProof {
                    token,
                    passphrase: secret("WALLET_2FA_PASSPHRASE", "Second factor passphrase")?,
                }),
                None => None,
            };
            let outcome = manager
                .send(SendRequest { signer, to, amount, fee, nonce, second_factor })
                .await;
            print_json(&outcome)?;
            if !outcome.res {
                if outcome.case.as_ref().map(|c| c.code()) == Some(codes::SEND_FAILED) {
                    eprintln!("Sending failed. Check the address history before sending again.");
                }
                std::process::exit(1);
            }
        }
        Commands::Tx { hash } => print_json(&manager.transaction_status(&hash).await?)?,
        Commands::Favorites => print_json(&manager.list_favorites().await?)?,
        Commands::AddFavorite { alias, address } => manager.add_favorite(&alias, &address).await?,
        Commands::RemoveFavorite { alias } => {
            let removed = manager.remove_favorite(&alias).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::OtpGenerate { label } => {
            let generated = manager.generate_second_factor_secret(&label)?;
            print_json(&serde_json::json!({ "secret": generated.secret.as_str(), "uri": generated.uri }))?;
        }
        Commands::OtpEnable { secret: otp_secret, code } => {
            if !manager.verify_second_factor_secret(&code, &otp_secret)? {
                anyhow::bail!("code does not match the secret");
            }
            manager
                .enable_second_factor(&otp_secret, &secret("WALLET_2FA_PASSPHRASE", "Second factor passphrase")?)
                .await?;
        }
        Commands::OtpDisable => {
            manager
                .disable_second_factor(&secret("WALLET_2FA_PASSPHRASE", "Second factor passphrase")?)
                .await?
        }
    }
    Ok(())
}
