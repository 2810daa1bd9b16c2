//! Mnemonic phrases and wordlist selection.

use std::fmt;
use std::str::FromStr;

use bip39::{Language, Mnemonic};
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::errors::WalletError;

/// Wordlists a phrase may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wordlist {
    English,
    Korean,
    ChineseSimplified,
    ChineseTraditional,
    Japanese,
    French,
    Spanish,
    Italian,
}

impl Wordlist {
    pub const ALL: [Wordlist; 8] = [
        Wordlist::English,
        Wordlist::Korean,
        Wordlist::ChineseSimplified,
        Wordlist::ChineseTraditional,
        Wordlist::Japanese,
        Wordlist::French,
        Wordlist::Spanish,
        Wordlist::Italian,
    ];

    /// Resolve a language tag. Unknown and ambiguous tags are rejected
    /// instead of falling back to a default list.
    pub fn from_tag(tag: &str) -> Result<Self, WalletError> {
        let normalized = tag.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "english" => Ok(Wordlist::English),
            "korean" => Ok(Wordlist::Korean),
            "chinese_simplified" => Ok(Wordlist::ChineseSimplified),
            "chinese_traditional" => Ok(Wordlist::ChineseTraditional),
            "japanese" => Ok(Wordlist::Japanese),
            "french" => Ok(Wordlist::French),
            "spanish" => Ok(Wordlist::Spanish),
            "italian" => Ok(Wordlist::Italian),
            "chinese" => Err(WalletError::AmbiguousWordlist(
                "'chinese' is ambiguous: did you mean chinese_simplified or chinese_traditional?".to_string(),
            )),
            _ => Err(WalletError::AmbiguousWordlist(format!(
                "'{}' is not a supported wordlist",
                tag
            ))),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Wordlist::English => "english",
            Wordlist::Korean => "korean",
            Wordlist::ChineseSimplified => "chinese_simplified",
            Wordlist::ChineseTraditional => "chinese_traditional",
            Wordlist::Japanese => "japanese",
            Wordlist::French => "french",
            Wordlist::Spanish => "spanish",
            Wordlist::Italian => "italian",
        }
    }

    fn language(&self) -> Language {
        match self {
            Wordlist::English => Language::English,
            Wordlist::Korean => Language::Korean,
            Wordlist::ChineseSimplified => Language::SimplifiedChinese,
            Wordlist::ChineseTraditional => Language::TraditionalChinese,
            Wordlist::Japanese => Language::Japanese,
            Wordlist::French => Language::French,
            Wordlist::Spanish => Language::Spanish,
            Wordlist::Italian => Language::Italian,
        }
    }
}

impl FromStr for Wordlist {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Wordlist::from_tag(s)
    }
}

impl fmt::Display for Wordlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Generate a fresh 12-word phrase from 128 bits of entropy.
pub fn generate_mnemonic(wordlist: Wordlist) -> Result<Zeroizing<String>, WalletError> {
    let mut entropy = Zeroizing::new([0u8; 16]);
    rand::rngs::OsRng.fill_bytes(&mut entropy[..]);
    let mnemonic = Mnemonic::from_entropy_in(wordlist.language(), &entropy[..])
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    debug!(wordlist = %wordlist, "generated mnemonic");
    Ok(Zeroizing::new(mnemonic.to_string()))
}

pub fn validate_mnemonic(phrase: &str, wordlist: Wordlist) -> bool {
    Mnemonic::parse_in(wordlist.language(), phrase).is_ok()
}

/// 64-byte BIP39 seed for `phrase` and the optional passphrase.
pub fn seed_from_mnemonic(
    phrase: &str,
    wordlist: Wordlist,
    passphrase: &str,
) -> Result<Zeroizing<[u8; 64]>, WalletError> {
    let mnemonic = Mnemonic::parse_in(wordlist.language(), phrase)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_seed(passphrase)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generated_phrases_validate_in_every_wordlist() {
        for wordlist in Wordlist::ALL {
            let phrase = generate_mnemonic(wordlist).unwrap();
            assert!(validate_mnemonic(&phrase, wordlist), "{} failed", wordlist);
        }
    }

    #[test]
    fn test_chinese_is_ambiguous() {
        let err = Wordlist::from_tag("chinese").unwrap_err();
        assert!(matches!(err, WalletError::AmbiguousWordlist(ref m) if m.contains("chinese_simplified")));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(matches!(Wordlist::from_tag("klingon"), Err(WalletError::AmbiguousWordlist(_))));
    }

    #[test]
    fn test_tags_round_trip() {
        for wordlist in Wordlist::ALL {
            assert_eq!(Wordlist::from_tag(wordlist.tag()).unwrap(), wordlist);
        }
        assert_eq!(Wordlist::from_tag(" English ").unwrap(), Wordlist::English);
    }

    #[test]
    fn test_known_seed_vector() {
        // BIP39 reference vector, passphrase "TREZOR"
        let seed = seed_from_mnemonic(ABANDON, Wordlist::English, "TREZOR").unwrap();
        assert_eq!(
            hex::encode(&seed[..]),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let phrase = ABANDON.replace("about", "abandon");
        assert!(!validate_mnemonic(&phrase, Wordlist::English));
        assert!(matches!(
            seed_from_mnemonic(&phrase, Wordlist::English, ""),
            Err(WalletError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_phrase_in_wrong_wordlist_rejected() {
        assert!(!validate_mnemonic(ABANDON, Wordlist::French));
    }
}
