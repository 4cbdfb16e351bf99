//! Market — which exchange family a symbol belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Exchange family. Decides symbol syntax, the upstream source and the
/// sub-directory of the data root a symbol's window lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    /// Korean exchange listings, 6-digit numeric codes (e.g. `005930`).
    Kr,
    /// US listings, alphabetic tickers (e.g. `AAPL`, `BRK-B`).
    Us,
}

#[derive(Debug, Error, PartialEq)]
pub enum SymbolError {
    #[error("'{raw}' is not a 6-digit KRX code")]
    InvalidKrCode { raw: String },

    #[error("'{raw}' is not a valid US ticker")]
    InvalidTicker { raw: String },

    #[error("unknown market '{0}' (expected kr or us)")]
    UnknownMarket(String),
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Kr => "kr",
            Market::Us => "us",
        }
    }

    /// Sub-directory under the data root.
    pub fn data_subdir(&self) -> &'static str {
        self.as_str()
    }

    /// Canonical form of a user- or document-supplied symbol.
    pub fn normalize_symbol(&self, raw: &str) -> Result<String, SymbolError> {
        let trimmed = raw.trim();
        match self {
            Market::Kr => {
                if trimmed.len() == 6 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(trimmed.to_string())
                } else {
                    Err(SymbolError::InvalidKrCode {
                        raw: raw.to_string(),
                    })
                }
            }
            Market::Us => {
                let upper = trimmed.to_ascii_uppercase();
                let valid = !upper.is_empty()
                    && upper.len() <= 10
                    && upper.starts_with(|c: char| c.is_ascii_alphabetic())
                    && upper
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
                if valid {
                    Ok(upper)
                } else {
                    Err(SymbolError::InvalidTicker {
                        raw: raw.to_string(),
                    })
                }
            }
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kr" | "krx" | "domestic" => Ok(Market::Kr),
            "us" | "foreign" => Ok(Market::Us),
            other => Err(SymbolError::UnknownMarket(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kr_codes_must_be_six_digits() {
        assert_eq!(Market::Kr.normalize_symbol(" 005930 ").unwrap(), "005930");
        assert!(Market::Kr.normalize_symbol("5930").is_err());
        assert!(Market::Kr.normalize_symbol("00593A").is_err());
    }

    #[test]
    fn us_tickers_are_uppercased() {
        assert_eq!(Market::Us.normalize_symbol("nvda").unwrap(), "NVDA");
        assert_eq!(Market::Us.normalize_symbol("brk-b").unwrap(), "BRK-B");
        assert!(Market::Us.normalize_symbol("").is_err());
        assert!(Market::Us.normalize_symbol("../etc").is_err());
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("KR".parse::<Market>().unwrap(), Market::Kr);
        assert_eq!("us".parse::<Market>().unwrap(), Market::Us);
        assert!("jp".parse::<Market>().is_err());
    }
}
