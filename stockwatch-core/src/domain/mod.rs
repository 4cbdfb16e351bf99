//! Domain types for stockwatch

pub mod market;
pub mod quote;
pub mod window;

pub use market::{Market, SymbolError};
pub use quote::{QuoteError, QuoteRecord};
pub use window::{RollingWindow, WINDOW_CAPACITY};
