//! Torrent metadata handling.
//!
//! A minimal bencode codec plus the passkey rewriter built on top of it.

pub mod bencode;
mod passkey;

pub use bencode::{BencodeError, Value};
pub use passkey::{inject_passkey, strip_passkey, PasskeyError, PASSKEY_PLACEHOLDER};
