//! Character persistence for the A3 zone server.
//!
//! A [`CharacterStore`] maps a character name to one JSON document. It
//! can keep those documents in SQLite, in flat files, or in SQLite with
//! the flat files as a fallback ([`PersistenceMode`]).
//!
//! Names are normalized with [`sanitize_name`] for keys and filenames;
//! the display name is kept inside the record.

mod error;
mod store;

pub use error::StoreError;
pub use store::{CharacterStore, PersistenceMode, sanitize_name};
