//! track metadata and the store the session manager looks tracks up in
pub mod key;
pub mod track;
pub mod track_store;
