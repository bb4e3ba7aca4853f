//! Core abstractions for Deskshell: the persisted settings model and the
//! capability contracts (encryption, filesystem) the settings store is built on.
//! This crate performs no I/O of its own.

pub mod location;
pub mod settings;
pub mod storage;
