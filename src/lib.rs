// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod compression;
pub mod config;
pub mod dialect;
pub mod error;
pub mod schema;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod value;
pub mod verify;
