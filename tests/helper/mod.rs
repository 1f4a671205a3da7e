#![allow(dead_code)]

pub mod source;
pub mod store;

pub use source::{StaticSource, raw_release};
pub use store::{create_test_store, seed_snapshot};
