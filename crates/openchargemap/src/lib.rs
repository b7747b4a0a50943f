//! Extraction from the [Open Charge Map](https://openchargemap.org) API.

pub mod client;
pub mod collector;
pub mod poi;

pub use client::{OpenChargeMapClient, OpenChargeMapCredentials};
