//! United Nations Digital Library integration

pub mod client;
pub mod marc;

pub use client::{SearchParams, UndlClient};
