// src/lib.rs
pub mod config;
pub mod controller;
pub mod decision;
pub mod errors;
pub mod price_store;
pub mod registry;
pub mod trigger;
pub mod types;
