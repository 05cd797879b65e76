//! Library crate for scancheck exposing reusable modules.
pub mod barcode;
pub mod client;
pub mod config;
pub mod error;
pub mod render;
pub mod rxnorm;
pub mod server;
pub mod types;
pub mod ui;
pub mod virustotal;
pub mod widget;
