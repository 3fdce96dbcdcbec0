// src/lib.rs
//! Per-unit normalization and plotting of EMT simulation results stored as
//! COMTRADE records.
pub mod channels;
pub mod cli;
pub mod comtrade;
pub mod normalize;
pub mod render;
pub mod session;
pub mod types;
