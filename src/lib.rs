//! mzatlas - MALDI imaging figure harvesting and m/z annotation database.
//!
//! Pulls candidate figures out of publications, asks a vision model which
//! ones are MALDI mass spectrometry images, extracts their m/z annotations
//! and keeps them in a searchable CSV database.

pub mod annotate;
pub mod cli;
pub mod config;
pub mod harvest;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod vision;
