//! Utility functions and types

pub mod data_loader;

pub use data_loader::{load_data, save_csv, DataFormat};
