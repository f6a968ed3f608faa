//! Material vocabulary shared by the scanner, the scheduler, and configuration.
#![forbid(unsafe_code)]

pub mod material;

pub use material::{CatalogFull, Material, MaterialCatalog};
