//! Rendering pipeline for the pure-Rust capture backend:
//! layout -> display list -> raster.

pub mod layout;
pub mod paint;
pub mod raster;
