//! Project configuration: the Go module and the optional Gocart.toml

pub mod gocart_toml;
pub mod gomod;
pub mod validation;

pub use gomod::GoModule;
