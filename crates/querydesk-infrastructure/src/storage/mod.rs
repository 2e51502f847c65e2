//! Storage primitives shared by the TOML repositories.

mod atomic_toml;

pub use atomic_toml::AtomicTomlFile;
pub(crate) use atomic_toml::{toml_de_error, toml_ser_error};
