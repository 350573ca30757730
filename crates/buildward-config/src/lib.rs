//! Parse `.properties` files and the `buildward.toml` settings file.

pub mod properties;
pub mod settings;

pub use properties::PropertyFile;
pub use settings::Settings;
