pub mod api;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod macros;
pub mod naming;
pub mod proto;
pub mod sql;
pub mod utils;

pub use api::{build, load_extension, BuildOptions, BuildReport, Extension};
pub use config::ExtensionConfig;
pub use error::BuildError;
pub use naming::{macro_id, module_name};
