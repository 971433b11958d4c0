mod backend;
mod loader;
mod resolver;
mod utils;

pub mod compiler;
pub mod config;
pub mod error;
pub mod hooks;
pub mod source_map;

#[cfg(feature = "deno")]
pub mod deno;

pub use backend::{
  LoaderBackend, ModuleTransformer, SinglePhaseBackend, TwoPhaseBackend,
};
pub use config::LoaderConfig;
pub use error::LoaderError;
pub use hooks::{HookApi, RuntimeVersion};
pub use loader::TsLoader;
pub use resolver::SpecifierResolver;
pub use source_map::{RetrievedSourceMap, SourceMapProvider, SourceMapRegistry};
