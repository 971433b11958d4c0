//! Glue for running the loader inside a `deno_core::JsRuntime`

mod moduleloader;
mod sourcemapgetter;

pub use moduleloader::TsModuleLoader;
pub use sourcemapgetter::TsSourceMapGetter;
