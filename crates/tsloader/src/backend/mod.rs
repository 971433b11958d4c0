mod single_phase;
mod two_phase;

use std::rc::Rc;

use anyhow::Result;
use async_trait::async_trait;
use derive_new::new;
use url::Url;

pub use single_phase::SinglePhaseBackend;
pub use two_phase::TwoPhaseBackend;

use crate::compiler::{CompileOptions, Compiler, TransformOutput};
use crate::hooks::{
  HookApi, LoadContext, LoadResult, NextHooks, NextResolve, ResolveContext,
  ResolveResult,
};
use crate::source_map::{self, SourceMapRegistry};

/// The hooks every loader strategy provides, regardless of which hook API
/// generation the host speaks
#[async_trait(?Send)]
pub trait LoaderBackend {
  fn hook_api(&self) -> HookApi;

  async fn resolve(
    &self,
    specifier: &str,
    context: &ResolveContext,
    next: &dyn NextResolve,
  ) -> Result<ResolveResult>;

  async fn load(
    &self,
    url: &Url,
    context: &LoadContext,
    next: NextHooks<'_>,
  ) -> Result<LoadResult>;

  fn as_two_phase(&self) -> Option<&TwoPhaseBackend> {
    None
  }
}

/// Compiles modules and delivers their source maps
#[derive(new)]
pub struct ModuleTransformer {
  compiler: Rc<dyn Compiler>,
  options: CompileOptions,
  registry: SourceMapRegistry,
  /// Inline the source maps instead of registering them
  embed_source_maps: bool,
  extension: String,
}

impl ModuleTransformer {
  /// Whether the module at the url is compiled by the loader
  pub fn handles(&self, url: &Url) -> bool {
    has_extension(url, &self.extension)
  }

  pub fn compiler(&self) -> &dyn Compiler {
    self.compiler.as_ref()
  }

  pub fn options(&self) -> &CompileOptions {
    &self.options
  }

  /// Returns the code the host evaluates for the compiled module, either
  /// with the source map inlined or with the map registered under the url.
  /// The original source text is dropped from the map in both cases.
  pub fn emit(&self, url: &Url, output: TransformOutput) -> Result<String> {
    let TransformOutput { code, map } = output;
    let Some(map) = map else {
      return Ok(code);
    };

    let map = source_map::strip_sources_content(&map)?;
    if self.embed_source_maps {
      return Ok(source_map::inline_source_map(&code, &map));
    }
    self.registry.register(url.as_str(), map);
    Ok(code)
  }
}

pub(crate) fn has_extension(url: &Url, extension: &str) -> bool {
  url
    .path()
    .strip_suffix(extension)
    .is_some_and(|rest| rest.ends_with('.'))
}
