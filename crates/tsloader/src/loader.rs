use std::rc::Rc;

use anyhow::Result;
use tracing::debug;
use url::Url;

use crate::backend::{
  self, LoaderBackend, ModuleTransformer, SinglePhaseBackend, TwoPhaseBackend,
};
use crate::compiler::{CompileOptions, Compiler, SwcCompiler};
use crate::config::LoaderConfig;
use crate::error::LoaderError;
use crate::hooks::{
  FormatResult, HookApi, LoadContext, LoadResult, NextGetFormat,
  NextGetSource, NextHooks, NextResolve, ResolveContext, ResolveResult,
  RuntimeVersion, SourceResult,
};
use crate::resolver::SpecifierResolver;
use crate::source_map::{SourceMapProvider, SourceMapRegistry};

/// Loader hooks that compile typescript modules for a host runtime.
///
/// The hook API the host speaks is detected from its version when the
/// loader is created. The source map registry lives as long as the loader
/// or any provider created from it.
pub struct TsLoader {
  config: LoaderConfig,
  registry: SourceMapRegistry,
  backend: Box<dyn LoaderBackend>,
}

impl TsLoader {
  /// Creates a loader for the host at the given version using swc
  pub fn new(config: LoaderConfig, host: &RuntimeVersion) -> Self {
    Self::with_compiler(
      config,
      HookApi::detect(host),
      Rc::new(SwcCompiler),
      CompileOptions::for_target(*host),
    )
  }

  pub fn with_compiler(
    config: LoaderConfig,
    hook_api: HookApi,
    compiler: Rc<dyn Compiler>,
    options: CompileOptions,
  ) -> Self {
    debug!("creating {hook_api} loader for runtime {}", options.target);
    let registry = SourceMapRegistry::new();
    let resolver = SpecifierResolver::new(&config.extension);
    let transformer = ModuleTransformer::new(
      compiler,
      options,
      registry.clone(),
      config.embed_source_maps,
      config.extension.clone(),
    );
    let backend: Box<dyn LoaderBackend> = match hook_api {
      HookApi::TwoPhase => {
        Box::new(TwoPhaseBackend::new(resolver, transformer))
      }
      HookApi::SinglePhase => {
        Box::new(SinglePhaseBackend::new(resolver, transformer))
      }
    };
    Self {
      config,
      registry,
      backend,
    }
  }

  pub fn config(&self) -> &LoaderConfig {
    &self.config
  }

  pub fn hook_api(&self) -> HookApi {
    self.backend.hook_api()
  }

  /// Whether the module at the url is compiled by the loader
  pub fn handles(&self, url: &Url) -> bool {
    backend::has_extension(url, &self.config.extension)
  }

  pub fn registry(&self) -> &SourceMapRegistry {
    &self.registry
  }

  /// Provider to install in the host's stack trace formatter
  pub fn source_map_provider(&self) -> SourceMapProvider {
    SourceMapProvider::new(self.registry.clone(), &self.config.extension)
  }

  pub async fn resolve(
    &self,
    specifier: &str,
    context: &ResolveContext,
    next: &dyn NextResolve,
  ) -> Result<ResolveResult> {
    self.backend.resolve(specifier, context, next).await
  }

  pub async fn load(
    &self,
    url: &Url,
    context: &LoadContext,
    next: NextHooks<'_>,
  ) -> Result<LoadResult> {
    self.backend.load(url, context, next).await
  }

  /// `getFormat` hook of two-phase hosts
  pub async fn get_format(
    &self,
    url: &Url,
    context: &LoadContext,
    next: &dyn NextGetFormat,
  ) -> Result<FormatResult> {
    self.two_phase()?.get_format(url, context, next).await
  }

  /// `getSource` hook of two-phase hosts
  pub async fn get_source(
    &self,
    url: &Url,
    context: &LoadContext,
    next: &dyn NextGetSource,
  ) -> Result<SourceResult> {
    self.two_phase()?.get_source(url, context, next).await
  }

  fn two_phase(&self) -> Result<&TwoPhaseBackend, LoaderError> {
    self
      .backend
      .as_two_phase()
      .ok_or(LoaderError::HookApiMismatch {
        expected: self.hook_api(),
        found: HookApi::TwoPhase,
      })
  }
}
