use std::pin::Pin;
use std::rc::Rc;

use anyhow::{anyhow, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use deno_core::{
  FastString, ModuleLoader, ModuleSource, ModuleSourceFuture,
  ModuleSpecifier, ModuleType, ResolutionKind,
};
use futures::future::FutureExt;
use tracing::debug;
use url::Url;

use super::TsSourceMapGetter;
use crate::compiler::{CompileOptions, SwcCompiler};
use crate::config::LoaderConfig;
use crate::hooks::{
  HookApi, LoadContext, LoadResult, ModuleFormat, NextHooks, NextLoad,
  RuntimeVersion, SourceCode,
};
use crate::loader::TsLoader;
use crate::resolver::SpecifierResolver;

/// deno_core speaks the single-phase hook API and runs ES2022+ code
const DENO_HOST_VERSION: RuntimeVersion = RuntimeVersion::new(20, 0, 0);

/// Module loader that compiles typescript modules and hands every other
/// module to the wrapped loader
pub struct TsModuleLoader {
  loader: Rc<TsLoader>,
  resolver: SpecifierResolver,
  inner: Rc<dyn ModuleLoader>,
}

impl TsModuleLoader {
  pub fn new(config: LoaderConfig, inner: Rc<dyn ModuleLoader>) -> Self {
    let resolver = SpecifierResolver::new(&config.extension);
    let loader = TsLoader::with_compiler(
      config,
      HookApi::SinglePhase,
      Rc::new(SwcCompiler),
      CompileOptions::for_target(DENO_HOST_VERSION),
    );
    Self {
      loader: Rc::new(loader),
      resolver,
      inner,
    }
  }

  /// Source map getter backed by this loader's registry, to be passed to
  /// `deno_core::RuntimeOptions::source_map_getter`
  pub fn source_map_getter(&self) -> TsSourceMapGetter {
    TsSourceMapGetter::new(self.loader.source_map_provider())
  }
}

impl ModuleLoader for TsModuleLoader {
  #[tracing::instrument(skip(self, kind), level = "debug")]
  fn resolve(
    &self,
    specifier: &str,
    referrer: &str,
    kind: ResolutionKind,
  ) -> Result<ModuleSpecifier, Error> {
    let parent = ModuleSpecifier::parse(referrer).ok();
    let specifier = self.resolver.rewrite(specifier, parent.as_ref());
    self.inner.resolve(&specifier, referrer, kind)
  }

  fn load(
    &self,
    module_specifier: &ModuleSpecifier,
    maybe_referrer: Option<&ModuleSpecifier>,
    is_dyn_import: bool,
  ) -> Pin<Box<ModuleSourceFuture>> {
    if !self.loader.handles(module_specifier) {
      return self
        .inner
        .load(module_specifier, maybe_referrer, is_dyn_import);
    }

    let module_specifier = module_specifier.clone();
    let loader = self.loader.clone();
    let next = InnerLoad {
      inner: self.inner.clone(),
      referrer: maybe_referrer.cloned(),
      is_dyn_import,
    };
    async move {
      let loaded = loader
        .load(
          &module_specifier,
          &LoadContext::default(),
          NextHooks::SinglePhase { load: &next },
        )
        .await?;
      let code = match loaded.source {
        Some(SourceCode::Text(code)) => code,
        _ => {
          return Err(anyhow!(
            "Loader returned no javascript for {}",
            module_specifier
          ))
        }
      };
      debug!("loaded {module_specifier}");
      Ok(ModuleSource::new(
        ModuleType::JavaScript,
        FastString::from(code),
        &module_specifier,
      ))
    }
    .boxed_local()
  }
}

/// Reads raw module sources through the wrapped loader
struct InnerLoad {
  inner: Rc<dyn ModuleLoader>,
  referrer: Option<ModuleSpecifier>,
  is_dyn_import: bool,
}

#[async_trait(?Send)]
impl NextLoad for InnerLoad {
  async fn load(&self, url: &Url, context: &LoadContext) -> Result<LoadResult> {
    let module = self
      .inner
      .load(url, self.referrer.as_ref(), self.is_dyn_import)
      .await?;
    let format = match module.module_type {
      ModuleType::Json => ModuleFormat::Json,
      _ => context.format.unwrap_or(ModuleFormat::Module),
    };
    Ok(LoadResult {
      format,
      source: Some(SourceCode::Binary(Bytes::copy_from_slice(
        module.code.as_bytes(),
      ))),
    })
  }
}
