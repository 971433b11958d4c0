use anyhow::Result;
use async_trait::async_trait;
use derive_new::new;
use tracing::{debug, instrument};
use url::Url;

use super::{LoaderBackend, ModuleTransformer};
use crate::compiler::Compiler;
use crate::error::LoaderError;
use crate::hooks::{
  HookApi, LoadContext, LoadResult, ModuleFormat, NextHooks, NextLoad,
  NextResolve, ResolveContext, ResolveResult, SourceCode,
};
use crate::resolver::SpecifierResolver;

/// Loader for hosts with a single `load` hook. The raw source comes from
/// the host's default loader and only the compilation happens here.
#[derive(new)]
pub struct SinglePhaseBackend {
  resolver: SpecifierResolver,
  transformer: ModuleTransformer,
}

#[async_trait(?Send)]
impl LoaderBackend for SinglePhaseBackend {
  fn hook_api(&self) -> HookApi {
    HookApi::SinglePhase
  }

  async fn resolve(
    &self,
    specifier: &str,
    context: &ResolveContext,
    next: &dyn NextResolve,
  ) -> Result<ResolveResult> {
    self.resolver.resolve(specifier, context, next).await
  }

  #[instrument(skip(self, context, next), level = "debug")]
  async fn load(
    &self,
    url: &Url,
    context: &LoadContext,
    next: NextHooks<'_>,
  ) -> Result<LoadResult> {
    let NextHooks::SinglePhase { load } = next else {
      return Err(
        LoaderError::HookApiMismatch {
          expected: HookApi::SinglePhase,
          found: next.hook_api(),
        }
        .into(),
      );
    };
    if !self.transformer.handles(url) {
      return load.load(url, context).await;
    }

    // the default loader doesn't know the extension, so tell it the format
    let raw = load
      .load(
        url,
        &LoadContext {
          format: Some(ModuleFormat::Module),
          ..context.clone()
        },
      )
      .await?;
    let code = raw
      .source
      .ok_or_else(|| LoaderError::MissingSource(url.clone()))?
      .into_text(url)?;

    let output = self
      .transformer
      .compiler()
      .transform(&code, url.as_str(), self.transformer.options())
      .await?;
    debug!("compiled {url}");
    Ok(LoadResult {
      format: ModuleFormat::Module,
      source: Some(SourceCode::Text(self.transformer.emit(url, output)?)),
    })
  }
}
