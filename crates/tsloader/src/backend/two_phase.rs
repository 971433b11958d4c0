use anyhow::Result;
use async_trait::async_trait;
use derive_new::new;
use tracing::{debug, instrument};
use url::Url;

use super::{LoaderBackend, ModuleTransformer};
use crate::compiler::Compiler;
use crate::error::LoaderError;
use crate::hooks::{
  FormatResult, HookApi, LoadContext, LoadResult, ModuleFormat, NextGetFormat,
  NextGetSource, NextHooks, NextResolve, ResolveContext, ResolveResult,
  SourceCode, SourceResult,
};
use crate::resolver::SpecifierResolver;

/// Loader for hosts with separate `getFormat` and `getSource` hooks.
/// Sources are read and compiled straight from disk.
#[derive(new)]
pub struct TwoPhaseBackend {
  resolver: SpecifierResolver,
  transformer: ModuleTransformer,
}

impl TwoPhaseBackend {
  /// All typescript modules are ES modules
  #[instrument(skip(self, context, next), level = "debug")]
  pub async fn get_format(
    &self,
    url: &Url,
    context: &LoadContext,
    next: &dyn NextGetFormat,
  ) -> Result<FormatResult> {
    if self.transformer.handles(url) {
      return Ok(FormatResult {
        format: ModuleFormat::Module,
      });
    }
    next.get_format(url, context).await
  }

  #[instrument(skip(self, context, next), level = "debug")]
  pub async fn get_source(
    &self,
    url: &Url,
    context: &LoadContext,
    next: &dyn NextGetSource,
  ) -> Result<SourceResult> {
    if !self.transformer.handles(url) {
      return next.get_source(url, context).await;
    }

    let path = url
      .to_file_path()
      .map_err(|_| LoaderError::NotAFileUrl(url.clone()))?;
    let output = self
      .transformer
      .compiler()
      .transform_file(&path, self.transformer.options())
      .await?;
    debug!("compiled {url}");
    Ok(SourceResult {
      source: SourceCode::Text(self.transformer.emit(url, output)?),
    })
  }
}

#[async_trait(?Send)]
impl LoaderBackend for TwoPhaseBackend {
  fn hook_api(&self) -> HookApi {
    HookApi::TwoPhase
  }

  async fn resolve(
    &self,
    specifier: &str,
    context: &ResolveContext,
    next: &dyn NextResolve,
  ) -> Result<ResolveResult> {
    self.resolver.resolve(specifier, context, next).await
  }

  /// Runs `get_format` followed by `get_source`, the way a two-phase host
  /// would
  async fn load(
    &self,
    url: &Url,
    context: &LoadContext,
    next: NextHooks<'_>,
  ) -> Result<LoadResult> {
    let NextHooks::TwoPhase {
      get_format,
      get_source,
    } = next
    else {
      return Err(
        LoaderError::HookApiMismatch {
          expected: HookApi::TwoPhase,
          found: next.hook_api(),
        }
        .into(),
      );
    };

    let FormatResult { format } =
      self.get_format(url, context, get_format).await?;
    if format == ModuleFormat::Builtin {
      return Ok(LoadResult {
        format,
        source: None,
      });
    }
    let context = LoadContext {
      format: Some(format),
      ..context.clone()
    };
    let SourceResult { source } =
      self.get_source(url, &context, get_source).await?;
    Ok(LoadResult {
      format,
      source: Some(source),
    })
  }

  fn as_two_phase(&self) -> Option<&TwoPhaseBackend> {
    Some(self)
  }
}

#[cfg(test)]
mod tests {
  use url::Url;

  use super::TwoPhaseBackend;
  use crate::backend::tests::transformer;
  use crate::backend::LoaderBackend;
  use crate::error::LoaderError;
  use crate::hooks::{
    FsDefaultHooks, LoadContext, ModuleFormat, NextGetFormat, NextGetSource,
    NextHooks, NextLoad, SourceCode,
  };
  use crate::resolver::SpecifierResolver;
  use crate::source_map::SourceMapRegistry;

  fn backend(registry: &SourceMapRegistry) -> TwoPhaseBackend {
    TwoPhaseBackend::new(
      SpecifierResolver::new("ts"),
      transformer(registry, false),
    )
  }

  fn hooks() -> NextHooks<'static> {
    NextHooks::TwoPhase {
      get_format: &FsDefaultHooks,
      get_source: &FsDefaultHooks,
    }
  }

  #[tokio::test]
  async fn test_get_format_of_typescript_module() {
    let backend = backend(&SourceMapRegistry::new());
    let url = Url::parse("file:///does/not/matter.ts").unwrap();
    let format = backend
      .get_format(&url, &LoadContext::default(), &FsDefaultHooks)
      .await
      .unwrap();
    assert_eq!(format.format, ModuleFormat::Module);
  }

  #[tokio::test]
  async fn test_get_format_passes_through() {
    let backend = backend(&SourceMapRegistry::new());
    for url in ["file:///a/b.cjs", "file:///a/b.json", "node:fs"] {
      let url = Url::parse(url).unwrap();
      let context = LoadContext::default();
      assert_eq!(
        backend
          .get_format(&url, &context, &FsDefaultHooks)
          .await
          .unwrap(),
        FsDefaultHooks.get_format(&url, &context).await.unwrap()
      );
    }
  }

  #[tokio::test]
  async fn test_get_source_compiles_and_registers_map() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.ts");
    std::fs::write(&path, "const x: number = 1;\nconsole.log(x);\n").unwrap();
    let url = Url::from_file_path(&path).unwrap();

    let registry = SourceMapRegistry::new();
    let source = backend(&registry)
      .get_source(&url, &LoadContext::default(), &FsDefaultHooks)
      .await
      .unwrap()
      .source
      .into_text(&url)
      .unwrap();

    assert!(source.contains("const x = 1"));
    assert!(!source.contains("number"));
    assert!(!source.contains("sourceMappingURL=data:"));

    let map = registry.get(url.as_str()).unwrap();
    let map = sourcemap::SourceMap::from_slice(map.as_bytes()).unwrap();
    assert!(map.get_source_count() > 0);
    assert_eq!(map.get_source_contents(0), None);
  }

  #[tokio::test]
  async fn test_get_source_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.js");
    std::fs::write(&path, "export const a = 1;").unwrap();
    let url = Url::from_file_path(&path).unwrap();
    let context = LoadContext::default();

    let registry = SourceMapRegistry::new();
    let source = backend(&registry)
      .get_source(&url, &context, &FsDefaultHooks)
      .await
      .unwrap();
    assert_eq!(
      source,
      FsDefaultHooks.get_source(&url, &context).await.unwrap()
    );
    assert!(registry.is_empty());
  }

  #[tokio::test]
  async fn test_get_source_of_remote_typescript_fails() {
    let backend = backend(&SourceMapRegistry::new());
    let url = Url::parse("https://example.com/mod.ts").unwrap();
    let err = backend
      .get_source(&url, &LoadContext::default(), &FsDefaultHooks)
      .await
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<LoaderError>(),
      Some(LoaderError::NotAFileUrl(_))
    ));
  }

  #[tokio::test]
  async fn test_load_composes_format_and_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("greet.ts");
    std::fs::write(&path, "export const greet = (n: string) => `hi ${n}`;")
      .unwrap();
    let url = Url::from_file_path(&path).unwrap();

    let loaded = backend(&SourceMapRegistry::new())
      .load(&url, &LoadContext::default(), hooks())
      .await
      .unwrap();
    assert_eq!(loaded.format, ModuleFormat::Module);
    match loaded.source {
      Some(SourceCode::Text(code)) => assert!(code.contains("greet = (n)")),
      other => panic!("unexpected source: {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_load_passes_through_builtin() {
    let url = Url::parse("node:fs").unwrap();
    let context = LoadContext::default();
    let loaded = backend(&SourceMapRegistry::new())
      .load(&url, &context, hooks())
      .await
      .unwrap();
    assert_eq!(loaded, FsDefaultHooks.load(&url, &context).await.unwrap());
    assert_eq!(loaded.source, None);
  }

  #[tokio::test]
  async fn test_load_with_single_phase_hooks_fails() {
    let backend = backend(&SourceMapRegistry::new());
    let url = Url::parse("file:///a/b.ts").unwrap();
    let err = backend
      .load(
        &url,
        &LoadContext::default(),
        NextHooks::SinglePhase {
          load: &FsDefaultHooks,
        },
      )
      .await
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<LoaderError>(),
      Some(LoaderError::HookApiMismatch { .. })
    ));
  }
}
