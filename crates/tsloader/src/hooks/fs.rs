use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use deno_ast::MediaType;
use tracing::debug;
use url::{ParseError, Url};

use super::{
  FormatResult, LoadContext, LoadResult, ModuleFormat, NextGetFormat,
  NextGetSource, NextLoad, NextResolve, ResolveContext, ResolveResult,
  SourceCode, SourceResult,
};
use crate::error::LoaderError;

/// Default hooks for embedders whose host doesn't bring its own: specifiers
/// are resolved as plain URLs relative to the importing module and sources
/// are read from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDefaultHooks;

impl FsDefaultHooks {
  pub fn format_of(url: &Url) -> Result<ModuleFormat> {
    if url.scheme() == "node" {
      return Ok(ModuleFormat::Builtin);
    }
    let format = match MediaType::from_specifier(url) {
      MediaType::JavaScript
      | MediaType::Mjs
      | MediaType::Jsx
      | MediaType::TypeScript
      | MediaType::Mts
      | MediaType::Tsx => ModuleFormat::Module,
      MediaType::Cjs | MediaType::Cts => ModuleFormat::CommonJs,
      MediaType::Json => ModuleFormat::Json,
      _ => match url.path().rsplit_once('.') {
        Some((_, "wasm")) => ModuleFormat::Wasm,
        _ => bail!("Unknown extension of module: {}", url),
      },
    };
    Ok(format)
  }

  async fn read(url: &Url) -> Result<Bytes> {
    let path = url
      .to_file_path()
      .map_err(|_| LoaderError::NotAFileUrl(url.clone()))?;
    let bytes = tokio::fs::read(&path)
      .await
      .map_err(|e| anyhow!("{}: {:?}", e, path))?;
    Ok(bytes.into())
  }
}

#[async_trait(?Send)]
impl NextResolve for FsDefaultHooks {
  async fn resolve(
    &self,
    specifier: &str,
    context: &ResolveContext,
  ) -> Result<ResolveResult> {
    let url = match Url::parse(specifier) {
      Ok(url) => url,
      Err(ParseError::RelativeUrlWithoutBase) => match &context.parent_url {
        Some(parent) => parent.join(specifier)?,
        None => bail!("Cannot resolve {specifier:?} without a parent module"),
      },
      Err(err) => return Err(err.into()),
    };
    debug!("resolved {specifier:?} to {url}");
    Ok(ResolveResult { url, format: None })
  }
}

#[async_trait(?Send)]
impl NextGetFormat for FsDefaultHooks {
  async fn get_format(
    &self,
    url: &Url,
    _context: &LoadContext,
  ) -> Result<FormatResult> {
    Ok(FormatResult {
      format: Self::format_of(url)?,
    })
  }
}

#[async_trait(?Send)]
impl NextGetSource for FsDefaultHooks {
  async fn get_source(
    &self,
    url: &Url,
    _context: &LoadContext,
  ) -> Result<SourceResult> {
    Ok(SourceResult {
      source: SourceCode::Binary(Self::read(url).await?),
    })
  }
}

#[async_trait(?Send)]
impl NextLoad for FsDefaultHooks {
  async fn load(&self, url: &Url, context: &LoadContext) -> Result<LoadResult> {
    let format = match context.format {
      Some(format) => format,
      None => Self::format_of(url)?,
    };
    let source = match format {
      ModuleFormat::Builtin => None,
      _ => Some(SourceCode::Binary(Self::read(url).await?)),
    };
    Ok(LoadResult { format, source })
  }
}
