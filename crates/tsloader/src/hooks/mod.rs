//! Types of the host's module customization protocol.
//!
//! Every hook receives the host's default behavior as a "next"
//! continuation. A hook that doesn't want to handle a module must call the
//! continuation with the arguments it was given and return its result
//! untouched.

mod fs;
mod host;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

pub use fs::FsDefaultHooks;
pub use host::{HookApi, RuntimeVersion};

use crate::error::LoaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
  /// ECMAScript module
  Module,
  CommonJs,
  Json,
  Builtin,
  Wasm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCode {
  Text(String),
  Binary(Bytes),
}

impl SourceCode {
  pub fn into_text(self, url: &Url) -> Result<String, LoaderError> {
    match self {
      Self::Text(text) => Ok(text),
      Self::Binary(bytes) => String::from_utf8(bytes.to_vec())
        .map_err(|_| LoaderError::InvalidUtf8(url.clone())),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveContext {
  /// Url of the importing module. `None` for the entry point
  pub parent_url: Option<Url>,
  pub conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
  pub url: Url,
  /// Format hint; the load hooks get the final say
  pub format: Option<ModuleFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadContext {
  pub format: Option<ModuleFormat>,
  pub conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatResult {
  pub format: ModuleFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResult {
  pub source: SourceCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
  pub format: ModuleFormat,
  /// Builtin modules have no source
  pub source: Option<SourceCode>,
}

#[async_trait(?Send)]
pub trait NextResolve {
  async fn resolve(
    &self,
    specifier: &str,
    context: &ResolveContext,
  ) -> Result<ResolveResult>;
}

#[async_trait(?Send)]
pub trait NextGetFormat {
  async fn get_format(
    &self,
    url: &Url,
    context: &LoadContext,
  ) -> Result<FormatResult>;
}

#[async_trait(?Send)]
pub trait NextGetSource {
  async fn get_source(
    &self,
    url: &Url,
    context: &LoadContext,
  ) -> Result<SourceResult>;
}

#[async_trait(?Send)]
pub trait NextLoad {
  async fn load(&self, url: &Url, context: &LoadContext) -> Result<LoadResult>;
}

/// Default loading capabilities of the host, one variant per hook API
/// generation
#[derive(Clone, Copy)]
pub enum NextHooks<'a> {
  TwoPhase {
    get_format: &'a dyn NextGetFormat,
    get_source: &'a dyn NextGetSource,
  },
  SinglePhase {
    load: &'a dyn NextLoad,
  },
}

impl NextHooks<'_> {
  pub fn hook_api(&self) -> HookApi {
    match self {
      Self::TwoPhase { .. } => HookApi::TwoPhase,
      Self::SinglePhase { .. } => HookApi::SinglePhase,
    }
  }
}
