mod dynamic_import;
mod swc;

use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use self::dynamic_import::DynamicImportAnalyzer;
pub use self::swc::SwcCompiler;
use crate::hooks::RuntimeVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
  pub code: String,
  /// Source map as a JSON document
  pub map: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
  Typescript,
  /// Typescript with JSX
  Tsx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
  Es6,
  CommonJs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
  #[serde(rename = "type")]
  pub kind: ModuleKind,
  pub no_interop: bool,
}

/// Options passed to the compiler for every module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
  /// Version of the runtime the output must run on
  pub target: RuntimeVersion,
  pub syntax: Syntax,
  pub dynamic_import: bool,
  pub loose: bool,
  pub keep_class_names: bool,
  pub module: ModuleConfig,
  pub source_maps: bool,
}

impl CompileOptions {
  /// Options used by the loader: typescript grammar with dynamic imports,
  /// loose transforms that keep class names, and ES module output without
  /// interop helpers, targeting the given runtime
  pub fn for_target(target: RuntimeVersion) -> Self {
    Self {
      target,
      syntax: Syntax::Typescript,
      dynamic_import: true,
      loose: true,
      keep_class_names: true,
      module: ModuleConfig {
        kind: ModuleKind::Es6,
        no_interop: true,
      },
      source_maps: true,
    }
  }
}

/// A compiler that turns typescript into javascript the host can run
#[async_trait(?Send)]
pub trait Compiler {
  async fn transform(
    &self,
    code: &str,
    filename: &str,
    options: &CompileOptions,
  ) -> Result<TransformOutput>;

  /// Reads the file and compiles it
  async fn transform_file(
    &self,
    path: &Path,
    options: &CompileOptions,
  ) -> Result<TransformOutput> {
    let code = tokio::fs::read_to_string(path)
      .await
      .map_err(|e| anyhow!("{}: {:?}", e, path))?;
    let filename = path
      .to_str()
      .ok_or_else(|| anyhow!("Non utf-8 path: {:?}", path))?;
    self.transform(&code, filename, options).await
  }
}
