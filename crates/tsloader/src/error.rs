use thiserror::Error;
use url::Url;

use crate::hooks::HookApi;

#[derive(Error, Debug)]
pub enum LoaderError {
  #[error("module url \"{0}\" is not a file url")]
  NotAFileUrl(Url),

  #[error("loader is set up for {expected} hooks but host called it with {found} hooks")]
  HookApiMismatch { expected: HookApi, found: HookApi },

  #[error("invalid runtime version: {0:?}")]
  InvalidRuntimeVersion(String),

  #[error("unsupported compile option: {0}")]
  UnsupportedCompileOption(String),

  #[error("failed to compile {filename}: {message}")]
  Compile { filename: String, message: String },

  #[error("default loader returned no source for {0}")]
  MissingSource(Url),

  #[error("source of {0} is not valid utf-8")]
  InvalidUtf8(Url),

  #[error("invalid source map")]
  InvalidSourceMap(#[from] serde_json::Error),
}
