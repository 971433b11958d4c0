use anyhow::Result;
use async_trait::async_trait;
use deno_ast::swc::visit::VisitWith;
use deno_ast::{EmitOptions, MediaType, ParseParams, SourceTextInfo};
use tracing::trace;

use super::{
  CompileOptions, Compiler, DynamicImportAnalyzer, ModuleKind, Syntax,
  TransformOutput,
};
use crate::error::LoaderError;

/// Compiles typescript with swc through deno_ast.
///
/// Emit never renames classes and never lowers syntax below what the
/// parser accepts, so `keep_class_names` and `loose` hold for any value
/// and the output runs on every host that has the single-phase hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwcCompiler;

impl SwcCompiler {
  #[tracing::instrument(skip(self, code, options), level = "trace")]
  pub fn transform_sync(
    &self,
    code: &str,
    filename: &str,
    options: &CompileOptions,
  ) -> Result<TransformOutput, LoaderError> {
    if options.module.kind != ModuleKind::Es6 {
      return Err(LoaderError::UnsupportedCompileOption(format!(
        "module type {:?}",
        options.module.kind
      )));
    }
    trace!(
      runtime = %options.target,
      loose = options.loose,
      keep_class_names = options.keep_class_names,
      "compiling module"
    );

    let compile_error = |message: String| LoaderError::Compile {
      filename: filename.to_owned(),
      message,
    };

    let media_type = match options.syntax {
      Syntax::Typescript => MediaType::TypeScript,
      Syntax::Tsx => MediaType::Tsx,
    };
    let mut analyzer = DynamicImportAnalyzer::new();
    let parsed = deno_ast::parse_module_with_post_process(
      ParseParams {
        specifier: filename.to_owned(),
        text_info: SourceTextInfo::from_string(code.to_owned()),
        media_type,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
      },
      |module| {
        module.visit_with(&mut analyzer);
        module
      },
    )
    .map_err(|e| compile_error(e.to_string()))?;

    // recoverable parse errors still mean the source is broken
    if let Some(diagnostic) = parsed.diagnostics().first() {
      return Err(compile_error(diagnostic.to_string()));
    }
    if analyzer.has_dynamic_import && !options.dynamic_import {
      return Err(compile_error("dynamic import is disabled".to_owned()));
    }

    let transpiled = parsed
      .transpile(&EmitOptions {
        source_map: options.source_maps,
        inline_source_map: false,
        inline_sources: true,
        transform_jsx: options.syntax == Syntax::Tsx,
        ..Default::default()
      })
      .map_err(|e| compile_error(e.to_string()))?;

    Ok(TransformOutput {
      code: transpiled.text,
      map: transpiled.source_map,
    })
  }
}

#[async_trait(?Send)]
impl Compiler for SwcCompiler {
  async fn transform(
    &self,
    code: &str,
    filename: &str,
    options: &CompileOptions,
  ) -> Result<TransformOutput> {
    Ok(self.transform_sync(code, filename, options)?)
  }
}
