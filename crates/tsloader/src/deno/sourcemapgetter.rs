use deno_core::{ModuleSpecifier, SourceMapGetter};
use derive_new::new;

use crate::source_map::SourceMapProvider;

/// Hands the registered source maps to deno_core's error formatter
#[derive(new)]
pub struct TsSourceMapGetter {
  provider: SourceMapProvider,
}

impl SourceMapGetter for TsSourceMapGetter {
  fn get_source_map(&self, file_name: &str) -> Option<Vec<u8>> {
    self
      .provider
      .retrieve_source_map(file_name)
      .and_then(|retrieved| retrieved.map)
      .map(|map| map.as_bytes().to_vec())
  }

  fn get_source_line(
    &self,
    file_name: &str,
    line_number: usize,
  ) -> Option<String> {
    let path = ModuleSpecifier::parse(file_name).ok()?.to_file_path().ok()?;
    let code = std::fs::read_to_string(path).ok()?;
    code.lines().nth(line_number).map(|line| line.to_owned())
  }
}
