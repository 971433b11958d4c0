use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::backend::has_extension;
use crate::error::LoaderError;

const SOURCE_MAPPING_URL_PREFIX: &str = "//# sourceMappingURL=";

/// Source maps of the compiled modules keyed by module url.
///
/// Cloning the registry clones the handle; all clones share the same maps.
/// Entries are only ever added and live as long as the last handle.
#[derive(Debug, Clone, Default)]
pub struct SourceMapRegistry {
  maps: Rc<RefCell<IndexMap<String, Arc<str>>>>,
}

impl SourceMapRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn register(&self, url: &str, map: String) {
    trace!("registering source map of {url}");
    self.maps.borrow_mut().insert(url.to_owned(), map.into());
  }

  pub fn get(&self, url: &str) -> Option<Arc<str>> {
    self.maps.borrow().get(url).cloned()
  }

  pub fn contains(&self, url: &str) -> bool {
    self.maps.borrow().contains_key(url)
  }

  pub fn len(&self) -> usize {
    self.maps.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.maps.borrow().is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedSourceMap {
  pub url: String,
  /// `None` if no map was registered for the url
  pub map: Option<Arc<str>>,
}

/// Looks up source maps for the host's stack trace formatter
#[derive(Debug, Clone)]
pub struct SourceMapProvider {
  registry: SourceMapRegistry,
  extension: String,
}

impl SourceMapProvider {
  pub fn new(registry: SourceMapRegistry, extension: &str) -> Self {
    Self {
      registry,
      extension: extension.to_owned(),
    }
  }

  /// Returns `None` for sources that aren't compiled by the loader so that
  /// the host falls back to its default behavior. Sources are matched the
  /// same way modules are picked for compilation.
  pub fn retrieve_source_map(&self, source: &str) -> Option<RetrievedSourceMap> {
    let compiled = Url::parse(source)
      .is_ok_and(|url| has_extension(&url, &self.extension));
    if !compiled {
      return None;
    }
    Some(RetrievedSourceMap {
      url: source.to_owned(),
      map: self.registry.get(source),
    })
  }
}

/// Removes the original source text from the source map
pub(crate) fn strip_sources_content(map: &str) -> Result<String, LoaderError> {
  let mut map: Value = serde_json::from_str(map)?;
  if let Some(map) = map.as_object_mut() {
    map.remove("sourcesContent");
  }
  Ok(serde_json::to_string(&map)?)
}

/// Appends the map to the code as a base64 data url, replacing any source
/// mapping comment already at the end of the code
pub(crate) fn inline_source_map(code: &str, map: &str) -> String {
  format!(
    "{}\n{}data:application/json;base64,{}",
    strip_source_mapping_url(code),
    SOURCE_MAPPING_URL_PREFIX,
    STANDARD.encode(map)
  )
}

fn strip_source_mapping_url(code: &str) -> &str {
  let mut code = code.trim_end();
  loop {
    let (head, last_line) = match code.rfind('\n') {
      Some(idx) => (&code[..idx], &code[idx + 1..]),
      None => ("", code),
    };
    if !last_line.trim_start().starts_with(SOURCE_MAPPING_URL_PREFIX) {
      return code;
    }
    code = head.trim_end();
  }
}
