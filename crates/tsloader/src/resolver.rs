use std::borrow::Cow;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, instrument};
use url::Url;

use crate::hooks::{NextResolve, ResolveContext, ResolveResult};
use crate::utils::fs::with_appended_extension;

/// Lets relative imports leave out the extension of typescript modules,
/// `import "./util"` loads `./util.ts` if it exists
#[derive(Debug, Clone)]
pub struct SpecifierResolver {
  extension: String,
}

impl SpecifierResolver {
  pub fn new(extension: &str) -> Self {
    Self {
      extension: extension.to_owned(),
    }
  }

  #[instrument(skip(self, context, next), level = "debug")]
  pub async fn resolve(
    &self,
    specifier: &str,
    context: &ResolveContext,
    next: &dyn NextResolve,
  ) -> Result<ResolveResult> {
    let specifier = self.rewrite(specifier, context.parent_url.as_ref());
    next.resolve(&specifier, context).await
  }

  /// Returns the specifier with the extension appended if it's a relative
  /// specifier without one and the file with the extension exists.
  /// Every other specifier is returned as is, including ones with a query
  /// or fragment.
  pub fn rewrite<'a>(
    &self,
    specifier: &'a str,
    parent_url: Option<&Url>,
  ) -> Cow<'a, str> {
    if !specifier.starts_with('.')
      || specifier.contains(['?', '#'])
      || Path::new(specifier).extension().is_some()
    {
      return Cow::Borrowed(specifier);
    }

    let Some(path) = parent_url
      .and_then(|parent| parent.join(specifier).ok())
      .and_then(|url| url.to_file_path().ok())
    else {
      return Cow::Borrowed(specifier);
    };

    if with_appended_extension(path, &self.extension).exists() {
      let rewritten = format!("{specifier}.{}", self.extension);
      debug!("rewriting {specifier:?} to {rewritten:?}");
      return Cow::Owned(rewritten);
    }
    Cow::Borrowed(specifier)
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::path::Path;

  use anyhow::Result;
  use async_trait::async_trait;
  use url::Url;

  use super::SpecifierResolver;
  use crate::hooks::{FsDefaultHooks, NextResolve, ResolveContext, ResolveResult};

  /// Records the specifiers the default resolver was called with
  #[derive(Default)]
  struct RecordingResolve {
    calls: RefCell<Vec<String>>,
  }

  #[async_trait(?Send)]
  impl NextResolve for RecordingResolve {
    async fn resolve(
      &self,
      specifier: &str,
      context: &ResolveContext,
    ) -> Result<ResolveResult> {
      self.calls.borrow_mut().push(specifier.to_owned());
      FsDefaultHooks.resolve(specifier, context).await
    }
  }

  fn project() -> (tempfile::TempDir, ResolveContext) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.ts"), "import './util';").unwrap();
    std::fs::write(dir.path().join("util.ts"), "export {};").unwrap();
    std::fs::write(dir.path().join("plain.js"), "export {};").unwrap();
    std::fs::create_dir(dir.path().join("lib")).unwrap();
    std::fs::write(dir.path().join("lib").join("math.ts"), "").unwrap();

    let context = ResolveContext {
      parent_url: Some(
        Url::from_file_path(dir.path().join("main.ts")).unwrap(),
      ),
      ..Default::default()
    };
    (dir, context)
  }

  fn url_of(dir: &Path, file: &str) -> Url {
    Url::from_file_path(dir.join(file)).unwrap()
  }

  #[tokio::test]
  async fn test_appends_extension_when_file_exists() {
    let (dir, context) = project();
    let next = RecordingResolve::default();
    let resolver = SpecifierResolver::new("ts");

    let resolved = resolver.resolve("./util", &context, &next).await.unwrap();
    assert_eq!(resolved.url, url_of(dir.path(), "util.ts"));

    let resolved = resolver
      .resolve("./lib/math", &context, &next)
      .await
      .unwrap();
    assert_eq!(resolved.url, url_of(dir.path(), "lib/math.ts"));
    assert_eq!(*next.calls.borrow(), vec!["./util.ts", "./lib/math.ts"]);
  }

  #[tokio::test]
  async fn test_passes_through_other_specifiers() {
    let (_dir, context) = project();
    let resolver = SpecifierResolver::new("ts");

    for specifier in [
      "./plain.js",
      "./missing",
      "./plain",
      "lodash",
      "node:fs",
      "https://example.com/mod.ts",
      "/abs/util",
    ] {
      let next = RecordingResolve::default();
      let expected = FsDefaultHooks.resolve(specifier, &context).await;
      let resolved = resolver.resolve(specifier, &context, &next).await;

      assert_eq!(*next.calls.borrow(), vec![specifier]);
      match (resolved, expected) {
        (Ok(resolved), Ok(expected)) => assert_eq!(resolved, expected),
        (Err(_), Err(_)) => {}
        (resolved, expected) => {
          panic!("{specifier}: got {resolved:?}, expected {expected:?}")
        }
      }
    }
  }

  #[tokio::test]
  async fn test_rewrite_is_idempotent() {
    let (_dir, context) = project();
    let resolver = SpecifierResolver::new("ts");
    let parent = context.parent_url.as_ref();

    let once = resolver.rewrite("./util", parent).into_owned();
    assert_eq!(once, "./util.ts");
    assert_eq!(resolver.rewrite(&once, parent), "./util.ts");
    assert_eq!(resolver.rewrite("./util.ts", parent), "./util.ts");
  }

  #[test]
  fn test_rewrite_keeps_query_and_fragment() {
    let (_dir, context) = project();
    let resolver = SpecifierResolver::new("ts");
    let parent = context.parent_url.as_ref();

    assert_eq!(resolver.rewrite("./util?v=1", parent), "./util?v=1");
    assert_eq!(resolver.rewrite("./util#main", parent), "./util#main");
  }

  #[test]
  fn test_rewrite_without_file_parent() {
    let resolver = SpecifierResolver::new("ts");
    assert_eq!(resolver.rewrite("./util", None), "./util");

    let parent = Url::parse("https://example.com/main.ts").unwrap();
    assert_eq!(resolver.rewrite("./util", Some(&parent)), "./util");
  }
}
