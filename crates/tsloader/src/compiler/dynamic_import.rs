use deno_ast::swc::ast::{CallExpr, Callee};
use deno_ast::swc::visit::{Visit, VisitWith};

/// Finds `import()` expressions in a module
#[derive(Debug, Default)]
pub struct DynamicImportAnalyzer {
  pub has_dynamic_import: bool,
}

impl DynamicImportAnalyzer {
  pub fn new() -> Self {
    Self {
      has_dynamic_import: false,
    }
  }
}

impl Visit for DynamicImportAnalyzer {
  fn visit_call_expr(&mut self, node: &CallExpr) {
    if let Callee::Import(_) = node.callee {
      self.has_dynamic_import = true;
      return;
    }
    node.visit_children_with(self);
  }
}
