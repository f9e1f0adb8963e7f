//! Translator binding scopes.
use std::collections::HashMap;

use tree_sitter::Node;

use super::types::GetTransFnDetail;

/// A translator binding and the node it is visible in.
#[derive(Debug, Clone)]
pub struct ScopeInfo<'a> {
    /// Closest enclosing block of the binding, or the program root.
    pub scope_node: Node<'a>,
    pub trans_fn: GetTransFnDetail,
}

impl<'a> ScopeInfo<'a> {
    #[must_use]
    pub const fn new(scope_node: Node<'a>, trans_fn: GetTransFnDetail) -> Self {
        Self { scope_node, trans_fn }
    }
}

/// Stacks of bindings per translator name; the innermost binding wins.
#[derive(Default, Debug)]
pub struct Scopes<'a> {
    stacks: HashMap<String, Vec<ScopeInfo<'a>>>,
}

impl<'a> Scopes<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { stacks: HashMap::new() }
    }

    pub fn push_scope(&mut self, trans_fn_name: String, scope_info: ScopeInfo<'a>) {
        self.stacks.entry(trans_fn_name).or_default().push(scope_info);
    }

    pub fn pop_scope(&mut self, trans_fn_name: &str) -> Option<ScopeInfo<'a>> {
        self.stacks.get_mut(trans_fn_name).and_then(Vec::pop)
    }

    #[must_use]
    pub fn current_scope(&self, trans_fn_name: &str) -> Option<&ScopeInfo<'a>> {
        self.stacks.get(trans_fn_name).and_then(|stack| stack.last())
    }

    /// Returns true if `node` lies within the byte range of the innermost scope.
    #[must_use]
    pub fn is_node_in_current_scope(&self, trans_fn_name: &str, node: Node<'a>) -> bool {
        self.current_scope(trans_fn_name).is_some_and(|current_scope| {
            let scope_node = current_scope.scope_node;
            node.start_byte() >= scope_node.start_byte() && node.end_byte() <= scope_node.end_byte()
        })
    }

    #[must_use]
    pub fn has_scope(&self, trans_fn_name: &str) -> bool {
        self.stacks.get(trans_fn_name).is_some_and(|stack| !stack.is_empty())
    }

    /// Pops bindings until the innermost one contains `node`.
    pub fn cleanup_out_of_scopes(&mut self, trans_fn_name: &str, node: Node<'a>) {
        while self.current_scope(trans_fn_name).is_some()
            && !self.is_node_in_current_scope(trans_fn_name, node)
        {
            self.pop_scope(trans_fn_name);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tree_sitter::Parser;

    use super::*;

    #[test]
    fn test_push_and_cleanup() {
        let source = "function A() { const t = 1; }\nconst u = 2;";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_javascript::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let root = tree.root_node();
        let mut cursor = root.walk();
        let statements: Vec<Node<'_>> = root.named_children(&mut cursor).collect();
        let function = statements.first().copied().unwrap();
        let trailing = statements.last().copied().unwrap();

        let mut scopes = Scopes::new();
        scopes.push_scope("t".to_string(), ScopeInfo::new(root, GetTransFnDetail::new("t", None)));
        scopes.push_scope(
            "t".to_string(),
            ScopeInfo::new(function, GetTransFnDetail::new("t", Some("HomePage".to_string()))),
        );

        assert!(scopes.is_node_in_current_scope("t", function));
        assert!(!scopes.is_node_in_current_scope("t", trailing));

        scopes.cleanup_out_of_scopes("t", trailing);

        assert!(scopes.has_scope("t"));
        assert_eq!(scopes.current_scope("t").unwrap().trans_fn.namespace, None);
        assert!(!scopes.has_scope("u"));
    }
}
