//! Extracts translator calls from a template using Tree-sitter.
//!
//! A translator is bound by calling one of the configured factory functions,
//! for example `const t = useTranslations("HomePage")` or
//! `const t = await getTranslations({ namespace: "HomePage.cta" })`. Calls to
//! the bound name with a literal first argument (`t("title")`, `t.rich("body")`)
//! are reported together with the namespace of the innermost binding in scope.

use tree_sitter::{
    Language,
    Node,
    Parser,
};

use crate::syntax::analyzer::scope::{
    ScopeInfo,
    Scopes,
};
use crate::syntax::analyzer::types::{
    AnalyzerError,
    CallTransFnDetail,
    GetTransFnDetail,
    TransFnCall,
};
use crate::types::SourceRange;

/// Node kinds that open a new binding scope.
const SCOPE_NODE_KINDS: &[&str] = &["statement_block"];

fn extract_node_text(node: Node<'_>, source_bytes: &[u8]) -> Option<String> {
    node.utf8_text(source_bytes).ok().map(ToString::to_string)
}

/// Extracts the base function name from a node
///
/// For member expressions like `t.rich("key")`, this returns "t".
/// For identifiers, this returns the identifier text.
fn extract_base_function_name(node: Node<'_>, source_bytes: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => extract_node_text(node, source_bytes),
        "member_expression" => node
            .child_by_field_name("object")
            .and_then(|obj| extract_base_function_name(obj, source_bytes)),
        _ => None,
    }
}

/// Finds the closest ancestor node of a given type
fn get_closest_node<'a>(node: Node<'a>, target_types: &[&str]) -> Option<Node<'a>> {
    let mut current_node = node;

    while let Some(parent) = current_node.parent() {
        if target_types.contains(&parent.kind()) {
            return Some(parent);
        }
        current_node = parent;
    }

    None
}

/// All named nodes of the tree in source order.
fn preorder<'tree>(root: Node<'tree>) -> Vec<Node<'tree>> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        nodes.push(node);
        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    nodes
}

fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).next()
}

/// Text of a string literal or of a template literal without substitutions.
fn string_literal_value(node: Node<'_>, source_bytes: &[u8]) -> Option<String> {
    let quote = match node.kind() {
        "string" => None,
        "template_string" => {
            let mut cursor = node.walk();
            if node.named_children(&mut cursor).any(|c| c.kind() == "template_substitution") {
                return None;
            }
            Some('`')
        }
        _ => return None,
    };

    let text = extract_node_text(node, source_bytes)?;
    let inner = match quote {
        Some(q) => text.strip_prefix(q)?.strip_suffix(q)?,
        None => text
            .strip_prefix(['"', '\''])
            .and_then(|t| t.strip_suffix(['"', '\'']))?,
    };
    Some(inner.to_string())
}

/// Unwraps `await expr`, `(expr)` and TypeScript `expr as T` / `expr!`.
fn unwrap_expression(mut node: Node<'_>) -> Node<'_> {
    while matches!(
        node.kind(),
        "await_expression" | "parenthesized_expression" | "as_expression" | "non_null_expression"
    ) {
        let Some(inner) = first_named_child(node) else {
            break;
        };
        node = inner;
    }
    node
}

/// Namespace argument of a translator factory: a string, or an object with
/// a `namespace` property (`getTranslations({ locale, namespace: "..." })`).
fn extract_namespace_argument(args_node: Node<'_>, source_bytes: &[u8]) -> Option<String> {
    let first = first_named_child(args_node)?;
    match first.kind() {
        "object" => {
            let mut cursor = first.walk();
            let pairs: Vec<Node<'_>> =
                first.named_children(&mut cursor).filter(|c| c.kind() == "pair").collect();
            pairs.into_iter().find_map(|pair| {
                let key = pair.child_by_field_name("key")?;
                let key_text = match key.kind() {
                    "property_identifier" => extract_node_text(key, source_bytes)?,
                    _ => string_literal_value(key, source_bytes)?,
                };
                if key_text != "namespace" {
                    return None;
                }
                string_literal_value(pair.child_by_field_name("value")?, source_bytes)
            })
        }
        _ => string_literal_value(first, source_bytes),
    }
}

/// Parses `name = factory(...)` declarators into a translator binding.
fn parse_get_trans_fn(
    declarator: Node<'_>,
    source_bytes: &[u8],
    translation_functions: &[String],
) -> Option<GetTransFnDetail> {
    let name = declarator.child_by_field_name("name")?;
    if name.kind() != "identifier" {
        return None;
    }

    let value = unwrap_expression(declarator.child_by_field_name("value")?);
    if value.kind() != "call_expression" {
        return None;
    }

    let function = value.child_by_field_name("function")?;
    if function.kind() != "identifier" {
        return None;
    }
    let function_name = extract_node_text(function, source_bytes)?;
    if !translation_functions.iter().any(|f| *f == function_name) {
        return None;
    }

    let namespace = value
        .child_by_field_name("arguments")
        .and_then(|args| extract_namespace_argument(args, source_bytes));

    Some(GetTransFnDetail::new(extract_node_text(name, source_bytes)?, namespace))
}

/// Parses `t("key", ...)` and `t.rich("key", ...)`; dynamic keys are skipped.
fn parse_call_trans_fn<'a>(call: Node<'a>, source_bytes: &[u8]) -> Option<CallTransFnDetail<'a>> {
    let function = call.child_by_field_name("function")?;
    let trans_fn_name = extract_base_function_name(function, source_bytes)?;

    let args = call.child_by_field_name("arguments")?;
    let key_node = first_named_child(args)?;
    let key = string_literal_value(key_node, source_bytes)?;
    if key.is_empty() {
        return None;
    }

    Some(CallTransFnDetail { trans_fn_name, key, key_node })
}

/// Extracts translator calls from a template source.
///
/// # Errors
/// Returns `AnalyzerError` if:
/// - Language setup fails
/// - Source code parsing fails
pub fn analyze_trans_fn_calls(
    source: &str,
    language: &Language,
    translation_functions: &[String],
) -> Result<Vec<TransFnCall>, AnalyzerError> {
    let mut parser = Parser::new();
    parser.set_language(language)?;
    let tree = parser.parse(source, None).ok_or(AnalyzerError::ParseFailed)?;

    let source_bytes = source.as_bytes();
    let root_node = tree.root_node();

    let mut scopes = Scopes::new();
    let mut calls = Vec::new();

    for node in preorder(root_node) {
        match node.kind() {
            "variable_declarator" => {
                let Some(trans_fn) = parse_get_trans_fn(node, source_bytes, translation_functions)
                else {
                    continue;
                };

                scopes.cleanup_out_of_scopes(&trans_fn.trans_fn_name, node);

                let scope_node = get_closest_node(node, SCOPE_NODE_KINDS).unwrap_or(root_node);
                let trans_fn_name = trans_fn.trans_fn_name.clone();
                scopes.push_scope(trans_fn_name, ScopeInfo::new(scope_node, trans_fn));
            }
            "call_expression" => {
                let Some(call_trans_fn) = parse_call_trans_fn(node, source_bytes) else {
                    continue;
                };

                // Only names bound by a factory are translators.
                if !scopes.has_scope(&call_trans_fn.trans_fn_name) {
                    continue;
                }

                scopes.cleanup_out_of_scopes(&call_trans_fn.trans_fn_name, node);

                let Some(scope_info) = scopes.current_scope(&call_trans_fn.trans_fn_name) else {
                    continue;
                };

                calls.push(TransFnCall {
                    key: call_trans_fn.key,
                    namespace: scope_info.trans_fn.namespace.clone(),
                    range: SourceRange::from_node(&call_trans_fn.key_node),
                });
            }
            _ => {}
        }
    }

    Ok(calls)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[fixture]
    fn tsx_lang() -> Language {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    }

    #[fixture]
    fn functions() -> Vec<String> {
        vec!["useTranslations".to_string(), "getTranslations".to_string()]
    }

    fn keys(calls: &[TransFnCall]) -> Vec<(Option<&str>, &str)> {
        calls.iter().map(|c| (c.namespace.as_deref(), c.key.as_str())).collect()
    }

    #[rstest]
    fn test_use_translations_binding(tsx_lang: Language, functions: Vec<String>) {
        let code = r#"
            export default function Hero() {
                const t = useTranslations("HomePage");
                return <h1>{t("title")}</h1>;
            }
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(keys(&calls), vec![(Some("HomePage"), "title")]);
        assert_that!(calls[0].range.start.line, eq(3));
    }

    #[rstest]
    fn test_await_get_translations_with_object(tsx_lang: Language, functions: Vec<String>) {
        let code = r#"
            export async function generateMetadata({ params }) {
                const t = await getTranslations({ locale: params.locale, namespace: "Tours.hero" });
                return { title: t("title"), description: t('subtitle') };
            }
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(
            keys(&calls),
            vec![(Some("Tours.hero"), "title"), (Some("Tours.hero"), "subtitle")]
        );
    }

    #[rstest]
    fn test_rich_and_raw_calls(tsx_lang: Language, functions: Vec<String>) {
        let code = r#"
            function Footer() {
                const t = useTranslations("Footer");
                return <p>{t.rich("legal", { b: (c) => <b>{c}</b> })}{t.raw("html")}</p>;
            }
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(keys(&calls), vec![(Some("Footer"), "legal"), (Some("Footer"), "html")]);
    }

    #[rstest]
    fn test_binding_without_namespace(tsx_lang: Language, functions: Vec<String>) {
        let code = r#"
            function Nav() {
                const t = useTranslations();
                return t("Navigation.home");
            }
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(keys(&calls), vec![(None, "Navigation.home")]);
    }

    #[rstest]
    fn test_function_scope_isolation(tsx_lang: Language, functions: Vec<String>) {
        let code = r#"
            function A() {
                const t = useTranslations("PageA");
                return t("a");
            }
            function B() {
                const t = useTranslations("PageB");
                return t("b");
            }
            function C() {
                return t("unbound");
            }
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(keys(&calls), vec![(Some("PageA"), "a"), (Some("PageB"), "b")]);
    }

    #[rstest]
    fn test_nested_shadowing(tsx_lang: Language, functions: Vec<String>) {
        let code = r#"
            function Page() {
                const t = useTranslations("Outer");
                function Inner() {
                    const t = useTranslations("Inner");
                    return t("inner");
                }
                return t("outer");
            }
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(keys(&calls), vec![(Some("Inner"), "inner"), (Some("Outer"), "outer")]);
    }

    #[rstest]
    fn test_custom_variable_name(tsx_lang: Language, functions: Vec<String>) {
        let code = r#"
            function Booking() {
                const tForm = useTranslations("Booking.form");
                return tForm("submit");
            }
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(keys(&calls), vec![(Some("Booking.form"), "submit")]);
    }

    #[rstest]
    fn test_unconfigured_factory_ignored(tsx_lang: Language) {
        let code = r#"
            const t = useTranslations("HomePage");
            t("title");
        "#;

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &["getTranslations".to_string()])
            .unwrap();

        assert!(calls.is_empty());
    }

    #[rstest]
    #[case::template_literal(r"t(`template.${variable}`)")]
    #[case::variable(r"t(someVariable)")]
    #[case::number(r"t(123)")]
    #[case::empty(r#"t("")"#)]
    #[case::expression(r#"t("prefix" + "suffix")"#)]
    fn test_dynamic_keys_skipped(
        tsx_lang: Language,
        functions: Vec<String>,
        #[case] call: &str,
    ) {
        let code = format!("const t = useTranslations(\"HomePage\");\n{call};");

        let calls = analyze_trans_fn_calls(&code, &tsx_lang, &functions).unwrap();

        assert!(calls.is_empty());
    }

    #[rstest]
    fn test_static_template_literal_key(tsx_lang: Language, functions: Vec<String>) {
        let code = "const t = useTranslations(\"HomePage\");\nt(`title`);";

        let calls = analyze_trans_fn_calls(code, &tsx_lang, &functions).unwrap();

        assert_eq!(keys(&calls), vec![(Some("HomePage"), "title")]);
    }

    #[rstest]
    fn test_javascript_language() {
        let code = r#"
            const t = useTranslations("About");
            export const heading = t("heading");
        "#;
        let lang: Language = tree_sitter_javascript::LANGUAGE.into();

        let calls =
            analyze_trans_fn_calls(code, &lang, &["useTranslations".to_string()]).unwrap();

        assert_eq!(keys(&calls), vec![(Some("About"), "heading")]);
    }
}
