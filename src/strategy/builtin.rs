use super::{Behavior, MethodBody, MethodStrategy};
use crate::contract::{Operation, ReturnKind};

/// Void operations do nothing, whether or not a setup exists for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidStrategy;

impl MethodStrategy for VoidStrategy {
    fn name(&self) -> &str {
        "void"
    }

    fn matches(&self, operation: &Operation) -> bool {
        operation.return_kind == ReturnKind::Void
    }

    fn build_body(&self, _operation: &Operation) -> MethodBody {
        MethodBody::new(Behavior::Nothing)
    }
}

/// Unit futures complete immediately. Setups registered for them are
/// accepted by `Mock::setup` and never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FutureVoidStrategy;

impl MethodStrategy for FutureVoidStrategy {
    fn name(&self) -> &str {
        "future-void"
    }

    fn matches(&self, operation: &Operation) -> bool {
        operation.return_kind == ReturnKind::FutureVoid
    }

    fn build_body(&self, operation: &Operation) -> MethodBody {
        MethodBody::new(Behavior::CompletedFuture).line(completed_future_expr(operation))
    }
}

/// Catch-all: resolve the registered provider and hand its value back as
/// the declared return type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

impl MethodStrategy for DefaultStrategy {
    fn name(&self) -> &str {
        "default"
    }

    fn matches(&self, _operation: &Operation) -> bool {
        true
    }

    fn build_body(&self, operation: &Operation) -> MethodBody {
        let name = format!("{:?}", operation.name);
        let return_type = operation.rendered_return_type();
        let expected = format!("{:?}", return_type);

        MethodBody::new(Behavior::Lookup)
            .line(format!("let result = self.mocked_result({name});"))
            .line(format!("match result.downcast::<{return_type}>() {{"))
            .line("    Ok(value) => *value,")
            .line(
                "    Err(_) => ::std::panic::panic_any(::dummy_mock::MockError::ResultTypeMismatch {",
            )
            .line(format!("        operation: {name}.to_string(),"))
            .line(format!("        expected: {expected}.to_string(),"))
            .line("    }),")
            .line("}")
    }
}

fn completed_future_expr(operation: &Operation) -> String {
    let is_plain_ready = operation
        .return_type
        .as_deref()
        .and_then(|ty| syn::parse_str::<syn::TypePath>(ty).ok())
        .and_then(|path| path.path.segments.last().map(|s| s.ident == "Ready"))
        .unwrap_or(false);

    if is_plain_ready {
        "::std::future::ready(())".to_string()
    } else {
        "::std::boxed::Box::pin(::std::future::ready(()))".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Parameter;

    fn operation(name: &str, return_type: Option<&str>) -> Operation {
        Operation {
            name: name.to_string(),
            return_kind: ReturnKind::classify(return_type),
            return_type: return_type.map(str::to_string),
            parameters: vec![Parameter {
                name: "x".to_string(),
                ty: "i32".to_string(),
            }],
        }
    }

    #[test]
    fn test_void_body_is_empty() {
        let body = VoidStrategy.build_body(&operation("notify", None));
        assert!(body.lines.is_empty());
        assert!(matches!(body.behavior, Behavior::Nothing));
    }

    #[test]
    fn test_future_void_body_completes_immediately() {
        let boxed = FutureVoidStrategy.build_body(&operation("notify_async", Some("BoxFuture<'static, ()>")));
        assert_eq!(
            boxed.lines,
            vec!["::std::boxed::Box::pin(::std::future::ready(()))"]
        );
        assert!(matches!(boxed.behavior, Behavior::CompletedFuture));

        let ready = FutureVoidStrategy.build_body(&operation("ready", Some("std::future::Ready<()>")));
        assert_eq!(ready.lines, vec!["::std::future::ready(())"]);
    }

    #[test]
    fn test_default_body_looks_up_by_name_and_keeps_generic_type() {
        let body = DefaultStrategy.build_body(&operation(
            "get_hello_world_async",
            Some("BoxFuture<'static, String>"),
        ));
        let text = body.lines.join("\n");

        assert!(matches!(body.behavior, Behavior::Lookup));
        assert!(text.contains("self.mocked_result(\"get_hello_world_async\")"));
        assert!(text.contains("result.downcast::<BoxFuture<'static, String>>()"));
        assert!(text.contains("ResultTypeMismatch"));
    }

    #[test]
    fn test_matching_is_by_kind() {
        let void = operation("a", None);
        let future_void = operation("b", Some("BoxFuture<'static, ()>"));
        let value = operation("c", Some("String"));

        assert!(VoidStrategy.matches(&void));
        assert!(!VoidStrategy.matches(&future_void));
        assert!(FutureVoidStrategy.matches(&future_void));
        assert!(!FutureVoidStrategy.matches(&value));
        assert!(DefaultStrategy.matches(&void));
        assert!(DefaultStrategy.matches(&value));
    }
}
