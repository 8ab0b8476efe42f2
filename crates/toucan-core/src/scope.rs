//! Symbol scope stack used while resolving identifiers.
//!
//! A scope holds two independent bindings per name: one for values
//! (variables, enum constants, methods wrapped in an implicit self-call)
//! and one for types (classes, enums, template formal args). Lookup walks
//! from the innermost scope outward and the first match wins, so shadowing
//! across nested scopes is "last pushed, first found"; redeclaring a name
//! within the *same* block is a separate, explicit check the resolution
//! pass makes with `is_bound_in_current_scope` before binding.

use std::collections::HashMap;

use crate::ids::{ExprId, TypeId};

#[derive(Default)]
struct Scope {
    values: HashMap<String, ExprId>,
    types: HashMap<String, TypeId>,
}

#[derive(Default)]
pub struct SymbolScopeStack {
    scopes: Vec<Scope>,
}

impl SymbolScopeStack {
    pub fn new() -> Self {
        let mut stack = SymbolScopeStack::default();
        stack.push();
        stack
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
        debug_assert!(!self.scopes.is_empty(), "popped the root scope");
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn bind_value(&mut self, name: &str, expr: ExprId) {
        self.scopes.last_mut().expect("empty scope stack").values.insert(name.to_string(), expr);
    }

    pub fn bind_type(&mut self, name: &str, ty: TypeId) {
        self.scopes.last_mut().expect("empty scope stack").types.insert(name.to_string(), ty);
    }

    pub fn lookup_value(&self, name: &str) -> Option<ExprId> {
        self.scopes.iter().rev().find_map(|s| s.values.get(name).copied())
    }

    pub fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.scopes.iter().rev().find_map(|s| s.types.get(name).copied())
    }

    /// True when `name` is already bound to a value *in the innermost
    /// scope only* — used to reject redeclaration within the same block
    /// without flagging ordinary shadowing of an outer binding.
    pub fn is_bound_in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().map(|s| s.values.contains_key(name) || s.types.contains_key(name)).unwrap_or(false)
    }
}

/// Pushes a new scope on construction, pops it on drop, so a pass can use
/// `let _guard = stack.enter();` and rely on unwinding-safe cleanup even
/// across an early `?` return.
pub struct ScopeGuard<'a> {
    stack: &'a mut SymbolScopeStack,
}

impl<'a> ScopeGuard<'a> {
    pub fn new(stack: &'a mut SymbolScopeStack) -> Self {
        stack.push();
        ScopeGuard { stack }
    }

    pub fn stack(&mut self) -> &mut SymbolScopeStack {
        self.stack
    }
}

impl<'a> Drop for ScopeGuard<'a> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_binding_shadows_outer() {
        let mut stack = SymbolScopeStack::new();
        stack.bind_value("x", ExprId(0));
        {
            let mut guard = ScopeGuard::new(&mut stack);
            guard.stack().bind_value("x", ExprId(1));
            assert_eq!(guard.stack().lookup_value("x"), Some(ExprId(1)));
        }
        assert_eq!(stack.lookup_value("x"), Some(ExprId(0)));
    }

    #[test]
    fn lookup_falls_through_to_outer_scope() {
        let mut stack = SymbolScopeStack::new();
        stack.bind_value("y", ExprId(5));
        let mut guard = ScopeGuard::new(&mut stack);
        assert_eq!(guard.stack().lookup_value("y"), Some(ExprId(5)));
    }
}
