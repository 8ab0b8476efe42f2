//! The semantic pass: name resolution, overload resolution, widening, and
//! destructor insertion.
//!
//! Runs as a copy/rewrite visitor over the parser's output. Every
//! `Unresolved*` expression kind is replaced by a resolved one here; none
//! may survive into later passes. Diagnostics are non-fatal at the
//! expression level — a failed resolution reports an error and returns
//! `None`, which the caller's `?` propagates as "this subtree is invalid,
//! skip it" rather than aborting the whole pass.

use std::collections::HashMap;

use crate::ast::{Arg, Ast, BinOp, ExprKind, StmtKind, UnaryOp, VarTable};
use crate::builtins::{Builtins, NativeMethodSig};
use crate::error::Diagnostics;
use crate::file_location::FileLocation;
use crate::ids::{ClassId, ExprId, MethodId, StmtId, TypeId, VarId};
use crate::scope::SymbolScopeStack;
use crate::types::{Method, MethodModifiers, TypeKind, TypeTable};

/// Owns every `Method` record, addressed by `MethodId`. Kept apart from
/// `ClassDef` (which only stores the ids) so a method body can reference
/// its own `MethodId` without the class borrowing itself mutably twice.
#[derive(Default)]
pub struct MethodTable {
    methods: Vec<Method>,
}

impl MethodTable {
    pub fn new() -> Self {
        MethodTable::default()
    }

    pub fn add(&mut self, method: Method) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(method);
        id
    }

    pub fn get(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    pub fn get_mut(&mut self, id: MethodId) -> &mut Method {
        &mut self.methods[id.index()]
    }
}

pub fn register_native_methods(methods: &mut MethodTable, classes: &mut TypeTable, sigs: &[NativeMethodSig]) {
    for sig in sigs {
        let method = Method {
            modifiers: sig.modifiers | MethodModifiers::NATIVE,
            return_type: sig.return_type,
            name: sig.name.to_string(),
            class: sig.class,
            formal_args: Vec::new(),
            default_args: Vec::new(),
            body: None,
            shader_type: Default::default(),
            workgroup_size: [1, 1, 1],
            native_name: Some(sig.name.to_string()),
            vtable_index: None,
        };
        let id = methods.add(method);
        classes.class_mut(sig.class).methods.push(id);
    }
}

pub struct SemanticPass<'a> {
    pub ast: &'a mut Ast,
    pub vars: &'a mut VarTable,
    pub types: &'a mut TypeTable,
    pub methods: &'a mut MethodTable,
    pub scope: &'a mut SymbolScopeStack,
    pub diags: &'a Diagnostics,
    pub builtins: &'a Builtins,
    /// Variables declared in the scope currently being closed, in
    /// declaration order, so destructor insertion can run them in reverse.
    scope_vars: Vec<Vec<VarId>>,
    current_location: FileLocation,
    /// Every `New` expression built by `resolve_new`, in resolution order,
    /// handed to the API validator once the whole pass completes.
    new_exprs: Vec<ExprId>,
}

impl<'a> SemanticPass<'a> {
    pub fn new(
        ast: &'a mut Ast,
        vars: &'a mut VarTable,
        types: &'a mut TypeTable,
        methods: &'a mut MethodTable,
        scope: &'a mut SymbolScopeStack,
        diags: &'a Diagnostics,
        builtins: &'a Builtins,
    ) -> Self {
        SemanticPass {
            ast,
            vars,
            types,
            methods,
            scope,
            diags,
            builtins,
            scope_vars: vec![Vec::new()],
            current_location: FileLocation::unknown(),
            new_exprs: Vec::new(),
        }
    }

    /// Drains the `New` expressions collected while resolving this pass's
    /// method, for the caller to fold into the API validator's worklist.
    pub fn take_new_exprs(&mut self) -> Vec<ExprId> {
        std::mem::take(&mut self.new_exprs)
    }

    fn error(&self, message: impl Into<String>) {
        self.diags.error(self.current_location.clone(), message);
    }

    fn push_scope(&mut self) {
        self.scope.push();
        self.scope_vars.push(Vec::new());
    }

    /// Pops the innermost scope and returns the vars declared in it, in
    /// declaration order — the caller turns this into a `Destructors`
    /// statement appended (or prepended, for an early return) in reverse.
    fn pop_scope(&mut self) -> Vec<VarId> {
        self.scope.pop();
        self.scope_vars.pop().unwrap_or_default()
    }

    /// Binds an already-allocated `VarId` (a formal argument, typically)
    /// into the innermost scope without adding it to the destructor list —
    /// formal arguments are destroyed by the caller's frame, not the
    /// callee's.
    fn bind_var(&mut self, var: VarId) {
        let name = self.vars.var(var).name.clone();
        let ty = self.vars.var(var).ty;
        let expr = self.make_expr(ExprKind::Var(var), ty);
        self.scope.bind_value(&name, expr);
    }

    fn make_expr(&mut self, kind: ExprKind, ty: TypeId) -> ExprId {
        self.ast.make_expr(kind, ty, self.current_location.clone())
    }

    fn make_stmt(&mut self, kind: StmtKind) -> StmtId {
        self.ast.make_stmt(kind, self.current_location.clone())
    }

    // ---- identifier resolution ---------------------------------------

    fn resolve_identifier(&mut self, id: &str) -> Option<ExprId> {
        if let Some(expr) = self.scope.lookup_value(id) {
            return Some(expr);
        }
        self.error(format!("undefined identifier \"{id}\""));
        None
    }

    /// Unwraps `StrongPtr`/`WeakPtr`/`RawPtr` layers one at a time, inserting
    /// the implicit `Deref` each layer stands for, until the expression's
    /// type is no longer a pointer. A non-pointer expression passes through
    /// unchanged, so callers can always run this before requiring a class.
    fn auto_deref(&mut self, mut expr: ExprId) -> ExprId {
        loop {
            let ty = self.ast.expr(expr).ty;
            let inner = match self.types.kind(ty) {
                TypeKind::StrongPtr(inner) | TypeKind::WeakPtr(inner) | TypeKind::RawPtr(inner) => Some(*inner),
                _ => None,
            };
            match inner {
                Some(inner_ty) => {
                    expr = self.make_expr(ExprKind::UnaryOp { op: UnaryOp::Deref, operand: expr }, inner_ty);
                }
                None => return expr,
            }
        }
    }

    fn resolve_dot(&mut self, base: ExprId, id: &str) -> Option<ExprId> {
        let base = self.auto_deref(base);
        let base_ty = self.ast.expr(base).ty;
        let (unqualified, _quals) = self.types.get_unqualified_type(base_ty);
        let class = match self.types.kind(unqualified) {
            TypeKind::Class(c) => *c,
            _ => {
                self.error(format!("\"{id}\" requested on non-class type"));
                return None;
            }
        };
        if let Some(field) = self.types.class(class).find_field(id).cloned() {
            let field_index = field.index;
            return Some(self.make_expr(ExprKind::Field { base, field_index }, field.ty));
        }
        if matches!(self.ast.expr(base).kind, ExprKind::Swizzle { .. } | ExprKind::Var(_))
            && self.types.is_vector(unqualified)
        {
            if let Some(indices) = parse_swizzle(id, self.types.array_like_len(unqualified).unwrap_or(0)) {
                let component = match self.types.kind(unqualified) {
                    TypeKind::Vector { component, .. } => *component,
                    _ => unreachable!(),
                };
                let ty = if indices.len() == 1 {
                    component
                } else {
                    self.types.get_vector(component, indices.len() as u8)?
                };
                return Some(self.make_expr(ExprKind::Swizzle { base, indices }, ty));
            }
        }
        self.error(format!("no field \"{id}\" on class \"{}\"", self.types.class(class).name));
        None
    }

    fn resolve_method_call(
        &mut self,
        base: Option<ExprId>,
        id: &str,
        args: Vec<Arg>,
    ) -> Option<ExprId> {
        let base = base.map(|b| self.auto_deref(b));
        let class = match base {
            Some(b) => {
                let base_ty = self.ast.expr(b).ty;
                let (unqualified, _) = self.types.get_unqualified_type(base_ty);
                self.types.as_class(unqualified)
            }
            None => None,
        }?;
        let candidates: Vec<MethodId> = self
            .types
            .class(class)
            .methods
            .iter()
            .copied()
            .filter(|&m| self.methods.get(m).name == id)
            .collect();
        if candidates.is_empty() {
            self.error(format!("no method \"{id}\" on class \"{}\"", self.types.class(class).name));
            return None;
        }
        let (method, resolved_args) = self.resolve_overload(&candidates, &args)?;
        let return_type = self.methods.get(method).return_type;
        Some(self.make_expr(ExprKind::MethodCall { base, method, args: resolved_args }, return_type))
    }

    /// First declaration-order candidate whose formal arguments all accept
    /// the supplied actuals (after widening) wins; named arguments bind by
    /// name before remaining positional arguments fill the rest in order.
    fn resolve_overload(&mut self, candidates: &[MethodId], args: &[Arg]) -> Option<(MethodId, Vec<Arg>)> {
        'candidate: for &method in candidates {
            let formal_args = self.methods.get(method).formal_args.clone();
            let default_args = self.methods.get(method).default_args.clone();
            if args.len() > formal_args.len() {
                continue;
            }
            let mut bound: Vec<Option<ExprId>> = vec![None; formal_args.len()];
            let mut positional_index = 0;
            for arg in args {
                let slot = match &arg.name {
                    Some(name) => formal_args.iter().position(|&v| self.vars.var(v).name == *name)?,
                    None => {
                        let idx = positional_index;
                        positional_index += 1;
                        idx
                    }
                };
                if slot >= formal_args.len() || bound[slot].is_some() {
                    continue 'candidate;
                }
                let formal_ty = self.vars.var(formal_args[slot]).ty;
                let arg_ty = self.ast.expr(arg.value).ty;
                if !self.types.can_widen_to(arg_ty, formal_ty) {
                    continue 'candidate;
                }
                let value = if arg_ty == formal_ty {
                    arg.value
                } else {
                    self.make_expr(ExprKind::Cast { ty: formal_ty, expr: arg.value }, formal_ty)
                };
                bound[slot] = Some(value);
            }
            let mut resolved = Vec::with_capacity(formal_args.len());
            for (i, slot) in bound.into_iter().enumerate() {
                let value = match slot.or(default_args.get(i).copied().flatten()) {
                    Some(v) => v,
                    None => continue 'candidate,
                };
                resolved.push(Arg { name: None, value });
            }
            return Some((method, resolved));
        }
        self.error("no matching overload for call");
        None
    }

    // ---- list expressions and casts ------------------------------------

    fn resolve_list_expr(&mut self, ty: Option<TypeId>, elements: Vec<ExprId>) -> Option<ExprId> {
        let target = match ty {
            Some(t) => t,
            None => {
                self.error("cannot infer type of list expression without context");
                return None;
            }
        };
        let (unqualified, _) = self.types.get_unqualified_type(target);
        if let Some(class) = self.types.as_class(unqualified) {
            let fields = self.types.class(class).fields.clone();
            if elements.len() > fields.len() {
                self.error("too many initializers for class");
                return None;
            }
            let mut resolved_elements = Vec::with_capacity(elements.len());
            for (elem, field) in elements.iter().zip(&fields) {
                let elem_ty = self.ast.expr(*elem).ty;
                if !self.types.can_widen_to(elem_ty, field.ty) {
                    self.error(format!("cannot initialize field \"{}\" from supplied value", field.name));
                    return None;
                }
                resolved_elements.push(if elem_ty == field.ty {
                    *elem
                } else {
                    self.make_expr(ExprKind::Cast { ty: field.ty, expr: *elem }, field.ty)
                });
            }
            return Some(self.make_expr(ExprKind::ListExpr { ty: unqualified, elements: resolved_elements }, unqualified));
        }
        if let Some(element_ty) = self.types.array_like_element(unqualified) {
            let mut resolved_elements = Vec::with_capacity(elements.len());
            for elem in &elements {
                let elem_ty = self.ast.expr(*elem).ty;
                if !self.types.can_widen_to(elem_ty, element_ty) {
                    self.error("list expression element does not match array/vector element type");
                    return None;
                }
                resolved_elements.push(if elem_ty == element_ty {
                    *elem
                } else {
                    self.make_expr(ExprKind::Cast { ty: element_ty, expr: *elem }, element_ty)
                });
            }
            return Some(self.make_expr(ExprKind::ListExpr { ty: unqualified, elements: resolved_elements }, unqualified));
        }
        self.error("list expression target is not a class, array, or vector type");
        None
    }

    fn resolve_new(&mut self, ty: TypeId, args: Vec<Arg>) -> Option<ExprId> {
        let class = self.types.as_class(ty)?;
        let ctor_candidates: Vec<MethodId> = self
            .types
            .class(class)
            .methods
            .iter()
            .copied()
            .filter(|&m| self.methods.get(m).modifiers.contains(MethodModifiers::CONSTRUCTOR))
            .collect();
        let resolved_args = if ctor_candidates.is_empty() {
            args
        } else {
            let (_, resolved) = self.resolve_overload(&ctor_candidates, &args)?;
            resolved
        };
        let strong_ptr = self.types.get_strong_ptr(ty);
        let expr = self.make_expr(ExprKind::New { class, args: resolved_args }, strong_ptr);
        self.new_exprs.push(expr);
        Some(expr)
    }

    // ---- entry points -----------------------------------------------------

    /// Resolves one method's body in a fresh scope seeded with its formal
    /// arguments, then installs the rewritten block back into the method
    /// table. Called once per method by the driver, in declaration order.
    pub fn resolve_method(&mut self, method: MethodId) -> bool {
        let body = self.methods.get(method).body;
        let body = match body {
            Some(b) => b,
            None => return true,
        };
        let formal_args = self.methods.get(method).formal_args.clone();
        self.push_scope();
        for &arg in &formal_args {
            self.bind_var(arg);
        }
        let stmts = match self.ast.stmt(body).kind.clone() {
            StmtKind::Block(stmts) => stmts,
            _ => vec![body],
        };
        let resolved = self.resolve_block(&stmts);
        self.pop_scope();
        match resolved {
            Some(new_body) => {
                self.methods.get_mut(method).body = Some(new_body);
                true
            }
            None => false,
        }
    }

    // ---- statements -----------------------------------------------------

    pub fn resolve_block(&mut self, stmts: &[StmtId]) -> Option<StmtId> {
        self.push_scope();
        let mut resolved = Vec::with_capacity(stmts.len());
        let mut has_return = false;
        for &s in stmts {
            let new_s = self.resolve_stmt(s);
            if let Some(ns) = new_s {
                if matches!(self.ast.stmt(ns).kind, StmtKind::Return(_)) {
                    has_return = true;
                }
                resolved.push(ns);
            }
        }
        let declared = self.pop_scope();
        if !has_return && !declared.is_empty() {
            let mut reversed = declared;
            reversed.reverse();
            resolved.push(self.make_stmt(StmtKind::Destructors(reversed)));
        }
        Some(self.make_stmt(StmtKind::Block(resolved)))
    }

    fn resolve_stmt(&mut self, id: StmtId) -> Option<StmtId> {
        let location = self.ast.stmt(id).location.clone();
        self.current_location = location.clone();
        let kind = self.ast.stmt(id).kind.clone();
        match kind {
            StmtKind::Block(stmts) => self.resolve_block(&stmts),
            StmtKind::Expr(e) => {
                let new_e = self.resolve_expr(e)?;
                Some(self.make_stmt(StmtKind::Expr(new_e)))
            }
            StmtKind::VarDecl(decl) => {
                let new_init = match decl.initializer { Some(e) => Some(self.resolve_expr(e)?), None => None };
                let declared_ty = self.vars.var(decl.var).ty;
                let resolved_ty = if self.types.is_auto(declared_ty) {
                    match new_init {
                        Some(e) => self.ast.expr(e).ty,
                        None => {
                            self.error("cannot infer type of variable without an initializer");
                            return None;
                        }
                    }
                } else {
                    if let Some(e) = new_init {
                        if !self.types.can_widen_to(self.ast.expr(e).ty, declared_ty) {
                            self.error("initializer type does not match declared variable type");
                            return None;
                        }
                    }
                    declared_ty
                };
                let new_init = new_init.map(|e| {
                    if self.ast.expr(e).ty == resolved_ty {
                        e
                    } else {
                        self.make_expr(ExprKind::Cast { ty: resolved_ty, expr: e }, resolved_ty)
                    }
                });
                self.vars.var_mut(decl.var).ty = resolved_ty;
                let name = self.vars.var(decl.var).name.clone();
                if self.scope.is_bound_in_current_scope(&name) {
                    self.error(format!("\"{name}\" is already declared in this scope"));
                    return None;
                }
                let expr = self.make_expr(ExprKind::Var(decl.var), resolved_ty);
                self.scope.bind_value(&name, expr);
                self.scope_vars.last_mut().expect("scope stack underflow").push(decl.var);
                Some(self.make_stmt(StmtKind::VarDecl(crate::ast::VarDeclStmt { var: decl.var, initializer: new_init })))
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                let new_cond = self.resolve_expr(cond)?;
                if !self.types.is_bool(self.ast.expr(new_cond).ty) {
                    self.error("if condition must be bool");
                    return None;
                }
                let new_then = self.resolve_stmt(then_branch)?;
                let new_else = match else_branch { Some(s) => Some(self.resolve_stmt(s)?), None => None };
                Some(self.make_stmt(StmtKind::If { cond: new_cond, then_branch: new_then, else_branch: new_else }))
            }
            StmtKind::While { cond, body } => {
                let new_cond = self.resolve_expr(cond)?;
                let new_body = self.resolve_stmt(body)?;
                Some(self.make_stmt(StmtKind::While { cond: new_cond, body: new_body }))
            }
            StmtKind::DoWhile { cond, body } => {
                let new_body = self.resolve_stmt(body)?;
                let new_cond = self.resolve_expr(cond)?;
                Some(self.make_stmt(StmtKind::DoWhile { cond: new_cond, body: new_body }))
            }
            StmtKind::For { init, cond, incr, body } => {
                self.push_scope();
                let resolved: Option<(Option<StmtId>, Option<ExprId>, Option<ExprId>, StmtId)> = (|| {
                    let new_init = match init { Some(s) => Some(self.resolve_stmt(s)?), None => None };
                    let new_cond = match cond { Some(e) => Some(self.resolve_expr(e)?), None => None };
                    let new_incr = match incr { Some(e) => Some(self.resolve_expr(e)?), None => None };
                    let new_body = self.resolve_stmt(body)?;
                    Some((new_init, new_cond, new_incr, new_body))
                })();
                let declared = self.pop_scope();
                let (new_init, new_cond, new_incr, new_body) = resolved?;
                let for_stmt =
                    self.make_stmt(StmtKind::For { init: new_init, cond: new_cond, incr: new_incr, body: new_body });
                if declared.is_empty() {
                    Some(for_stmt)
                } else {
                    let mut reversed = declared;
                    reversed.reverse();
                    let destructors = self.make_stmt(StmtKind::Destructors(reversed));
                    Some(self.make_stmt(StmtKind::Block(vec![for_stmt, destructors])))
                }
            }
            StmtKind::Return(value) => {
                let new_value = match value { Some(e) => Some(self.resolve_expr(e)?), None => None };
                Some(self.make_stmt(StmtKind::Return(new_value)))
            }
            other => Some(self.ast.make_stmt(other, location)),
        }
    }

    fn resolve_expr(&mut self, id: ExprId) -> Option<ExprId> {
        self.current_location = self.ast.expr(id).location.clone();
        let kind = self.ast.expr(id).kind.clone();
        match kind {
            ExprKind::UnresolvedIdentifier(name) => self.resolve_identifier(&name),
            ExprKind::UnresolvedDot { base, id: field } => {
                let base = self.resolve_expr(base)?;
                self.resolve_dot(base, &field)
            }
            ExprKind::UnresolvedStaticDot { scope, id: field } => self.resolve_static_dot(scope, &field),
            ExprKind::UnresolvedMethodCall { base, id: name, args } => {
                let base = self.resolve_expr(base)?;
                let args = self.resolve_args(args)?;
                self.resolve_method_call(Some(base), &name, args)
            }
            ExprKind::UnresolvedStaticMethodCall { scope, id: name, args } => {
                let args = self.resolve_args(args)?;
                let class = self.types.as_class(scope)?;
                let candidates: Vec<MethodId> = self
                    .types
                    .class(class)
                    .methods
                    .iter()
                    .copied()
                    .filter(|&m| self.methods.get(m).name == name && self.methods.get(m).is_static())
                    .collect();
                if candidates.is_empty() {
                    self.error(format!("no static method \"{name}\" on class \"{}\"", self.types.class(class).name));
                    return None;
                }
                let (method, resolved) = self.resolve_overload(&candidates, &args)?;
                let return_type = self.methods.get(method).return_type;
                Some(self.make_expr(ExprKind::MethodCall { base: None, method, args: resolved }, return_type))
            }
            ExprKind::UnresolvedNewExpr { ty, args } => {
                let args = self.resolve_args(args)?;
                self.resolve_new(ty, args)
            }
            ExprKind::UnresolvedInitializer { ty, args } => {
                let args = self.resolve_args(args)?;
                let elements: Vec<ExprId> = args.into_iter().map(|a| a.value).collect();
                self.resolve_list_expr(ty, elements)
            }
            ExprKind::UnresolvedListExpr { elements } => {
                let mut resolved = Vec::with_capacity(elements.len());
                for e in elements {
                    resolved.push(self.resolve_expr(e)?);
                }
                self.resolve_list_expr(None, resolved)
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                let lhs = self.resolve_expr(lhs)?;
                let rhs = self.resolve_expr(rhs)?;
                self.resolve_bin_op(op, lhs, rhs)
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.resolve_expr(operand)?;
                self.resolve_unary_op(op, operand)
            }
            _ => Some(id),
        }
    }

    fn resolve_args(&mut self, args: Vec<Arg>) -> Option<Vec<Arg>> {
        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.resolve_expr(arg.value)?;
            resolved.push(Arg { name: arg.name, value });
        }
        Some(resolved)
    }

    fn resolve_static_dot(&mut self, scope: TypeId, id: &str) -> Option<ExprId> {
        if let Some(class) = self.types.as_class(scope) {
            if let Some(constant) = self.types.class(class).find_constant(id) {
                return Some(constant);
            }
            for &enum_id in &self.types.class(class).enums.clone() {
                if let Some(v) = self.types.enum_def(enum_id).find_value(id).cloned() {
                    let ty = self.types.enum_type_id(enum_id);
                    return Some(self.make_expr(ExprKind::EnumConstant { ty, value: v.value }, ty));
                }
            }
        }
        self.error(format!("no static member \"{id}\" found"));
        None
    }

    fn resolve_unary_op(&mut self, op: UnaryOp, operand: ExprId) -> Option<ExprId> {
        let ty = self.ast.expr(operand).ty;
        let result_ty = match op {
            UnaryOp::LogicalNot => {
                if !self.types.is_bool(ty) {
                    self.error("logical not requires a bool operand");
                    return None;
                }
                ty
            }
            UnaryOp::AddressOf => self.types.get_raw_ptr(ty),
            UnaryOp::Deref => match self.types.kind(ty).clone() {
                TypeKind::RawPtr(inner) | TypeKind::StrongPtr(inner) | TypeKind::WeakPtr(inner) => inner,
                _ => {
                    self.error("cannot dereference a non-pointer type");
                    return None;
                }
            },
            _ => ty,
        };
        Some(self.make_expr(ExprKind::UnaryOp { op, operand }, result_ty))
    }

    /// Applies the binary operator compatibility table: same-type operands
    /// pass through unchanged, otherwise the narrower side widens to the
    /// wider side, and vector-scalar/matrix-scalar/matrix-vector mixes are
    /// legal without either operand widening into the other's shape.
    fn resolve_bin_op(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> Option<ExprId> {
        let lhs_ty = self.ast.expr(lhs).ty;
        let rhs_ty = self.ast.expr(rhs).ty;

        if op.is_assignment() {
            if !self.types.is_writable(lhs_ty) {
                self.error("left-hand side of assignment is not writable");
                return None;
            }
            if let ExprKind::Swizzle { indices, .. } = &self.ast.expr(lhs).kind {
                if !swizzle_is_unique_store_target(indices) {
                    self.error("swizzle assignment target repeats a channel");
                    return None;
                }
            }
            if !self.types.can_widen_to(rhs_ty, lhs_ty) {
                self.error("cannot assign: incompatible types");
                return None;
            }
            let rhs = if rhs_ty == lhs_ty {
                rhs
            } else {
                self.make_expr(ExprKind::Cast { ty: lhs_ty, expr: rhs }, lhs_ty)
            };
            return Some(self.make_expr(ExprKind::BinOp { op, lhs, rhs }, lhs_ty));
        }

        if lhs_ty == rhs_ty {
            let result_ty = if op.is_comparison() { self.types.get_bool() } else { lhs_ty };
            return Some(self.make_expr(ExprKind::BinOp { op, lhs, rhs }, result_ty));
        }
        if self.types.can_widen_to(lhs_ty, rhs_ty) {
            let widened = self.make_expr(ExprKind::Cast { ty: rhs_ty, expr: lhs }, rhs_ty);
            let result_ty = if op.is_comparison() { self.types.get_bool() } else { rhs_ty };
            return Some(self.make_expr(ExprKind::BinOp { op, lhs: widened, rhs }, result_ty));
        }
        if self.types.can_widen_to(rhs_ty, lhs_ty) {
            let widened = self.make_expr(ExprKind::Cast { ty: lhs_ty, expr: rhs }, lhs_ty);
            let result_ty = if op.is_comparison() { self.types.get_bool() } else { lhs_ty };
            return Some(self.make_expr(ExprKind::BinOp { op, lhs, rhs: widened }, result_ty));
        }
        if self.types.vector_scalar(lhs_ty, rhs_ty) || self.types.scalar_vector(lhs_ty, rhs_ty) {
            let result_ty = if self.types.is_vector(lhs_ty) { lhs_ty } else { rhs_ty };
            return Some(self.make_expr(ExprKind::BinOp { op, lhs, rhs }, result_ty));
        }
        if self.types.matrix_scalar(lhs_ty, rhs_ty) || self.types.scalar_matrix(lhs_ty, rhs_ty) {
            let result_ty = if self.types.is_matrix(lhs_ty) { lhs_ty } else { rhs_ty };
            return Some(self.make_expr(ExprKind::BinOp { op, lhs, rhs }, result_ty));
        }
        if self.types.matrix_vector(lhs_ty, rhs_ty) {
            return Some(self.make_expr(ExprKind::BinOp { op, lhs, rhs }, rhs_ty));
        }
        if self.types.vector_matrix(lhs_ty, rhs_ty) {
            return Some(self.make_expr(ExprKind::BinOp { op, lhs, rhs }, lhs_ty));
        }
        self.error("operands to binary operator have incompatible types");
        None
    }
}

/// `rgba`/`xyzw` (never mixed) down to channel indices, rejecting repeats
/// on the left-hand side of an assignment is the caller's job — this just
/// parses the letters, up to 4 of them, against the vector's own length.
fn parse_swizzle(id: &str, vector_len: u32) -> Option<crate::ast::SwizzleIndices> {
    if id.is_empty() || id.len() > 4 {
        return None;
    }
    let xyzw = "xyzw";
    let rgba = "rgba";
    let mut indices = crate::ast::SwizzleIndices::new();
    let use_rgba = id.chars().all(|c| rgba.contains(c));
    let use_xyzw = id.chars().all(|c| xyzw.contains(c));
    if !use_rgba && !use_xyzw {
        return None;
    }
    let table = if use_xyzw { xyzw } else { rgba };
    for c in id.chars() {
        let idx = table.find(c)? as u8;
        if idx as u32 >= vector_len {
            return None;
        }
        indices.push(idx);
    }
    Some(indices)
}

/// True when `indices` names each channel at most once, the rule a
/// swizzle must satisfy to appear as an assignment target.
pub fn swizzle_is_unique_store_target(indices: &crate::ast::SwizzleIndices) -> bool {
    let mut seen: HashMap<u8, ()> = HashMap::new();
    for &i in indices {
        if seen.insert(i, ()).is_some() {
            return false;
        }
    }
    true
}

/// Fills in default field initializers for every field a class does not
/// explicitly initialize, walking parent-to-child so a derived class's own
/// default overwrites an inherited one when both are present. Matches the
/// "most-derived field default wins" rule.
pub fn add_default_initializers(types: &mut TypeTable, class: ClassId) {
    let mut chain = Vec::new();
    let mut cur = Some(class);
    while let Some(c) = cur {
        chain.push(c);
        cur = types.class(c).parent;
    }
    chain.reverse();
    let mut defaults: HashMap<String, Option<ExprId>> = HashMap::new();
    for c in chain {
        for field in &types.class(c).fields {
            defaults.insert(field.name.clone(), field.default_value);
        }
    }
    for field in &mut types.class_mut(class).fields {
        if field.default_value.is_none() {
            field.default_value = defaults.get(&field.name).copied().flatten();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swizzle_rejects_mixed_groups() {
        assert!(parse_swizzle("xg", 4).is_none());
    }

    #[test]
    fn swizzle_rejects_out_of_range_channel() {
        assert!(parse_swizzle("z", 2).is_none());
    }

    #[test]
    fn swizzle_accepts_valid_subset() {
        let idx = parse_swizzle("xy", 4).unwrap();
        assert_eq!(&idx[..], &[0, 1]);
    }

    #[test]
    fn swizzle_store_rejects_repeated_channel() {
        let mut idx = crate::ast::SwizzleIndices::new();
        idx.push(0);
        idx.push(0);
        assert!(!swizzle_is_unique_store_target(&idx));
    }

    #[test]
    fn swizzle_store_accepts_distinct_channels() {
        let mut idx = crate::ast::SwizzleIndices::new();
        idx.push(2);
        idx.push(0);
        assert!(swizzle_is_unique_store_target(&idx));
    }
}
