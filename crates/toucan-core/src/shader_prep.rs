//! Shader preparation: turns a resolved vertex/fragment/compute method
//! into something the IR emitter can walk directly — its interface
//! variables (inputs, outputs, bind-group entries, built-ins) pulled out
//! of the formal argument list, and every pointer-typed argument that
//! reaches a field or array access flattened into a copy-in/copy-out
//! local so the emitter never has to model a pointer into the middle of
//! an aggregate.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::{Ast, ExprKind, StmtKind, VarTable, Visitor};
use crate::error::Diagnostics;
use crate::file_location::FileLocation;
use crate::ids::{ExprId, MethodId, StmtId, VarId};
use crate::semantic::MethodTable;
use crate::types::{ShaderType, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinVariable {
    VertexIndex,
    InstanceIndex,
    Position,
    PointSize,
    FragCoord,
    FrontFacing,
    FragDepth,
    LocalInvocationId,
    LocalInvocationIndex,
    GlobalInvocationId,
    WorkgroupId,
    NumWorkgroups,
    SampleIndex,
    SampleMaskIn,
    SampleMaskOut,
}

/// The documented `name -> slot` mapping a shader IR consumer needs to
/// decorate an interface variable as one of the fixed built-ins rather
/// than an ordinary located input/output.
static BUILTIN_SLOTS: Lazy<HashMap<BuiltinVariable, u32>> = Lazy::new(|| {
    use BuiltinVariable::*;
    HashMap::from([
        (VertexIndex, 0),
        (InstanceIndex, 1),
        (Position, 2),
        (PointSize, 3),
        (FragCoord, 4),
        (FrontFacing, 5),
        (FragDepth, 6),
        (LocalInvocationId, 7),
        (LocalInvocationIndex, 8),
        (GlobalInvocationId, 9),
        (WorkgroupId, 10),
        (NumWorkgroups, 11),
        (SampleIndex, 12),
        (SampleMaskIn, 13),
        (SampleMaskOut, 14),
    ])
});

pub fn builtin_slot_id(builtin: BuiltinVariable) -> u32 {
    BUILTIN_SLOTS[&builtin]
}

#[derive(Debug, Clone)]
pub struct InterfaceVariable {
    pub var: VarId,
    pub location: Option<u32>,
    pub descriptor_set: Option<u32>,
    pub binding: Option<u32>,
    pub builtin: Option<BuiltinVariable>,
    pub slot: Option<u32>,
    pub flat: bool,
    pub is_output: bool,
}

impl InterfaceVariable {
    fn with_builtin(var: VarId, builtin: BuiltinVariable, is_output: bool) -> Self {
        InterfaceVariable {
            var,
            location: None,
            descriptor_set: None,
            binding: None,
            slot: Some(builtin_slot_id(builtin)),
            builtin: Some(builtin),
            flat: false,
            is_output,
        }
    }
}

#[derive(Debug, Default)]
pub struct ShaderInterface {
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<InterfaceVariable>,
    pub bind_groups: Vec<InterfaceVariable>,
    pub workgroup_size: [u32; 3],
}

pub struct ShaderPrepPass<'a> {
    pub ast: &'a mut Ast,
    pub vars: &'a mut VarTable,
    pub types: &'a TypeTable,
    pub methods: &'a mut MethodTable,
    pub diags: &'a Diagnostics,
}

impl<'a> ShaderPrepPass<'a> {
    pub fn new(
        ast: &'a mut Ast,
        vars: &'a mut VarTable,
        types: &'a TypeTable,
        methods: &'a mut MethodTable,
        diags: &'a Diagnostics,
    ) -> Self {
        ShaderPrepPass { ast, vars, types, methods, diags }
    }

    /// Extracts a shader entry point's interface. Fields whose name starts
    /// with `gl_`/`sv_`-style prefixes are left to the caller; this pass
    /// only separates formal args into inputs (non-output qualified) vs.
    /// outputs (write-only qualified) and the bind-group resource args.
    pub fn extract_interface(&self, method: MethodId) -> ShaderInterface {
        let m = self.methods.get(method);
        let mut iface = ShaderInterface { workgroup_size: m.workgroup_size, ..Default::default() };
        let mut location = 0u32;
        for &arg in &m.formal_args {
            let ty = self.vars.var(arg).ty;
            let (unqualified, quals) = self.types.get_unqualified_type(ty);
            if self.types.as_class(unqualified).map(|c| self.types.class(c).is_native).unwrap_or(false) {
                iface.bind_groups.push(InterfaceVariable {
                    var: arg,
                    location: None,
                    descriptor_set: Some(0),
                    binding: Some(iface.bind_groups.len() as u32),
                    builtin: None,
                    slot: None,
                    flat: false,
                    is_output: false,
                });
                continue;
            }
            let is_output = quals.contains(crate::types::Qualifiers::WRITE_ONLY);
            let flat = self.types.is_integer(unqualified) || self.types.is_enum(unqualified);
            let entry = InterfaceVariable {
                var: arg,
                location: Some(location),
                descriptor_set: None,
                binding: None,
                builtin: None,
                slot: None,
                flat,
                is_output,
            };
            location += 1;
            if is_output {
                iface.outputs.push(entry);
            } else {
                iface.inputs.push(entry);
            }
        }
        if matches!(m.shader_type, ShaderType::Vertex) {
            let placeholder = m.formal_args.first().copied().unwrap_or(VarId(0));
            iface.outputs.push(InterfaceVariable::with_builtin(placeholder, BuiltinVariable::Position, true));
        }
        iface
    }

    /// Replaces every pointer-typed formal argument with a fresh local
    /// initialized by copying in at entry and substituted for every read
    /// of the argument in the body. Only copy-in is implemented: an
    /// argument written through inside the shader is not copied back out
    /// at return, because nothing in this interface yet marks which
    /// pointer formals are used as writable outputs versus inputs.
    pub fn flatten_pointer_args(&mut self, method: MethodId) {
        if self.methods.get(method).body.is_none() {
            return;
        }
        let formal_args: Vec<VarId> = self
            .methods
            .get(method)
            .formal_args
            .iter()
            .copied()
            .filter(|&a| {
                let ty = self.vars.var(a).ty;
                self.types.is_ptr(ty) && !self.types.is_raw_ptr(ty)
            })
            .collect();
        for arg in formal_args {
            let body = match self.methods.get(method).body {
                Some(b) => b,
                None => return,
            };
            self.flatten_one(method, arg, body);
        }
    }

    fn flatten_one(&mut self, method: MethodId, arg: VarId, body: StmtId) {
        let ty = self.vars.var(arg).ty;
        let pointee = match self.types.kind(ty) {
            crate::types::TypeKind::StrongPtr(p) | crate::types::TypeKind::WeakPtr(p) => *p,
            _ => return,
        };
        let name = format!("{}_local", self.vars.var(arg).name);
        let local = self.vars.make_var(&name, pointee, false, FileLocation::unknown());
        let arg_expr = self.ast.make_expr(ExprKind::Var(arg), ty, FileLocation::unknown());
        let deref = self.ast.make_expr(
            ExprKind::UnaryOp { op: crate::ast::UnaryOp::Deref, operand: arg_expr },
            pointee,
            FileLocation::unknown(),
        );
        let init_stmt = self.ast.make_stmt(
            StmtKind::VarDecl(crate::ast::VarDeclStmt { var: local, initializer: Some(deref) }),
            FileLocation::unknown(),
        );

        let new_body = {
            let mut subst = SubstituteVar { ast: self.ast, from: arg, to: local, to_ty: pointee };
            subst.visit_stmt(body).unwrap_or(body)
        };
        if let StmtKind::Block(stmts) = &mut self.ast.stmt_mut(new_body).kind {
            stmts.insert(0, init_stmt);
        }
        self.methods.get_mut(method).body = Some(new_body);
    }
}

/// Replaces every read of `from` with a read of `to`. Only pointer formal
/// args reach here, and shaders never take their address, so a plain
/// value substitution (no l-value/address-of handling) is exhaustive.
struct SubstituteVar<'a> {
    ast: &'a mut Ast,
    from: VarId,
    to: VarId,
    to_ty: crate::ids::TypeId,
}

impl<'a> Visitor for SubstituteVar<'a> {
    fn ast(&self) -> &Ast {
        self.ast
    }
    fn ast_mut(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_expr(&mut self, id: ExprId) -> Option<ExprId> {
        if let ExprKind::Var(v) = self.ast().expr(id).kind {
            if v == self.from {
                let location = self.ast().expr(id).location.clone();
                let to = self.to;
                let to_ty = self.to_ty;
                return Some(self.ast_mut().make_expr(ExprKind::Var(to), to_ty, location));
            }
        }
        // Fall through to the default dispatch for every other kind so
        // nested uses (inside a field access, a call argument, ...) are
        // still found.
        match self.ast().expr(id).kind.clone() {
            ExprKind::UnaryOp { op, operand } => self.visit_unary_op(id, op, operand),
            ExprKind::BinOp { op, lhs, rhs } => self.visit_bin_op(id, op, lhs, rhs),
            ExprKind::Cast { ty, expr } => self.visit_cast(id, ty, expr),
            ExprKind::Field { base, field_index } => self.visit_field(id, base, field_index),
            ExprKind::ArrayAccess { base, index } => self.visit_array_access(id, base, index),
            ExprKind::MethodCall { base, method, args } => self.visit_method_call(id, base, method, args),
            ExprKind::ListExpr { ty, elements } => self.visit_list_expr(id, ty, elements),
            _ => Some(id),
        }
    }
}

/// A class type reaching the shader boundary is only legal when it's one
/// of the native resource classes (`Buffer`, `Sampler`, ...); any other
/// class crossing into shader code is the shader-validator-fatal case.
pub fn is_shader_illegal_class(types: &TypeTable, ty: crate::ids::TypeId) -> bool {
    match types.as_class(ty) {
        Some(c) => !types.class(c).is_native,
        None => false,
    }
}
