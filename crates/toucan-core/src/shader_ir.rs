//! Emits a stack-based, typed IR for a shader entry point's resolved body.
//!
//! One emitted instruction corresponds to one IR-level operation (push a
//! constant, load a variable, call an intrinsic, branch); the emitter's
//! job is purely translation; it assumes the semantic pass and shader
//! preparation already rejected anything the device side can't run.

use crate::ast::{Arg, Ast, BinOp, ExprKind, StmtKind, UnaryOp, VarTable};
use crate::ids::{ExprId, MethodId, StmtId, VarId};
use crate::native_class::{NativeClassKind, NativeClasses};
use crate::semantic::MethodTable;
use crate::shader_prep::ShaderInterface;
use crate::types::{ShaderType, TypeTable};

/// Execution-model-specific header a consumer needs before it can make
/// sense of a module's op stream: which pipeline stage it runs at, and
/// (for compute) the literal workgroup size carried on the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModel {
    Vertex,
    Fragment,
    Compute { workgroup_size: [u32; 3] },
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrOp {
    PushBool(bool),
    PushInt(i64),
    PushUint(u64),
    PushFloat(f32),
    PushDouble(f64),
    Load(VarId),
    Store(VarId),
    LoadField(usize),
    StoreField(usize),
    LoadIndex,
    StoreIndex,
    Swizzle(Vec<u8>),
    Cast(crate::ids::TypeId),
    Unary(UnaryOp),
    Binary(BinOp),
    CallIntrinsic(String, usize),
    CallFunction(MethodId, usize),
    Construct(crate::ids::TypeId, usize),
    SampleTexture,
    Branch { then_len: usize, else_len: usize },
    Loop { cond_len: usize, body_len: usize },
    Return(bool),
    Pop,
}

#[derive(Debug)]
pub struct ShaderModule {
    pub execution_model: ExecutionModel,
    pub interface: ShaderInterface,
    pub ops: Vec<IrOp>,
}

pub struct ShaderIrEmitter<'a> {
    ast: &'a Ast,
    vars: &'a VarTable,
    types: &'a TypeTable,
    methods: &'a MethodTable,
    native: &'a NativeClasses,
}

impl<'a> ShaderIrEmitter<'a> {
    pub fn new(
        ast: &'a Ast,
        vars: &'a VarTable,
        types: &'a TypeTable,
        methods: &'a MethodTable,
        native: &'a NativeClasses,
    ) -> Self {
        ShaderIrEmitter { ast, vars, types, methods, native }
    }

    pub fn emit_method(&self, method: MethodId, interface: ShaderInterface) -> ShaderModule {
        let m = self.methods.get(method);
        let execution_model = match m.shader_type {
            ShaderType::Vertex => ExecutionModel::Vertex,
            ShaderType::Fragment => ExecutionModel::Fragment,
            ShaderType::Compute => ExecutionModel::Compute { workgroup_size: m.workgroup_size },
            ShaderType::None => ExecutionModel::Fragment,
        };
        let mut ops = Vec::new();
        if let Some(body) = m.body {
            self.emit_stmt(body, &mut ops);
        }
        ShaderModule { execution_model, interface, ops }
    }

    fn emit_stmt(&self, id: StmtId, ops: &mut Vec<IrOp>) {
        match &self.ast.stmt(id).kind {
            StmtKind::Block(stmts) => {
                for &s in stmts {
                    self.emit_stmt(s, ops);
                }
            }
            StmtKind::Expr(e) => {
                self.emit_expr(*e, ops);
                ops.push(IrOp::Pop);
            }
            StmtKind::VarDecl(decl) => {
                if let Some(init) = decl.initializer {
                    self.emit_expr(init, ops);
                    ops.push(IrOp::Store(decl.var));
                }
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.emit_expr(*cond, ops);
                let mut then_ops = Vec::new();
                self.emit_stmt(*then_branch, &mut then_ops);
                let mut else_ops = Vec::new();
                if let Some(e) = else_branch {
                    self.emit_stmt(*e, &mut else_ops);
                }
                ops.push(IrOp::Branch { then_len: then_ops.len(), else_len: else_ops.len() });
                ops.extend(then_ops);
                ops.extend(else_ops);
            }
            StmtKind::While { cond, body } => {
                let mut cond_ops = Vec::new();
                self.emit_expr(*cond, &mut cond_ops);
                let mut body_ops = Vec::new();
                self.emit_stmt(*body, &mut body_ops);
                ops.push(IrOp::Loop { cond_len: cond_ops.len(), body_len: body_ops.len() });
                ops.extend(cond_ops);
                ops.extend(body_ops);
            }
            StmtKind::DoWhile { cond, body } => {
                let mut body_ops = Vec::new();
                self.emit_stmt(*body, &mut body_ops);
                let mut cond_ops = Vec::new();
                self.emit_expr(*cond, &mut cond_ops);
                ops.push(IrOp::Loop { cond_len: cond_ops.len(), body_len: body_ops.len() });
                ops.extend(cond_ops);
                ops.extend(body_ops);
            }
            StmtKind::For { init, cond, incr, body } => {
                if let Some(i) = init {
                    self.emit_stmt(*i, ops);
                }
                let mut cond_ops = Vec::new();
                if let Some(c) = cond {
                    self.emit_expr(*c, &mut cond_ops);
                }
                let mut body_ops = Vec::new();
                self.emit_stmt(*body, &mut body_ops);
                if let Some(incr_expr) = incr {
                    self.emit_expr(*incr_expr, &mut body_ops);
                    body_ops.push(IrOp::Pop);
                }
                ops.push(IrOp::Loop { cond_len: cond_ops.len(), body_len: body_ops.len() });
                ops.extend(cond_ops);
                ops.extend(body_ops);
            }
            StmtKind::Return(value) => {
                if let Some(v) = value {
                    self.emit_expr(*v, ops);
                }
                ops.push(IrOp::Return(value.is_some()));
            }
            StmtKind::Destructors(_) => {
                // Destruction on a shader entry point is a host-side
                // concept (reference counts, heap deallocation); neither
                // applies on the device, so these are no-ops in IR.
            }
            StmtKind::Break | StmtKind::Continue => {}
        }
    }

    fn emit_expr(&self, id: ExprId, ops: &mut Vec<IrOp>) {
        match &self.ast.expr(id).kind {
            ExprKind::BoolConstant(b) => ops.push(IrOp::PushBool(*b)),
            ExprKind::IntConstant(v) => ops.push(IrOp::PushInt(*v)),
            ExprKind::UintConstant(v) => ops.push(IrOp::PushUint(*v)),
            ExprKind::FloatConstant(v) => ops.push(IrOp::PushFloat(*v)),
            ExprKind::DoubleConstant(v) => ops.push(IrOp::PushDouble(*v)),
            ExprKind::EnumConstant { value, .. } => ops.push(IrOp::PushInt(*value as i64)),
            ExprKind::NullConstant => ops.push(IrOp::PushInt(0)),
            ExprKind::Var(v) => ops.push(IrOp::Load(*v)),
            ExprKind::UnaryOp { op, operand } => {
                self.emit_expr(*operand, ops);
                ops.push(IrOp::Unary(*op));
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                if op.is_assignment() {
                    self.emit_store_base(*lhs, ops);
                    self.emit_expr(*rhs, ops);
                    self.emit_store(*lhs, ops);
                } else {
                    self.emit_expr(*lhs, ops);
                    self.emit_expr(*rhs, ops);
                    ops.push(IrOp::Binary(*op));
                }
            }
            ExprKind::Cast { ty, expr } => {
                self.emit_expr(*expr, ops);
                ops.push(IrOp::Cast(*ty));
            }
            ExprKind::Field { base, field_index } => {
                self.emit_expr(*base, ops);
                ops.push(IrOp::LoadField(*field_index));
            }
            ExprKind::ArrayAccess { base, index } => {
                self.emit_expr(*base, ops);
                self.emit_expr(*index, ops);
                ops.push(IrOp::LoadIndex);
            }
            ExprKind::Swizzle { base, indices } => {
                self.emit_expr(*base, ops);
                ops.push(IrOp::Swizzle(indices.to_vec()));
            }
            ExprKind::MethodCall { base, method, args } => self.emit_method_call(*base, *method, args, ops),
            ExprKind::New { args, .. } => {
                for arg in args {
                    self.emit_expr(arg.value, ops);
                }
                ops.push(IrOp::Construct(self.ast.expr(id).ty, args.len()));
            }
            ExprKind::ListExpr { ty, elements } => {
                for &e in elements {
                    self.emit_expr(e, ops);
                }
                ops.push(IrOp::Construct(*ty, elements.len()));
            }
            ExprKind::ZeroInitializer { ty } => ops.push(IrOp::Construct(*ty, 0)),
            ExprKind::StaticVar { .. } => ops.push(IrOp::PushInt(0)),
            _ => {}
        }
    }

    /// Pushes the base/index operands a field or array store needs
    /// *before* the value, so `emit_store` can emit the matching
    /// `StoreField`/`StoreIndex` after the value lands on top. A plain
    /// `Var` target needs nothing pushed up front.
    fn emit_store_base(&self, lhs: ExprId, ops: &mut Vec<IrOp>) {
        match &self.ast.expr(lhs).kind {
            ExprKind::Field { base, .. } => self.emit_expr(*base, ops),
            ExprKind::ArrayAccess { base, index } => {
                self.emit_expr(*base, ops);
                self.emit_expr(*index, ops);
            }
            ExprKind::Swizzle { base, .. } => self.emit_expr(*base, ops),
            _ => {}
        }
    }

    fn emit_store(&self, lhs: ExprId, ops: &mut Vec<IrOp>) {
        match &self.ast.expr(lhs).kind {
            ExprKind::Var(v) => ops.push(IrOp::Store(*v)),
            ExprKind::Field { field_index, .. } => ops.push(IrOp::StoreField(*field_index)),
            ExprKind::ArrayAccess { .. } => ops.push(IrOp::StoreIndex),
            ExprKind::Swizzle { indices, .. } => ops.push(IrOp::Swizzle(indices.to_vec())),
            _ => {}
        }
    }

    /// `Math.*` calls recognized as IR intrinsics rather than ordinary
    /// function calls (`Sample` in particular turns into `SampleTexture`
    /// rather than a generic intrinsic, since it also consumes the
    /// texture/sampler operands already pushed as `base`/`args`).
    fn emit_method_call(&self, base: Option<ExprId>, method: MethodId, args: &[Arg], ops: &mut Vec<IrOp>) {
        let m = self.methods.get(method);
        let is_math = self.native.get(NativeClassKind::Math) == Some(m.class);
        if let Some(b) = base {
            self.emit_expr(b, ops);
        }
        for arg in args {
            self.emit_expr(arg.value, ops);
        }
        if is_math {
            if m.name == "sample" {
                ops.push(IrOp::SampleTexture);
            } else {
                ops.push(IrOp::CallIntrinsic(m.name.clone(), args.len()));
            }
        } else {
            ops.push(IrOp::CallFunction(method, args.len() + base.is_some() as usize));
        }
    }
}
