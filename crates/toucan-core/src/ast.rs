//! The expression/statement arena and the visitor trait that walks it.
//!
//! Every expression and statement lives in one of two flat `Vec`s owned by
//! an `Ast`; nodes refer to children by `ExprId`/`StmtId` rather than by
//! owning them directly, so a pass that rewrites a subtree allocates new
//! nodes and returns a fresh handle instead of mutating in place. This is
//! the copy/rewrite discipline every later pass follows: a `Visitor`
//! returns the (possibly identical) handle to use in the parent.

use smallvec::SmallVec;

use crate::file_location::FileLocation;
use crate::ids::{ClassId, ExprId, MethodId, StmtId, TypeId, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitwiseNot,
    AddressOf,
    Deref,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LeftShift,
    RightShift,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LogicalAnd,
    LogicalOr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl BinOp {
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinOp::Assign
                | BinOp::AddAssign
                | BinOp::SubAssign
                | BinOp::MulAssign
                | BinOp::DivAssign
                | BinOp::ModAssign
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne)
    }
}

#[derive(Debug, Clone)]
pub struct Arg {
    pub name: Option<String>,
    pub value: ExprId,
}

/// One swizzle channel, `x`/`y`/`z`/`w` (or `r`/`g`/`b`/`a`) parsed down to
/// a component index 0..=3.
pub type SwizzleIndices = SmallVec<[u8; 4]>;

#[derive(Debug, Clone)]
pub enum ExprKind {
    BoolConstant(bool),
    IntConstant(i64),
    UintConstant(u64),
    DoubleConstant(f64),
    FloatConstant(f32),
    EnumConstant { ty: TypeId, value: i32 },
    NullConstant,

    Var(VarId),

    UnaryOp { op: UnaryOp, operand: ExprId },
    BinOp { op: BinOp, lhs: ExprId, rhs: ExprId },
    Cast { ty: TypeId, expr: ExprId },
    Smear { ty: TypeId, expr: ExprId },

    Field { base: ExprId, field_index: usize },
    ArrayAccess { base: ExprId, index: ExprId },
    Swizzle { base: ExprId, indices: SwizzleIndices },

    MethodCall { base: Option<ExprId>, method: MethodId, args: Vec<Arg> },
    New { class: ClassId, args: Vec<Arg> },
    ListExpr { ty: TypeId, elements: Vec<ExprId> },
    ZeroInitializer { ty: TypeId },

    StaticVar { class: ClassId, field_index: usize },

    // Unresolved variants produced by the parser; the semantic pass
    // replaces every one of these with a resolved kind above, so none
    // may survive past that pass.
    UnresolvedIdentifier(String),
    UnresolvedDot { base: ExprId, id: String },
    UnresolvedStaticDot { scope: TypeId, id: String },
    UnresolvedMethodCall { base: ExprId, id: String, args: Vec<Arg> },
    UnresolvedStaticMethodCall { scope: TypeId, id: String, args: Vec<Arg> },
    UnresolvedNewExpr { ty: TypeId, args: Vec<Arg> },
    UnresolvedInitializer { ty: Option<TypeId>, args: Vec<Arg> },
    UnresolvedListExpr { elements: Vec<ExprId> },
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub location: FileLocation,
}

#[derive(Debug, Clone)]
pub struct VarDeclStmt {
    pub var: VarId,
    pub initializer: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(ExprId),
    VarDecl(VarDeclStmt),
    Block(Vec<StmtId>),
    If { cond: ExprId, then_branch: StmtId, else_branch: Option<StmtId> },
    While { cond: ExprId, body: StmtId },
    DoWhile { cond: ExprId, body: StmtId },
    For { init: Option<StmtId>, cond: Option<ExprId>, incr: Option<ExprId>, body: StmtId },
    Return(Option<ExprId>),
    Break,
    Continue,
    /// Synthesized by the semantic pass on scope exit; never produced by a
    /// parser. Calls `Destroy` on each listed var, reverse declaration
    /// order.
    Destructors(Vec<VarId>),
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: FileLocation,
}

/// Append-only storage for every expression and statement produced in a
/// compilation unit. Handles into this arena remain valid for the whole
/// compile; nothing is ever removed, only superseded by a newer handle
/// returned from a rewrite pass.
#[derive(Default)]
pub struct Ast {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn make_expr(&mut self, kind: ExprKind, ty: TypeId, location: FileLocation) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr { kind, ty, location });
        id
    }

    pub fn make_stmt(&mut self, kind: StmtKind, location: FileLocation) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt { kind, location });
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }
    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }
    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()]
    }
}

#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub ty: TypeId,
    pub is_formal_arg: bool,
    pub location: FileLocation,
}

/// Storage for every declared variable and formal argument, addressed by
/// `VarId`. Kept separate from `Ast` because vars are referenced from both
/// `types::Method` (formal args) and expressions (`ExprKind::Var`), and
/// neither owns the other.
#[derive(Default)]
pub struct VarTable {
    vars: Vec<Var>,
}

impl VarTable {
    pub fn new() -> Self {
        VarTable::default()
    }

    pub fn make_var(&mut self, name: &str, ty: TypeId, is_formal_arg: bool, location: FileLocation) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Var { name: name.to_string(), ty, is_formal_arg, location });
        id
    }

    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }
    pub fn var_mut(&mut self, id: VarId) -> &mut Var {
        &mut self.vars[id.index()]
    }
}

/// Visits an `Ast` node and returns a (possibly new) handle for its
/// replacement. Each `visit_*` method has a default that recurses into
/// children and rebuilds the node unchanged; passes override only the
/// variants they care about. This mirrors the copy/rewrite visitor used
/// throughout the original passes: nothing is mutated in place, every
/// visit either returns the same handle or allocates a new node.
pub trait Visitor {
    fn ast(&self) -> &Ast;
    fn ast_mut(&mut self) -> &mut Ast;

    fn visit_expr(&mut self, id: ExprId) -> Option<ExprId> {
        let kind = self.ast().expr(id).kind.clone();
        match kind {
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

    fn visit_unary_op(&mut self, id: ExprId, op: UnaryOp, operand: ExprId) -> Option<ExprId> {
        let new_operand = self.visit_expr(operand)?;
        if new_operand == operand {
            return Some(id);
        }
        let ty = self.ast().expr(id).ty;
        let location = self.ast().expr(id).location.clone();
        Some(self.ast_mut().make_expr(ExprKind::UnaryOp { op, operand: new_operand }, ty, location))
    }

    fn visit_bin_op(&mut self, id: ExprId, op: BinOp, lhs: ExprId, rhs: ExprId) -> Option<ExprId> {
        let new_lhs = self.visit_expr(lhs)?;
        let new_rhs = self.visit_expr(rhs)?;
        if new_lhs == lhs && new_rhs == rhs {
            return Some(id);
        }
        let ty = self.ast().expr(id).ty;
        let location = self.ast().expr(id).location.clone();
        Some(self.ast_mut().make_expr(ExprKind::BinOp { op, lhs: new_lhs, rhs: new_rhs }, ty, location))
    }

    fn visit_cast(&mut self, id: ExprId, ty: TypeId, expr: ExprId) -> Option<ExprId> {
        let new_expr = self.visit_expr(expr)?;
        if new_expr == expr {
            return Some(id);
        }
        let location = self.ast().expr(id).location.clone();
        Some(self.ast_mut().make_expr(ExprKind::Cast { ty, expr: new_expr }, ty, location))
    }

    fn visit_field(&mut self, id: ExprId, base: ExprId, field_index: usize) -> Option<ExprId> {
        let new_base = self.visit_expr(base)?;
        if new_base == base {
            return Some(id);
        }
        let ty = self.ast().expr(id).ty;
        let location = self.ast().expr(id).location.clone();
        Some(self.ast_mut().make_expr(ExprKind::Field { base: new_base, field_index }, ty, location))
    }

    fn visit_array_access(&mut self, id: ExprId, base: ExprId, index: ExprId) -> Option<ExprId> {
        let new_base = self.visit_expr(base)?;
        let new_index = self.visit_expr(index)?;
        if new_base == base && new_index == index {
            return Some(id);
        }
        let ty = self.ast().expr(id).ty;
        let location = self.ast().expr(id).location.clone();
        Some(self.ast_mut().make_expr(ExprKind::ArrayAccess { base: new_base, index: new_index }, ty, location))
    }

    fn visit_method_call(
        &mut self,
        id: ExprId,
        base: Option<ExprId>,
        method: MethodId,
        args: Vec<Arg>,
    ) -> Option<ExprId> {
        let new_base = match base { Some(b) => Some(self.visit_expr(b)?), None => None };
        let mut new_args = Vec::with_capacity(args.len());
        let mut changed = new_base != base;
        for arg in &args {
            let new_value = self.visit_expr(arg.value)?;
            changed |= new_value != arg.value;
            new_args.push(Arg { name: arg.name.clone(), value: new_value });
        }
        if !changed {
            return Some(id);
        }
        let ty = self.ast().expr(id).ty;
        let location = self.ast().expr(id).location.clone();
        Some(self.ast_mut().make_expr(
            ExprKind::MethodCall { base: new_base, method, args: new_args },
            ty,
            location,
        ))
    }

    fn visit_list_expr(&mut self, id: ExprId, ty: TypeId, elements: Vec<ExprId>) -> Option<ExprId> {
        let mut new_elements = Vec::with_capacity(elements.len());
        let mut changed = false;
        for e in &elements {
            let new_e = self.visit_expr(*e)?;
            changed |= new_e != *e;
            new_elements.push(new_e);
        }
        if !changed {
            return Some(id);
        }
        let location = self.ast().expr(id).location.clone();
        Some(self.ast_mut().make_expr(ExprKind::ListExpr { ty, elements: new_elements }, ty, location))
    }

    fn visit_stmt(&mut self, id: StmtId) -> Option<StmtId> {
        let kind = self.ast().stmt(id).kind.clone();
        match kind {
            StmtKind::Expr(e) => self.visit_expr_stmt(id, e),
            StmtKind::VarDecl(decl) => self.visit_var_decl_stmt(id, decl),
            StmtKind::Block(stmts) => self.visit_block(id, stmts),
            StmtKind::If { cond, then_branch, else_branch } => {
                self.visit_if(id, cond, then_branch, else_branch)
            }
            StmtKind::While { cond, body } => self.visit_while(id, cond, body),
            StmtKind::DoWhile { cond, body } => self.visit_do_while(id, cond, body),
            StmtKind::For { init, cond, incr, body } => self.visit_for(id, init, cond, incr, body),
            StmtKind::Return(value) => self.visit_return(id, value),
            _ => Some(id),
        }
    }

    fn visit_expr_stmt(&mut self, id: StmtId, e: ExprId) -> Option<StmtId> {
        let new_e = self.visit_expr(e)?;
        if new_e == e {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(StmtKind::Expr(new_e), location))
    }

    fn visit_var_decl_stmt(&mut self, id: StmtId, decl: VarDeclStmt) -> Option<StmtId> {
        let new_init = match decl.initializer { Some(e) => Some(self.visit_expr(e)?), None => None };
        if new_init == decl.initializer {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(
            StmtKind::VarDecl(VarDeclStmt { var: decl.var, initializer: new_init }),
            location,
        ))
    }

    fn visit_block(&mut self, id: StmtId, stmts: Vec<StmtId>) -> Option<StmtId> {
        let mut new_stmts = Vec::with_capacity(stmts.len());
        let mut changed = false;
        for s in &stmts {
            let new_s = self.visit_stmt(*s)?;
            changed |= new_s != *s;
            new_stmts.push(new_s);
        }
        if !changed {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(StmtKind::Block(new_stmts), location))
    }

    fn visit_if(
        &mut self,
        id: StmtId,
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    ) -> Option<StmtId> {
        let new_cond = self.visit_expr(cond)?;
        let new_then = self.visit_stmt(then_branch)?;
        let new_else = match else_branch { Some(s) => Some(self.visit_stmt(s)?), None => None };
        if new_cond == cond && new_then == then_branch && new_else == else_branch {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(
            StmtKind::If { cond: new_cond, then_branch: new_then, else_branch: new_else },
            location,
        ))
    }

    fn visit_while(&mut self, id: StmtId, cond: ExprId, body: StmtId) -> Option<StmtId> {
        let new_cond = self.visit_expr(cond)?;
        let new_body = self.visit_stmt(body)?;
        if new_cond == cond && new_body == body {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(StmtKind::While { cond: new_cond, body: new_body }, location))
    }

    fn visit_do_while(&mut self, id: StmtId, cond: ExprId, body: StmtId) -> Option<StmtId> {
        let new_cond = self.visit_expr(cond)?;
        let new_body = self.visit_stmt(body)?;
        if new_cond == cond && new_body == body {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(StmtKind::DoWhile { cond: new_cond, body: new_body }, location))
    }

    fn visit_for(
        &mut self,
        id: StmtId,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        incr: Option<ExprId>,
        body: StmtId,
    ) -> Option<StmtId> {
        let new_init = match init { Some(s) => Some(self.visit_stmt(s)?), None => None };
        let new_cond = match cond { Some(e) => Some(self.visit_expr(e)?), None => None };
        let new_incr = match incr { Some(e) => Some(self.visit_expr(e)?), None => None };
        let new_body = self.visit_stmt(body)?;
        if new_init == init && new_cond == cond && new_incr == incr && new_body == body {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(
            StmtKind::For { init: new_init, cond: new_cond, incr: new_incr, body: new_body },
            location,
        ))
    }

    fn visit_return(&mut self, id: StmtId, value: Option<ExprId>) -> Option<StmtId> {
        let new_value = match value { Some(e) => Some(self.visit_expr(e)?), None => None };
        if new_value == value {
            return Some(id);
        }
        let location = self.ast().stmt(id).location.clone();
        Some(self.ast_mut().make_stmt(StmtKind::Return(new_value), location))
    }
}
