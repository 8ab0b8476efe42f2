//! Shared helper for passes that rewrite the AST: tracks "the location we'd
//! blame if something synthesized here needs a diagnostic" so a pass never
//! has to thread a location argument through every helper by hand.

use crate::ast::Ast;
use crate::file_location::FileLocation;
use crate::ids::{ExprId, StmtId, TypeId};

/// Owns the `Ast` arena plus the "current location" a pass is visiting.
/// `enter` pushes a new current location for the duration of a closure and
/// restores the previous one afterward, mirroring `ScopedFileLocation`.
pub struct RewriteContext<'ast> {
    pub ast: &'ast mut Ast,
    pub current_location: FileLocation,
}

impl<'ast> RewriteContext<'ast> {
    pub fn new(ast: &'ast mut Ast) -> Self {
        RewriteContext { ast, current_location: FileLocation::unknown() }
    }

    pub fn enter<T>(&mut self, location: FileLocation, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.current_location, location);
        let result = f(self);
        self.current_location = previous;
        result
    }

    pub fn make_expr(&mut self, kind: crate::ast::ExprKind, ty: TypeId) -> ExprId {
        self.ast.make_expr(kind, ty, self.current_location.clone())
    }

    pub fn make_stmt(&mut self, kind: crate::ast::StmtKind) -> StmtId {
        self.ast.make_stmt(kind, self.current_location.clone())
    }
}
