//! Folds a constant expression down to the raw bytes its type would occupy
//! in memory, for static/const field initializers that must be known at
//! compile time rather than computed at load time.
//!
//! Folding failure is a signal, not a diagnostic: a caller that cannot
//! prove an expression constant falls back to runtime initialization
//! instead of reporting an error, so `fold` returns `Option<Vec<u8>>`
//! rather than threading a `Diagnostics` sink through.

use crate::ast::{Ast, BinOp, ExprKind, UnaryOp};
use crate::ids::ExprId;
use crate::types::{TypeKind, TypeTable};

pub struct ConstantFolder<'a> {
    ast: &'a Ast,
    types: &'a TypeTable,
}

impl<'a> ConstantFolder<'a> {
    pub fn new(ast: &'a Ast, types: &'a TypeTable) -> Self {
        ConstantFolder { ast, types }
    }

    /// Writes the folded value's bytes starting at `buffer[offset..]`,
    /// growing `buffer` as needed. Returns `false` (without partially
    /// applying a half-written value beyond `offset`) if any part of the
    /// expression isn't foldable.
    pub fn fold_into(&self, expr: ExprId, buffer: &mut Vec<u8>, offset: usize) -> bool {
        match self.fold(expr) {
            Some(bytes) => {
                if buffer.len() < offset + bytes.len() {
                    buffer.resize(offset + bytes.len(), 0);
                }
                buffer[offset..offset + bytes.len()].copy_from_slice(&bytes);
                true
            }
            None => false,
        }
    }

    pub fn fold(&self, expr: ExprId) -> Option<Vec<u8>> {
        let node = self.ast.expr(expr);
        match &node.kind {
            ExprKind::BoolConstant(b) => Some(vec![*b as u8]),
            ExprKind::IntConstant(v) => Some(self.write_integer(*v as i128, node.ty)),
            ExprKind::UintConstant(v) => Some(self.write_integer(*v as i128, node.ty)),
            ExprKind::FloatConstant(v) => Some(v.to_le_bytes().to_vec()),
            ExprKind::DoubleConstant(v) => Some(v.to_le_bytes().to_vec()),
            ExprKind::EnumConstant { value, .. } => Some(value.to_le_bytes().to_vec()),
            ExprKind::NullConstant => Some(vec![0u8; self.types.size_in_bytes(node.ty)]),
            ExprKind::ZeroInitializer { ty } => Some(vec![0u8; self.types.size_in_bytes(*ty)]),
            ExprKind::Cast { ty, expr: inner } => self.fold_cast(*inner, *ty),
            ExprKind::UnaryOp { op, operand } => self.fold_unary(*op, *operand),
            ExprKind::BinOp { op, lhs, rhs } => self.fold_bin_op(*op, *lhs, *rhs),
            ExprKind::ListExpr { elements, .. } => {
                let mut bytes = Vec::new();
                for &e in elements {
                    bytes.extend(self.fold(e)?);
                }
                Some(bytes)
            }
            _ => None,
        }
    }

    fn write_integer(&self, value: i128, ty: crate::ids::TypeId) -> Vec<u8> {
        let bits = match self.types.kind(ty) {
            TypeKind::Integer { bits, .. } => *bits,
            _ => 32,
        };
        match bits {
            8 => (value as i8).to_le_bytes().to_vec(),
            16 => (value as i16).to_le_bytes().to_vec(),
            32 => (value as i32).to_le_bytes().to_vec(),
            64 => (value as i64).to_le_bytes().to_vec(),
            _ => (value as i32).to_le_bytes().to_vec(),
        }
    }

    /// Casts are only foldable when they're transparent at the
    /// representation level: widening an integer/float, or reinterpreting
    /// between same-width integer signedness, but never a vector-to-scalar
    /// truncation or a pointer cast.
    fn fold_cast(&self, inner: ExprId, dst: crate::ids::TypeId) -> Option<Vec<u8>> {
        let src_ty = self.ast.expr(inner).ty;
        match (self.types.kind(src_ty).clone(), self.types.kind(dst).clone()) {
            (TypeKind::Integer { .. }, TypeKind::Integer { .. }) => {
                let value = self.fold_as_i128(inner)?;
                Some(self.write_integer(value, dst))
            }
            (TypeKind::Integer { signed, .. }, TypeKind::FloatingPoint { bits }) => {
                let value = self.fold_as_i128(inner)?;
                let f = if signed { value as f64 } else { (value as u64) as f64 };
                Some(if bits == 64 { f.to_le_bytes().to_vec() } else { (f as f32).to_le_bytes().to_vec() })
            }
            (TypeKind::FloatingPoint { .. }, TypeKind::FloatingPoint { bits }) => {
                let value = self.fold_as_f64(inner)?;
                Some(if bits == 64 { value.to_le_bytes().to_vec() } else { (value as f32).to_le_bytes().to_vec() })
            }
            _ => None,
        }
    }

    fn fold_as_i128(&self, expr: ExprId) -> Option<i128> {
        match &self.ast.expr(expr).kind {
            ExprKind::IntConstant(v) => Some(*v as i128),
            ExprKind::UintConstant(v) => Some(*v as i128),
            ExprKind::BoolConstant(b) => Some(*b as i128),
            _ => None,
        }
    }

    fn fold_as_f64(&self, expr: ExprId) -> Option<f64> {
        match &self.ast.expr(expr).kind {
            ExprKind::FloatConstant(v) => Some(*v as f64),
            ExprKind::DoubleConstant(v) => Some(*v),
            _ => None,
        }
    }

    fn fold_unary(&self, op: UnaryOp, operand: ExprId) -> Option<Vec<u8>> {
        let ty = self.ast.expr(operand).ty;
        if self.types.is_floating_point(ty) {
            let v = self.fold_as_f64(operand)?;
            let result = match op {
                UnaryOp::Negate => -v,
                _ => return None,
            };
            return Some(if self.types.is_double(ty) {
                result.to_le_bytes().to_vec()
            } else {
                (result as f32).to_le_bytes().to_vec()
            });
        }
        let v = self.fold_as_i128(operand)?;
        let result = match op {
            UnaryOp::Negate => -v,
            UnaryOp::BitwiseNot => !v,
            UnaryOp::LogicalNot => (v == 0) as i128,
            _ => return None,
        };
        Some(self.write_integer(result, ty))
    }

    fn fold_bin_op(&self, op: BinOp, lhs: ExprId, rhs: ExprId) -> Option<Vec<u8>> {
        let ty = self.ast.expr(lhs).ty;
        if self.types.is_floating_point(ty) {
            let l = self.fold_as_f64(lhs)?;
            let r = self.fold_as_f64(rhs)?;
            let result = match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                _ => return None,
            };
            return Some(if self.types.is_double(ty) {
                result.to_le_bytes().to_vec()
            } else {
                (result as f32).to_le_bytes().to_vec()
            });
        }
        let l = self.fold_as_i128(lhs)?;
        let r = self.fold_as_i128(rhs)?;
        let result = match op {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            BinOp::Div if r != 0 => l / r,
            BinOp::Mod if r != 0 => l % r,
            BinOp::BitwiseAnd => l & r,
            BinOp::BitwiseOr => l | r,
            BinOp::BitwiseXor => l ^ r,
            BinOp::LeftShift => l << r,
            BinOp::RightShift => l >> r,
            _ => return None,
        };
        Some(self.write_integer(result, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_location::FileLocation;

    #[test]
    fn folds_integer_addition() {
        let mut types = TypeTable::new();
        let mut ast = Ast::new();
        let int_ty = types.get_int();
        let lhs = ast.make_expr(ExprKind::IntConstant(2), int_ty, FileLocation::unknown());
        let rhs = ast.make_expr(ExprKind::IntConstant(3), int_ty, FileLocation::unknown());
        let sum = ast.make_expr(ExprKind::BinOp { op: BinOp::Add, lhs, rhs }, int_ty, FileLocation::unknown());
        let folder = ConstantFolder::new(&ast, &types);
        assert_eq!(folder.fold(sum), Some(5i32.to_le_bytes().to_vec()));
    }

    #[test]
    fn non_constant_subtree_fails_to_fold() {
        let mut types = TypeTable::new();
        let mut ast = Ast::new();
        let int_ty = types.get_int();
        let var = ast.make_expr(ExprKind::Var(crate::ids::VarId(0)), int_ty, FileLocation::unknown());
        let folder = ConstantFolder::new(&ast, &types);
        assert_eq!(folder.fold(var), None);
    }
}
