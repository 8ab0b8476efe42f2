//! Handle types shared across the type table and the AST arena.
//!
//! Every type, class, enum, method, variable and AST node lives in an
//! append-only `Vec` owned by its table; code elsewhere only ever holds a
//! small `Copy` index into that `Vec`. This is the "arena + indices"
//! re-expression of the pointer-heavy original: cyclic references (a class
//! pointing at methods that point back at the owning class) are just two
//! plain integers instead of raw pointers, and nothing ever dangles because
//! the backing storage outlives every handle derived from it.

use std::fmt;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(TypeId);
define_id!(ClassId);
define_id!(EnumId);
define_id!(MethodId);
define_id!(VarId);
define_id!(ExprId);
define_id!(StmtId);
