//! Initial population of the root symbol scope and type table: primitive
//! type names, vector/matrix aliases, and the native class registry.
//!
//! Runs once before any user source is parsed so every later pass can
//! assume `int`, `float4`, `Buffer`, `Math`, and friends already resolve.

use crate::ids::ClassId;
use crate::native_class::{NativeClassKind, NativeClasses};
use crate::scope::SymbolScopeStack;
use crate::types::{MethodModifiers, Qualifiers, TypeTable};

pub struct Builtins {
    pub native_classes: NativeClasses,
    pub native_method_sigs: Vec<NativeMethodSig>,
}

fn bind_primitive(scope: &mut SymbolScopeStack, types: &mut TypeTable, name: &str, ty: crate::ids::TypeId) {
    let _ = types;
    scope.bind_type(name, ty);
}

/// Registers `int`/`uint`/`float`/... plus every `<base><N>` vector and
/// `<base><N>x<M>` matrix alias in the 2..=4 range, matching the literal
/// spelling the parser recognizes.
fn register_numeric_family(scope: &mut SymbolScopeStack, types: &mut TypeTable, base: &str, scalar: crate::ids::TypeId) {
    bind_primitive(scope, types, base, scalar);
    for len in 2..=4u8 {
        if let Some(vec_ty) = types.get_vector(scalar, len) {
            scope.bind_type(&format!("{base}{len}"), vec_ty);
            for columns in 2..=4u8 {
                if let Some(mat_ty) = types.get_matrix(vec_ty, columns) {
                    scope.bind_type(&format!("{base}{len}x{columns}"), mat_ty);
                }
            }
        }
    }
}

fn make_native_class(types: &mut TypeTable, scope: &mut SymbolScopeStack, name: &str) -> ClassId {
    let class = types.make_class(name);
    types.class_mut(class).is_defined = true;
    let ty = types.class_type_id(class);
    scope.bind_type(name, ty);
    class
}

/// Records the name (and implied signature) of a native method a class is
/// expected to expose. The method itself is allocated into the shared
/// method table by `semantic::register_native_methods`, which runs after
/// builtin installation once that table exists; this list is what it reads.
pub struct NativeMethodSig {
    pub class: ClassId,
    pub name: &'static str,
    pub return_type: crate::ids::TypeId,
    pub modifiers: MethodModifiers,
}

pub fn install(types: &mut TypeTable, scope: &mut SymbolScopeStack) -> Builtins {
    let bool_ty = types.get_bool();
    bind_primitive(scope, types, "bool", bool_ty);
    bind_primitive(scope, types, "void", types.get_void());
    bind_primitive(scope, types, "auto", types.get_auto());
    bind_primitive(scope, types, "string", types.get_string());

    let byte = types.get_byte();
    let ubyte = types.get_ubyte();
    let short = types.get_short();
    let ushort = types.get_ushort();
    let int = types.get_int();
    let uint = types.get_uint();
    let float = types.get_float();
    let double = types.get_double();

    register_numeric_family(scope, types, "byte", byte);
    register_numeric_family(scope, types, "ubyte", ubyte);
    register_numeric_family(scope, types, "short", short);
    register_numeric_family(scope, types, "ushort", ushort);
    register_numeric_family(scope, types, "int", int);
    register_numeric_family(scope, types, "uint", uint);
    register_numeric_family(scope, types, "float", float);
    register_numeric_family(scope, types, "double", double);

    for len in 2..=4u8 {
        if let Some(vec_ty) = types.get_vector(bool_ty, len) {
            scope.bind_type(&format!("bool{len}"), vec_ty);
        }
    }

    let mut native_classes = NativeClasses::new();
    for kind in NativeClassKind::ALL {
        let class = make_native_class(types, scope, kind.name());
        if kind.is_template() {
            let arg = types.get_formal_template_arg("T");
            types.class_mut(class).is_template = true;
            types.class_mut(class).formal_template_args.push(arg);
        }
        native_classes.register(*kind, class, types);
    }

    let mut native_method_sigs = Vec::new();
    if let Some(math) = native_classes.get(NativeClassKind::Math) {
        for name in ["sqrt", "sin", "cos", "abs", "min", "max", "dot", "normalize", "cross", "sample"] {
            native_method_sigs.push(NativeMethodSig {
                class: math,
                name,
                return_type: float,
                modifiers: MethodModifiers::STATIC,
            });
        }
    }

    if let Some(buffer) = native_classes.get(NativeClassKind::Buffer) {
        types.class_mut(buffer).memory_layout = crate::types::MemoryLayout::Storage;
        let _ = Qualifiers::STORAGE;
    }

    Builtins { native_classes, native_method_sigs }
}
