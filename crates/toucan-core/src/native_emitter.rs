//! Native (CPU-target) code generation boundary.
//!
//! Lowering a resolved method body to native machine code is owned by an
//! external IR builder collaborator (an LLVM-style backend); this module
//! only describes the boundary that collaborator implements, so the rest
//! of the crate can depend on a trait rather than a concrete backend.
//! No concrete implementation ships here — the native backend is out of
//! scope for the front-end and mid-end this crate covers.

use crate::ids::MethodId;
use crate::semantic::MethodTable;
use crate::types::TypeTable;

/// What a native backend needs handed to it to emit one resolved method:
/// the method id to look up its signature/body, plus the shared type and
/// method tables so it can walk the AST on its own. Kept deliberately
/// narrow; anything a backend needs beyond this is its own concern.
pub trait NativeEmitter {
    type Output;
    type Error;

    fn emit_method(&mut self, method: MethodId, types: &TypeTable, methods: &MethodTable) -> Result<Self::Output, Self::Error>;
}

/// Placeholder backend used when no real native emitter is wired in; every
/// call reports unimplemented rather than silently producing empty output.
#[derive(Default)]
pub struct UnimplementedNativeEmitter;

#[derive(Debug, thiserror::Error)]
#[error("native code generation is not implemented for method {0:?}")]
pub struct NativeEmitterUnimplemented(pub MethodId);

impl NativeEmitter for UnimplementedNativeEmitter {
    type Output = ();
    type Error = NativeEmitterUnimplemented;

    fn emit_method(&mut self, method: MethodId, _types: &TypeTable, _methods: &MethodTable) -> Result<(), NativeEmitterUnimplemented> {
        Err(NativeEmitterUnimplemented(method))
    }
}
