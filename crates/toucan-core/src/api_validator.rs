//! Validates that uses of the native resource classes (`Buffer`,
//! `BindGroup`, `RenderPipeline`, `ComputePipeline`, `RenderPass`,
//! `ComputePass`, ...) satisfy the graphics API's template and field
//! constraints, independent of whether the body ever runs on the GPU.
//!
//! Runs after the semantic pass, over fully resolved `New` expressions and
//! class-template instantiations of the native resource classes.

use crate::ast::{Arg, Ast, ExprKind};
use crate::error::Diagnostics;
use crate::file_location::FileLocation;
use crate::ids::{ClassId, ExprId};
use crate::native_class::{NativeClassKind, NativeClasses};
use crate::types::{Qualifiers, TypeKind, TypeTable};

pub struct ApiValidator<'a> {
    ast: &'a Ast,
    types: &'a TypeTable,
    native: &'a NativeClasses,
    diags: &'a Diagnostics,
}

impl<'a> ApiValidator<'a> {
    pub fn new(ast: &'a Ast, types: &'a TypeTable, native: &'a NativeClasses, diags: &'a Diagnostics) -> Self {
        ApiValidator { ast, types, native, diags }
    }

    fn error(&self, location: &FileLocation, message: impl Into<String>) {
        self.diags.error(location.clone(), message);
    }

    /// Entry point: walks every `New` expression and flags the ones that
    /// instantiate a native resource class with an invalid template
    /// argument or argument list.
    pub fn validate_expr(&self, expr: ExprId) {
        let node = self.ast.expr(expr);
        if let ExprKind::New { class, args } = &node.kind {
            if let Some(kind) = self.native.kind_of(*class) {
                self.validate_resource(kind, *class, args, &node.location);
            }
        }
    }

    fn validate_resource(&self, kind: NativeClassKind, class: ClassId, args: &[Arg], location: &FileLocation) {
        match kind {
            NativeClassKind::Buffer => self.validate_buffer(class, location),
            NativeClassKind::BindGroup => self.validate_bind_group(class, args, location),
            NativeClassKind::RenderPass => self.validate_render_pass(class, args, location),
            // `RenderPipeline`/`ComputePipeline` shader-stage membership
            // needs the method table, which this pass doesn't hold; the
            // driver calls `validate_pipeline_shader_stages` separately.
            _ => {}
        }
    }

    /// A `Buffer<T>` may carry exactly one of `Uniform`/`Storage`/`Vertex`/
    /// `Index`, never a combination, and the element type must be POD
    /// (nothing the GPU can't lay out deterministically). Each qualifier
    /// then carries its own further constraint on `T`.
    fn validate_buffer(&self, class: ClassId, location: &FileLocation) {
        let template_args = self.types.class(class).template_args.clone();
        let Some(&element_ty) = template_args.first() else {
            self.error(location, "Buffer requires an element type");
            return;
        };
        let (unqualified, qualifiers) = self.types.get_unqualified_type(element_ty);
        let storage_bits = qualifiers
            & (Qualifiers::UNIFORM | Qualifiers::STORAGE | Qualifiers::VERTEX | Qualifiers::INDEX);
        if storage_bits.bits().count_ones() > 1 {
            self.error(location, "Buffer may not combine Uniform/Storage/Vertex/Index qualifiers");
        }
        if !self.types.is_pod(unqualified) {
            self.error(location, "Buffer element type must be a plain-data type");
        }
        if self.types.contains_raw_ptr(unqualified) {
            self.error(location, "Buffer element type may not contain a raw pointer");
        }
        if qualifiers.contains(Qualifiers::VERTEX) {
            validate_vertex_attribute_type(self.types, unqualified, self.diags, location);
        }
        if qualifiers.contains(Qualifiers::INDEX) && !self.types.is_uint(unqualified) && !self.types.is_ushort(unqualified) {
            self.error(location, "Index buffer element type must be uint or ushort");
        }
        if qualifiers.contains(Qualifiers::UNIFORM) && self.types.contains_unsized_array(unqualified) {
            self.error(location, "Uniform buffer element type may not contain a runtime-sized array");
        }
    }

    /// A `BindGroup` argument list must be all native resource types
    /// (buffers, samplers, sampleable textures); class templates other
    /// than those are rejected outright.
    fn validate_bind_group(&self, _class: ClassId, args: &[Arg], location: &FileLocation) {
        for arg in args {
            let ty = self.ast.expr(arg.value).ty;
            let (unqualified, _) = self.types.get_unqualified_type(ty);
            let is_resource = self
                .types
                .as_class(unqualified)
                .map(|c| self.native.is_resource_class(c))
                .unwrap_or(false);
            if !is_resource {
                self.error(location, "BindGroup entries must be native resource types");
            }
        }
    }

    /// Every `RenderPipeline` must declare both a vertex and a fragment
    /// shader method; a pipeline with only one is the spec's canonical
    /// "missing fragment shader" diagnostic.
    pub fn validate_pipeline_shader_stages(
        &self,
        class: ClassId,
        methods: &crate::semantic::MethodTable,
        location: &FileLocation,
    ) {
        let method_ids = self.types.class(class).methods.clone();
        let has_vertex = method_ids.iter().any(|&m| methods.get(m).shader_type == crate::types::ShaderType::Vertex);
        let has_fragment =
            method_ids.iter().any(|&m| methods.get(m).shader_type == crate::types::ShaderType::Fragment);
        if !has_vertex {
            self.error(location, "RenderPipeline is missing a vertex shader method");
        }
        if !has_fragment {
            self.error(location, "RenderPipeline is missing a fragment shader method");
        }
    }

    /// Each `ColorAttachment`/`DepthStencilAttachment` argument to
    /// `RenderPass` must reference a sampleable/renderable texture
    /// qualifier, not an arbitrary class.
    fn validate_render_pass(&self, _class: ClassId, args: &[Arg], location: &FileLocation) {
        for arg in args {
            let ty = self.ast.expr(arg.value).ty;
            let (unqualified, _) = self.types.get_unqualified_type(ty);
            let ok = self
                .types
                .as_class(unqualified)
                .and_then(|c| self.native.kind_of(c))
                .map(|k| matches!(k, NativeClassKind::ColorAttachment | NativeClassKind::DepthStencilAttachment))
                .unwrap_or(false);
            if !ok {
                self.error(location, "RenderPass attachments must be ColorAttachment/DepthStencilAttachment");
            }
        }
    }
}

/// Checks a fully laid-out `TypeKind::Vector` used as a vertex attribute
/// against the set the host API actually accepts: no `double`-based
/// vectors, since GPU vertex fetch never widens 64-bit components.
pub fn validate_vertex_attribute_type(types: &TypeTable, ty: crate::ids::TypeId, diags: &Diagnostics, location: &FileLocation) {
    if let TypeKind::Vector { component, .. } = types.kind(ty) {
        if types.is_double(*component) {
            diags.error(location.clone(), "vertex attributes may not use double-precision components");
        }
    }
}
