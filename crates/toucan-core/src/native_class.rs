//! Registry of native classes: types the language surfaces to user code but
//! whose behavior is supplied by the host graphics API rather than by a
//! user-writable method body.
//!
//! Grounded on the native class list recovered from the API validator:
//! buffer and bind-group resources, samplers and sampleable textures, the
//! render/compute pipeline and pass objects, and the small set of
//! always-available utility classes (`Math`, `System`, `Device`, `Window`).

use crate::ids::ClassId;
use crate::types::TypeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeClassKind {
    Buffer,
    BindGroup,
    Sampler,
    SampleableTexture1D,
    SampleableTexture2D,
    SampleableTexture2DArray,
    SampleableTexture3D,
    SampleableTextureCube,
    Math,
    System,
    Device,
    Window,
    RenderPipeline,
    ComputePipeline,
    RenderPass,
    ComputePass,
    VertexInput,
    ColorAttachment,
    DepthStencilAttachment,
}

impl NativeClassKind {
    pub fn name(self) -> &'static str {
        match self {
            NativeClassKind::Buffer => "Buffer",
            NativeClassKind::BindGroup => "BindGroup",
            NativeClassKind::Sampler => "Sampler",
            NativeClassKind::SampleableTexture1D => "SampleableTexture1D",
            NativeClassKind::SampleableTexture2D => "SampleableTexture2D",
            NativeClassKind::SampleableTexture2DArray => "SampleableTexture2DArray",
            NativeClassKind::SampleableTexture3D => "SampleableTexture3D",
            NativeClassKind::SampleableTextureCube => "SampleableTextureCube",
            NativeClassKind::Math => "Math",
            NativeClassKind::System => "System",
            NativeClassKind::Device => "Device",
            NativeClassKind::Window => "Window",
            NativeClassKind::RenderPipeline => "RenderPipeline",
            NativeClassKind::ComputePipeline => "ComputePipeline",
            NativeClassKind::RenderPass => "RenderPass",
            NativeClassKind::ComputePass => "ComputePass",
            NativeClassKind::VertexInput => "VertexInput",
            NativeClassKind::ColorAttachment => "ColorAttachment",
            NativeClassKind::DepthStencilAttachment => "DepthStencilAttachment",
        }
    }

    /// `Buffer` and the bindable-resource classes accept a template
    /// argument (the element type and/or qualifiers); the rest are plain
    /// classes.
    pub fn is_template(self) -> bool {
        matches!(
            self,
            NativeClassKind::Buffer
                | NativeClassKind::SampleableTexture1D
                | NativeClassKind::SampleableTexture2D
                | NativeClassKind::SampleableTexture2DArray
                | NativeClassKind::SampleableTexture3D
                | NativeClassKind::SampleableTextureCube
        )
    }

    pub const ALL: &'static [NativeClassKind] = &[
        NativeClassKind::Buffer,
        NativeClassKind::BindGroup,
        NativeClassKind::Sampler,
        NativeClassKind::SampleableTexture1D,
        NativeClassKind::SampleableTexture2D,
        NativeClassKind::SampleableTexture2DArray,
        NativeClassKind::SampleableTexture3D,
        NativeClassKind::SampleableTextureCube,
        NativeClassKind::Math,
        NativeClassKind::System,
        NativeClassKind::Device,
        NativeClassKind::Window,
        NativeClassKind::RenderPipeline,
        NativeClassKind::ComputePipeline,
        NativeClassKind::RenderPass,
        NativeClassKind::ComputePass,
        NativeClassKind::VertexInput,
        NativeClassKind::ColorAttachment,
        NativeClassKind::DepthStencilAttachment,
    ];
}

/// Process-wide lookup from a native class's surface name to its
/// `ClassId` and `NativeClassKind`, populated once at startup and
/// consulted by the semantic pass and API validator alike.
#[derive(Default)]
pub struct NativeClasses {
    by_kind: Vec<Option<ClassId>>,
}

impl NativeClasses {
    pub fn new() -> Self {
        NativeClasses { by_kind: vec![None; NativeClassKind::ALL.len()] }
    }

    pub fn register(&mut self, kind: NativeClassKind, class: ClassId, types: &mut TypeTable) {
        types.class_mut(class).is_native = true;
        self.by_kind[kind as usize] = Some(class);
    }

    pub fn get(&self, kind: NativeClassKind) -> Option<ClassId> {
        self.by_kind[kind as usize]
    }

    pub fn kind_of(&self, class: ClassId) -> Option<NativeClassKind> {
        NativeClassKind::ALL.iter().copied().find(|&k| self.by_kind[k as usize] == Some(class))
    }

    pub fn is_native(&self, class: ClassId) -> bool {
        self.kind_of(class).is_some()
    }

    pub fn is_resource_class(&self, class: ClassId) -> bool {
        matches!(
            self.kind_of(class),
            Some(
                NativeClassKind::Buffer
                    | NativeClassKind::Sampler
                    | NativeClassKind::SampleableTexture1D
                    | NativeClassKind::SampleableTexture2D
                    | NativeClassKind::SampleableTexture2DArray
                    | NativeClassKind::SampleableTexture3D
                    | NativeClassKind::SampleableTextureCube
            )
        )
    }
}
