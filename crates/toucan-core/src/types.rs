//! The type table: canonical, interned representation of every type that
//! can appear in the language, plus the class/method/field records that
//! hang off class types.
//!
//! Construction always routes through `TypeTable`'s `get_*` methods, never
//! around it, so that "distinct handles compare equal iff the types are
//! semantically identical" holds by construction: two calls with the same
//! arguments return the same `TypeId` because the getters are backed by
//! interning maps keyed on those arguments.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ids::{ClassId, EnumId, ExprId, MethodId, TypeId, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLayout {
    Default,
    Storage,
    Uniform,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Qualifiers: u32 {
        const UNIFORM    = 0x0001;
        const STORAGE    = 0x0002;
        const VERTEX     = 0x0004;
        const INDEX      = 0x0008;
        const SAMPLEABLE = 0x0010;
        const RENDERABLE = 0x0020;
        const READ_ONLY  = 0x0040;
        const WRITE_ONLY = 0x0080;
        const READ_WRITE = 0x0100;
        const COHERENT   = 0x0200;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodModifiers: u32 {
        const STATIC      = 0x0001;
        const VIRTUAL     = 0x0002;
        const DEVICE_ONLY = 0x0004;
        const VERTEX      = 0x0008;
        const FRAGMENT    = 0x0010;
        const COMPUTE     = 0x0020;
        const CONSTRUCTOR = 0x0040;
        const DESTRUCTOR  = 0x0080;
        const NATIVE      = 0x0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderType {
    #[default]
    None,
    Vertex,
    Fragment,
    Compute,
}

/// The tagged variant every `Type` boils down to. Composite kinds reference
/// other types only by `TypeId`, never by value, so equality of a `TypeKind`
/// is cheap structural equality over small integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bool,
    Integer { bits: u8, signed: bool },
    FloatingPoint { bits: u8 },
    Void,
    Auto,
    Null,
    String,
    Vector { component: TypeId, len: u8 },
    Matrix { column: TypeId, columns: u8 },
    Array { element: TypeId, len: u32, layout: MemoryLayout },
    Class(ClassId),
    Enum(EnumId),
    StrongPtr(TypeId),
    WeakPtr(TypeId),
    RawPtr(TypeId),
    Qualified { inner: TypeId, qualifiers: Qualifiers },
    FormalTemplateArg(String),
    UnresolvedScopedType { base: TypeId, id: String },
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    /// Position among *all* fields of the class, inherited ones included
    /// (parent fields first), matching inheritance-order field filling.
    pub index: usize,
    pub default_value: Option<ExprId>,
    pub offset: usize,
    pub padding: usize,
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub id: String,
    pub value: i32,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<EnumValue>,
    next_value: i32,
}

impl EnumDef {
    pub fn find_value(&self, id: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub modifiers: MethodModifiers,
    pub return_type: TypeId,
    pub name: String,
    pub class: ClassId,
    pub formal_args: Vec<VarId>,
    pub default_args: Vec<Option<ExprId>>,
    pub body: Option<crate::ids::StmtId>,
    pub shader_type: ShaderType,
    pub workgroup_size: [u32; 3],
    pub native_name: Option<String>,
    pub vtable_index: Option<usize>,
}

impl Method {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    pub fn signature(&self) -> String {
        format!("{}({} args)", self.name, self.formal_args.len())
    }
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<ClassId>,
    pub fields: Vec<Field>,
    pub methods: Vec<MethodId>,
    pub constants: IndexMap<String, ExprId>,
    pub enums: Vec<EnumId>,
    /// Set on template *instances*; `None` on the template itself and on
    /// ordinary, non-generic classes.
    pub template: Option<ClassId>,
    pub template_args: Vec<TypeId>,
    pub formal_template_args: Vec<TypeId>,
    pub is_template: bool,
    pub is_defined: bool,
    pub is_native: bool,
    pub memory_layout: MemoryLayout,
    pub padding: usize,
    pub vtable: Vec<MethodId>,
    /// Populated only when `is_template`: every instance produced so far.
    pub instances: Vec<ClassId>,
}

impl ClassDef {
    fn new(name: String) -> Self {
        ClassDef {
            name,
            parent: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constants: IndexMap::new(),
            enums: Vec::new(),
            template: None,
            template_args: Vec::new(),
            formal_template_args: Vec::new(),
            is_template: false,
            is_defined: false,
            is_native: false,
            memory_layout: MemoryLayout::Default,
            padding: 0,
            vtable: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_constant(&self, name: &str) -> Option<ExprId> {
        self.constants.get(name).copied()
    }

    pub fn total_fields(&self) -> usize {
        self.fields.len()
    }
}

type IntKey = (u8, bool);
type ArrayKey = (TypeId, u32, MemoryLayout);
type VecKey = (TypeId, u8);
type QualKey = (TypeId, u32);
type ClassInstanceKey = (ClassId, Vec<TypeId>);
type ScopedKey = (TypeId, String);

pub struct TypeTable {
    kinds: Vec<TypeKind>,
    classes: Vec<ClassDef>,
    enums: Vec<EnumDef>,
    class_type_ids: Vec<TypeId>,
    enum_type_ids: Vec<TypeId>,

    bool_ty: TypeId,
    void_ty: TypeId,
    auto_ty: TypeId,
    null_ty: TypeId,
    string_ty: TypeId,

    integer_cache: HashMap<IntKey, TypeId>,
    float_cache: HashMap<u8, TypeId>,
    vector_cache: HashMap<VecKey, TypeId>,
    matrix_cache: HashMap<VecKey, TypeId>,
    array_cache: HashMap<ArrayKey, TypeId>,
    strong_ptr_cache: HashMap<TypeId, TypeId>,
    weak_ptr_cache: HashMap<TypeId, TypeId>,
    raw_ptr_cache: HashMap<TypeId, TypeId>,
    qualified_cache: HashMap<QualKey, TypeId>,
    formal_arg_cache: HashMap<String, TypeId>,
    unresolved_scoped_cache: HashMap<ScopedKey, TypeId>,
    class_instance_cache: HashMap<ClassInstanceKey, ClassId>,

    instance_queue: Vec<ClassId>,
    layout_done: bool,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut kinds = Vec::new();
        let bool_ty = TypeId(push(&mut kinds, TypeKind::Bool));
        let void_ty = TypeId(push(&mut kinds, TypeKind::Void));
        let auto_ty = TypeId(push(&mut kinds, TypeKind::Auto));
        let null_ty = TypeId(push(&mut kinds, TypeKind::Null));
        let string_ty = TypeId(push(&mut kinds, TypeKind::String));

        TypeTable {
            kinds,
            classes: Vec::new(),
            enums: Vec::new(),
            class_type_ids: Vec::new(),
            enum_type_ids: Vec::new(),
            bool_ty,
            void_ty,
            auto_ty,
            null_ty,
            string_ty,
            integer_cache: HashMap::new(),
            float_cache: HashMap::new(),
            vector_cache: HashMap::new(),
            matrix_cache: HashMap::new(),
            array_cache: HashMap::new(),
            strong_ptr_cache: HashMap::new(),
            weak_ptr_cache: HashMap::new(),
            raw_ptr_cache: HashMap::new(),
            qualified_cache: HashMap::new(),
            formal_arg_cache: HashMap::new(),
            unresolved_scoped_cache: HashMap::new(),
            class_instance_cache: HashMap::new(),
            instance_queue: Vec::new(),
            layout_done: false,
        }
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.index()]
    }

    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDef {
        &mut self.classes[id.index()]
    }

    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.index()]
    }

    pub fn enum_def_mut(&mut self, id: EnumId) -> &mut EnumDef {
        &mut self.enums[id.index()]
    }

    // ---- primitive getters -------------------------------------------------

    pub fn get_bool(&self) -> TypeId {
        self.bool_ty
    }
    pub fn get_void(&self) -> TypeId {
        self.void_ty
    }
    pub fn get_auto(&self) -> TypeId {
        self.auto_ty
    }
    pub fn get_null(&self) -> TypeId {
        self.null_ty
    }
    pub fn get_string(&self) -> TypeId {
        self.string_ty
    }

    pub fn get_integer(&mut self, bits: u8, signed: bool) -> TypeId {
        let key = (bits, signed);
        if let Some(&id) = self.integer_cache.get(&key) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::Integer { bits, signed }));
        self.integer_cache.insert(key, id);
        id
    }
    pub fn get_byte(&mut self) -> TypeId {
        self.get_integer(8, true)
    }
    pub fn get_ubyte(&mut self) -> TypeId {
        self.get_integer(8, false)
    }
    pub fn get_short(&mut self) -> TypeId {
        self.get_integer(16, true)
    }
    pub fn get_ushort(&mut self) -> TypeId {
        self.get_integer(16, false)
    }
    pub fn get_int(&mut self) -> TypeId {
        self.get_integer(32, true)
    }
    pub fn get_uint(&mut self) -> TypeId {
        self.get_integer(32, false)
    }

    pub fn get_floating_point(&mut self, bits: u8) -> TypeId {
        if let Some(&id) = self.float_cache.get(&bits) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::FloatingPoint { bits }));
        self.float_cache.insert(bits, id);
        id
    }
    pub fn get_float(&mut self) -> TypeId {
        self.get_floating_point(32)
    }
    pub fn get_double(&mut self) -> TypeId {
        self.get_floating_point(64)
    }

    pub fn get_vector(&mut self, component: TypeId, len: u8) -> Option<TypeId> {
        if !(2..=4).contains(&len) {
            return None;
        }
        let key = (component, len);
        if let Some(&id) = self.vector_cache.get(&key) {
            return Some(id);
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::Vector { component, len }));
        self.vector_cache.insert(key, id);
        Some(id)
    }

    pub fn get_matrix(&mut self, column: TypeId, columns: u8) -> Option<TypeId> {
        if !(2..=4).contains(&columns) {
            return None;
        }
        debug_assert!(matches!(self.kind(column), TypeKind::Vector { .. }));
        let key = (column, columns);
        if let Some(&id) = self.matrix_cache.get(&key) {
            return Some(id);
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::Matrix { column, columns }));
        self.matrix_cache.insert(key, id);
        Some(id)
    }

    pub fn get_array(&mut self, element: TypeId, len: u32, layout: MemoryLayout) -> TypeId {
        let key = (element, len, layout);
        if let Some(&id) = self.array_cache.get(&key) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::Array { element, len, layout }));
        self.array_cache.insert(key, id);
        id
    }

    pub fn get_strong_ptr(&mut self, pointee: TypeId) -> TypeId {
        if let Some(&id) = self.strong_ptr_cache.get(&pointee) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::StrongPtr(pointee)));
        self.strong_ptr_cache.insert(pointee, id);
        id
    }

    pub fn get_weak_ptr(&mut self, pointee: TypeId) -> TypeId {
        if let Some(&id) = self.weak_ptr_cache.get(&pointee) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::WeakPtr(pointee)));
        self.weak_ptr_cache.insert(pointee, id);
        id
    }

    pub fn get_raw_ptr(&mut self, pointee: TypeId) -> TypeId {
        if let Some(&id) = self.raw_ptr_cache.get(&pointee) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::RawPtr(pointee)));
        self.raw_ptr_cache.insert(pointee, id);
        id
    }

    pub fn get_formal_template_arg(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.formal_arg_cache.get(name) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::FormalTemplateArg(name.to_string())));
        self.formal_arg_cache.insert(name.to_string(), id);
        id
    }

    pub fn get_unresolved_scoped_type(&mut self, base: TypeId, id_str: &str) -> TypeId {
        let key = (base, id_str.to_string());
        if let Some(&id) = self.unresolved_scoped_cache.get(&key) {
            return id;
        }
        let id = TypeId(push(
            &mut self.kinds,
            TypeKind::UnresolvedScopedType { base, id: id_str.to_string() },
        ));
        self.unresolved_scoped_cache.insert(key, id);
        id
    }

    /// Qualifying with zero bits returns the base type unchanged. Qualifying
    /// an array pushes the qualifier into the element type instead of
    /// wrapping the array itself, matching `Qualified(T, Q).push inward`.
    pub fn get_qualified(&mut self, ty: TypeId, qualifiers: Qualifiers) -> TypeId {
        if qualifiers.is_empty() {
            return ty;
        }
        if let TypeKind::Array { element, len, layout } = self.kind(ty).clone() {
            let qualified_element = self.get_qualified(element, qualifiers);
            return self.get_array(qualified_element, len, layout);
        }
        if let TypeKind::Qualified { inner, qualifiers: existing } = self.kind(ty).clone() {
            return self.get_qualified(inner, existing | qualifiers);
        }
        let key = (ty, qualifiers.bits());
        if let Some(&id) = self.qualified_cache.get(&key) {
            return id;
        }
        let id = TypeId(push(&mut self.kinds, TypeKind::Qualified { inner: ty, qualifiers }));
        self.qualified_cache.insert(key, id);
        id
    }

    pub fn get_unqualified_type(&self, ty: TypeId) -> (TypeId, Qualifiers) {
        match self.kind(ty) {
            TypeKind::Qualified { inner, qualifiers } => (*inner, *qualifiers),
            _ => (ty, Qualifiers::empty()),
        }
    }

    pub fn make_class(&mut self, name: &str) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassDef::new(name.to_string()));
        let ty = TypeId(push(&mut self.kinds, TypeKind::Class(id)));
        self.class_type_ids.push(ty);
        id
    }

    pub fn class_type_id(&self, class: ClassId) -> TypeId {
        self.class_type_ids[class.index()]
    }

    /// Every class type registered so far, in declaration order; used by
    /// the symbol-table dump (`-s`).
    pub fn class_type_ids(&self) -> &[TypeId] {
        &self.class_type_ids
    }

    pub fn make_enum(&mut self, name: &str) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumDef { name: name.to_string(), values: Vec::new(), next_value: 0 });
        let ty = TypeId(push(&mut self.kinds, TypeKind::Enum(id)));
        self.enum_type_ids.push(ty);
        id
    }

    pub fn enum_type_id(&self, enum_id: EnumId) -> TypeId {
        self.enum_type_ids[enum_id.index()]
    }

    pub fn enum_append(&mut self, enum_id: EnumId, ident: &str, value: Option<i32>) {
        let def = self.enum_def_mut(enum_id);
        let v = value.unwrap_or(def.next_value);
        def.values.push(EnumValue { id: ident.to_string(), value: v });
        def.next_value = v + 1;
    }

    /// Dedupes by `(template, args)`; enqueues a fresh instance for later
    /// body resolution on first request, returns the existing instance on
    /// repeat requests.
    pub fn get_class_template_instance(&mut self, template: ClassId, args: &[TypeId]) -> ClassId {
        let key = (template, args.to_vec());
        if let Some(&id) = self.class_instance_cache.get(&key) {
            return id;
        }
        let template_name = self.class(template).name.clone();
        let formal_args = self.class(template).formal_template_args.clone();
        let instance_name = format!(
            "{}<{}>",
            template_name,
            args.iter().map(|a| format!("{:?}", a)).collect::<Vec<_>>().join(", ")
        );
        let instance = self.make_class(&instance_name);
        {
            let def = self.class_mut(instance);
            def.template = Some(template);
            def.template_args = args.to_vec();
        }
        debug_assert_eq!(formal_args.len().min(args.len()), formal_args.len().min(args.len()));
        self.class_mut(template).instances.push(instance);
        self.class_instance_cache.insert(key, instance);
        self.instance_queue.push(instance);
        instance
    }

    /// Drains the queue of template instances awaiting body resolution. An
    /// instance is enqueued at most once; new instances created while
    /// draining naturally extend the same queue.
    pub fn pop_instance_queue(&mut self) -> Option<ClassId> {
        if self.instance_queue.is_empty() {
            None
        } else {
            Some(self.instance_queue.remove(0))
        }
    }

    // ---- queries ------------------------------------------------------------

    pub fn is_class(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Class(_))
    }

    pub fn as_class(&self, ty: TypeId) -> Option<ClassId> {
        match self.kind(ty) {
            TypeKind::Class(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_ptr(&self, ty: TypeId) -> bool {
        matches!(
            self.kind(ty),
            TypeKind::StrongPtr(_) | TypeKind::WeakPtr(_) | TypeKind::RawPtr(_) | TypeKind::Null
        )
    }

    pub fn is_strong_ptr(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::StrongPtr(_))
    }
    pub fn is_weak_ptr(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::WeakPtr(_))
    }
    pub fn is_raw_ptr(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::RawPtr(_))
    }
    pub fn is_array(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Array { .. })
    }
    pub fn is_unsized_array(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Array { len: 0, .. })
    }
    pub fn is_vector(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Vector { .. })
    }
    pub fn is_matrix(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Matrix { .. })
    }
    pub fn is_void(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Void)
    }
    pub fn is_auto(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Auto)
    }
    pub fn is_null(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Null)
    }
    pub fn is_bool(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Bool)
    }
    pub fn is_enum(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Enum(_))
    }
    pub fn is_qualified(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Qualified { .. })
    }
    pub fn is_integer(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Integer { .. })
    }
    pub fn is_unsigned(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::Integer { signed, .. } => !signed,
            TypeKind::Vector { component, .. } => self.is_unsigned(*component),
            _ => false,
        }
    }
    pub fn is_float(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::FloatingPoint { bits: 32 })
    }
    pub fn is_double(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::FloatingPoint { bits: 64 })
    }
    pub fn is_floating_point(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::FloatingPoint { .. })
    }
    pub fn is_int(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Integer { bits: 32, signed: true })
    }
    pub fn is_uint(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Integer { bits: 32, signed: false })
    }
    pub fn is_ushort(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Integer { bits: 16, signed: false })
    }
    pub fn is_class_template(&self, ty: TypeId) -> bool {
        self.as_class(ty).map(|c| self.class(c).is_template).unwrap_or(false)
    }

    pub fn is_array_like(&self, ty: TypeId) -> bool {
        self.is_array(ty) || self.is_vector(ty)
    }

    /// Element type shared by arrays and vectors, used by list-expression
    /// resolution which treats both uniformly.
    pub fn array_like_element(&mut self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty).clone() {
            TypeKind::Array { element, .. } => Some(element),
            TypeKind::Vector { component, .. } => Some(component),
            _ => None,
        }
    }

    pub fn array_like_len(&self, ty: TypeId) -> Option<u32> {
        match self.kind(ty) {
            TypeKind::Array { len, .. } => Some(*len),
            TypeKind::Vector { len, .. } => Some(*len as u32),
            _ => None,
        }
    }

    pub fn is_pod(&self, ty: TypeId) -> bool {
        match self.kind(ty).clone() {
            TypeKind::Bool
            | TypeKind::Integer { .. }
            | TypeKind::FloatingPoint { .. }
            | TypeKind::Vector { .. }
            | TypeKind::Matrix { .. }
            | TypeKind::Enum(_) => true,
            TypeKind::Array { element, len, .. } => len > 0 && self.is_pod(element),
            TypeKind::Class(c) => {
                let def = self.class(c);
                !def.fields.is_empty() && def.fields.iter().all(|f| self.is_pod(f.ty))
            }
            TypeKind::Qualified { inner, .. } => self.is_pod(inner),
            _ => false,
        }
    }

    pub fn is_readable(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::Qualified { qualifiers, .. } => !qualifiers.contains(Qualifiers::WRITE_ONLY),
            _ => true,
        }
    }

    pub fn is_writable(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::Qualified { qualifiers, .. } => !qualifiers.contains(Qualifiers::READ_ONLY),
            _ => true,
        }
    }

    /// Transitive through fields and array elements: the predicate used to
    /// reject allocations that would permit dangling references.
    pub fn contains_raw_ptr(&self, ty: TypeId) -> bool {
        match self.kind(ty).clone() {
            TypeKind::RawPtr(_) => true,
            TypeKind::Array { element, .. } => self.contains_raw_ptr(element),
            TypeKind::Qualified { inner, .. } => self.contains_raw_ptr(inner),
            TypeKind::Class(c) => self.class(c).fields.iter().any(|f| self.contains_raw_ptr(f.ty)),
            _ => false,
        }
    }

    /// Transitive through fields and array elements: true if `ty` is, or
    /// contains, a runtime-sized (`len == 0`) array. A `Uniform` buffer's
    /// element type may not contain one anywhere, since the host can't
    /// know its size ahead of a draw call.
    pub fn contains_unsized_array(&self, ty: TypeId) -> bool {
        match self.kind(ty).clone() {
            TypeKind::Array { element, len: 0, .. } => {
                let _ = element;
                true
            }
            TypeKind::Array { element, .. } => self.contains_unsized_array(element),
            TypeKind::Qualified { inner, .. } => self.contains_unsized_array(inner),
            TypeKind::Class(c) => self.class(c).fields.iter().any(|f| self.contains_unsized_array(f.ty)),
            _ => false,
        }
    }

    /// A type needs an end-of-scope `Destroy` if it (transitively) owns a
    /// strong/weak pointer or a class with fields that do.
    pub fn needs_destruction(&self, ty: TypeId) -> bool {
        match self.kind(ty).clone() {
            TypeKind::StrongPtr(_) | TypeKind::WeakPtr(_) => true,
            TypeKind::Array { element, .. } => self.needs_destruction(element),
            TypeKind::Qualified { inner, .. } => self.needs_destruction(inner),
            TypeKind::Class(c) => {
                let def = self.class(c);
                def.fields.iter().any(|f| self.needs_destruction(f.ty))
                    || def.parent.map(|p| self.needs_destruction(self.class_type_id(p))).unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn is_fully_specified(&self, ty: TypeId) -> bool {
        match self.kind(ty).clone() {
            TypeKind::FormalTemplateArg(_) | TypeKind::UnresolvedScopedType { .. } => false,
            TypeKind::Array { element, .. } => self.is_fully_specified(element),
            TypeKind::StrongPtr(inner) | TypeKind::WeakPtr(inner) | TypeKind::RawPtr(inner) => {
                self.is_fully_specified(inner)
            }
            TypeKind::Qualified { inner, .. } => self.is_fully_specified(inner),
            TypeKind::Class(c) => {
                let def = self.class(c);
                if def.is_template {
                    false
                } else {
                    def.template_args.iter().all(|&a| self.is_fully_specified(a))
                }
            }
            _ => true,
        }
    }

    /// `Null` widens to every pointer kind (its sole polymorphism);
    /// qualified-to-qualified widening drops permissions but never gains
    /// them; array-to-array widening requires equal length and element
    /// type.
    pub fn can_widen_to(&self, src: TypeId, dst: TypeId) -> bool {
        if src == dst {
            return true;
        }
        match (self.kind(src).clone(), self.kind(dst).clone()) {
            (TypeKind::Null, _) => self.is_ptr(dst),
            (TypeKind::Integer { bits: sb, signed: ss }, TypeKind::Integer { bits: db, signed: ds }) => {
                ss == ds && sb <= db
            }
            (TypeKind::Integer { .. }, TypeKind::FloatingPoint { .. }) => true,
            (TypeKind::FloatingPoint { bits: sb }, TypeKind::FloatingPoint { bits: db }) => sb <= db,
            (TypeKind::Vector { component: sc, len: sl }, TypeKind::Vector { component: dc, len: dl }) => {
                sl == dl && self.can_widen_to(sc, dc)
            }
            (TypeKind::Enum(a), TypeKind::Enum(b)) => a == b,
            (TypeKind::StrongPtr(a), TypeKind::StrongPtr(b)) => a == b,
            (TypeKind::WeakPtr(a), TypeKind::StrongPtr(b)) => a == b,
            (TypeKind::WeakPtr(a), TypeKind::WeakPtr(b)) => a == b,
            (TypeKind::StrongPtr(a), TypeKind::WeakPtr(b)) => a == b,
            (TypeKind::Array { element: se, len: sl, .. }, TypeKind::Array { element: de, len: 0, .. }) => {
                sl > 0 && se == de
            }
            (TypeKind::Qualified { inner: si, qualifiers: sq }, TypeKind::Qualified { inner: di, qualifiers: dq }) => {
                si == di && dq.bits() & !sq.bits() == 0
            }
            (_, TypeKind::Qualified { inner: di, qualifiers: dq }) => {
                self.can_widen_to(src, di) && dq.is_empty()
            }
            (TypeKind::Class(a), TypeKind::Class(b)) => {
                let mut cur = Some(a);
                while let Some(c) = cur {
                    if c == b {
                        return true;
                    }
                    cur = self.class(c).parent;
                }
                false
            }
            _ => false,
        }
    }

    pub fn size_in_bytes(&self, ty: TypeId) -> usize {
        match self.kind(ty).clone() {
            TypeKind::Bool => 1,
            TypeKind::Integer { bits, .. } => (bits / 8) as usize,
            TypeKind::FloatingPoint { bits } => (bits / 8) as usize,
            TypeKind::Vector { component, len } => self.size_in_bytes(component) * len as usize,
            TypeKind::Matrix { column, columns } => self.size_in_bytes(column) * columns as usize,
            TypeKind::Array { element, len, .. } => self.size_in_bytes(element) * len as usize,
            TypeKind::StrongPtr(_) | TypeKind::WeakPtr(_) => 2 * std::mem::size_of::<usize>(),
            TypeKind::RawPtr(_) => std::mem::size_of::<usize>(),
            TypeKind::Enum(_) => 4,
            TypeKind::Qualified { inner, .. } => self.size_in_bytes(inner),
            TypeKind::Class(c) => {
                let def = self.class(c);
                let parent_size = def.parent.map(|p| self.size_in_bytes(self.class_type_id(p))).unwrap_or(0);
                parent_size
                    + def
                        .fields
                        .iter()
                        .map(|f| f.padding + self.size_in_bytes(f.ty))
                        .sum::<usize>()
                    + def.padding
            }
            _ => 0,
        }
    }

    pub fn alignment_in_bytes(&self, ty: TypeId) -> usize {
        match self.kind(ty).clone() {
            TypeKind::Array { element, .. } => self.alignment_in_bytes(element),
            TypeKind::Class(c) => self
                .class(c)
                .fields
                .iter()
                .map(|f| self.alignment_in_bytes(f.ty))
                .max()
                .unwrap_or(1),
            _ => self.size_in_bytes(ty),
        }
    }

    // Classification helpers used by the binary-operator table (§4.4.9).
    pub fn vector_scalar(&self, lhs: TypeId, rhs: TypeId) -> bool {
        if let (TypeKind::Vector { component, .. }, _) = (self.kind(lhs).clone(), self.kind(rhs).clone()) {
            component == rhs
        } else {
            false
        }
    }
    pub fn scalar_vector(&self, lhs: TypeId, rhs: TypeId) -> bool {
        self.vector_scalar(rhs, lhs)
    }
    pub fn matrix_scalar(&self, lhs: TypeId, rhs: TypeId) -> bool {
        if let TypeKind::Matrix { column, .. } = self.kind(lhs).clone() {
            if let TypeKind::Vector { component, .. } = self.kind(column).clone() {
                return component == rhs;
            }
        }
        false
    }
    pub fn scalar_matrix(&self, lhs: TypeId, rhs: TypeId) -> bool {
        self.matrix_scalar(rhs, lhs)
    }
    pub fn matrix_vector(&self, lhs: TypeId, rhs: TypeId) -> bool {
        matches!(
            (self.kind(lhs).clone(), self.kind(rhs).clone()),
            (TypeKind::Matrix { column, .. }, TypeKind::Vector { .. }) if column == rhs
        )
    }
    pub fn vector_matrix(&self, lhs: TypeId, rhs: TypeId) -> bool {
        self.matrix_vector(rhs, lhs)
    }

    /// Propagates storage-class qualifiers into array elements and class
    /// fields, then computes per-field offsets, rounding every array-element
    /// size and every class alignment up to 16 bytes under `Uniform`
    /// layout. Must run exactly once, after every class is fully defined
    /// and before any emitter runs.
    pub fn layout(&mut self) {
        if self.layout_done {
            return;
        }
        self.layout_done = true;
        let class_ids: Vec<ClassId> = (0..self.classes.len() as u32).map(ClassId).collect();
        for class in class_ids {
            self.compute_field_offsets(class);
        }
    }

    fn compute_field_offsets(&mut self, class: ClassId) {
        let layout = self.class(class).memory_layout;
        let mut offset = self
            .class(class)
            .parent
            .map(|p| self.size_in_bytes(self.class_type_id(p)))
            .unwrap_or(0);
        let field_count = self.class(class).fields.len();
        for i in 0..field_count {
            let field_ty = self.class(class).fields[i].ty;
            let mut align = self.alignment_in_bytes(field_ty);
            if layout == MemoryLayout::Uniform {
                align = round_up(align, 16);
            }
            let padded_offset = round_up(offset, align);
            let padding = padded_offset - offset;
            let field = &mut self.class_mut(class).fields[i];
            field.padding = padding;
            field.offset = padded_offset;
            offset = padded_offset + self.size_in_bytes(field_ty);
        }
        if layout == MemoryLayout::Uniform {
            let total_align = round_up(self.alignment_in_bytes(self.class_type_id(class)), 16);
            let padded = round_up(offset, total_align);
            self.class_mut(class).padding = padded - offset;
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        TypeTable::new()
    }
}

fn round_up(value: usize, align: usize) -> usize {
    if align == 0 {
        value
    } else {
        (value + align - 1) / align * align
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_same_id_for_repeated_queries() {
        let mut types = TypeTable::new();
        let a = types.get_int();
        let b = types.get_int();
        assert_eq!(a, b);
        let v1 = types.get_vector(a, 3).unwrap();
        let v2 = types.get_vector(a, 3).unwrap();
        assert_eq!(v1, v2);
        assert_ne!(v1, types.get_vector(a, 4).unwrap());
    }

    #[test]
    fn qualified_of_unqualified_is_identity_when_empty() {
        let mut types = TypeTable::new();
        let int_ty = types.get_int();
        assert_eq!(types.get_qualified(int_ty, Qualifiers::empty()), int_ty);
    }

    #[test]
    fn qualifying_twice_composes_instead_of_nesting() {
        let mut types = TypeTable::new();
        let int_ty = types.get_int();
        let once = types.get_qualified(int_ty, Qualifiers::UNIFORM);
        let twice = types.get_qualified(once, Qualifiers::READ_ONLY);
        let (unqualified, quals) = types.get_unqualified_type(twice);
        assert_eq!(unqualified, int_ty);
        assert!(quals.contains(Qualifiers::UNIFORM));
        assert!(quals.contains(Qualifiers::READ_ONLY));
        // never double-wrapped: qualifying an already-Qualified type folds
        // the bits into one Qualified node over the original base.
        assert!(!matches!(types.kind(unqualified), TypeKind::Qualified { .. }));
    }

    #[test]
    fn template_instance_is_deduped_by_template_and_args() {
        let mut types = TypeTable::new();
        let template = types.make_class("Box");
        types.class_mut(template).is_template = true;
        let int_ty = types.get_int();
        let float_ty = types.get_float();
        let a = types.get_class_template_instance(template, &[int_ty]);
        let b = types.get_class_template_instance(template, &[int_ty]);
        let c = types.get_class_template_instance(template, &[float_ty]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(types.class(template).instances.len(), 2);
    }

    #[test]
    fn instance_queue_drains_each_fresh_instance_once() {
        let mut types = TypeTable::new();
        let template = types.make_class("Box");
        types.class_mut(template).is_template = true;
        let int_ty = types.get_int();
        let float_ty = types.get_float();
        let first = types.get_class_template_instance(template, &[int_ty]);
        // repeat request for the same instance must not re-enqueue it
        let _ = types.get_class_template_instance(template, &[int_ty]);
        let second = types.get_class_template_instance(template, &[float_ty]);
        assert_eq!(types.pop_instance_queue(), Some(first));
        assert_eq!(types.pop_instance_queue(), Some(second));
        assert_eq!(types.pop_instance_queue(), None);
    }

    #[test]
    fn can_widen_to_widens_narrower_signed_integer() {
        let mut types = TypeTable::new();
        let short_ty = types.get_short();
        let int_ty = types.get_int();
        assert!(types.can_widen_to(short_ty, int_ty));
        assert!(!types.can_widen_to(int_ty, short_ty));
    }

    #[test]
    fn null_widens_to_every_pointer_kind_only() {
        let mut types = TypeTable::new();
        let class = types.make_class("Foo");
        let class_ty = types.class_type_id(class);
        let strong = types.get_strong_ptr(class_ty);
        let null_ty = types.get_null();
        assert!(types.can_widen_to(null_ty, strong));
        assert!(!types.can_widen_to(null_ty, class_ty));
    }
}

fn push(kinds: &mut Vec<TypeKind>, kind: TypeKind) -> u32 {
    let id = kinds.len() as u32;
    kinds.push(kind);
    id
}
