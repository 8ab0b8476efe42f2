//! Ties the passes together into the single compile-facing entry point the
//! CLI calls: builtin install, semantic resolution of every method body,
//! API validation, and (for shader-typed methods) shader preparation and
//! IR emission, aborting between stages the moment a stage's diagnostics
//! sink has any errors in it.

use log::info;

use crate::api_validator::ApiValidator;
use crate::ast::{Ast, VarTable};
use crate::builtins::{self, Builtins};
use crate::config::CompilerConfig;
use crate::error::{CompileError, Diagnostics};
use crate::ids::{ClassId, MethodId};
use crate::native_class::NativeClassKind;
use crate::scope::SymbolScopeStack;
use crate::semantic::{self, MethodTable, SemanticPass};
use crate::shader_ir::{ShaderIrEmitter, ShaderModule};
use crate::shader_prep::ShaderPrepPass;
use crate::types::{ShaderType, TypeTable};

/// Everything a compilation unit needs threaded through every pass. Built
/// once by `CompilationUnit::new`, then handed pass by pass to each stage.
pub struct CompilationUnit {
    pub ast: Ast,
    pub vars: VarTable,
    pub types: TypeTable,
    pub methods: MethodTable,
    pub scope: SymbolScopeStack,
    pub builtins: Builtins,
    pub diags: Diagnostics,
}

impl CompilationUnit {
    pub fn new() -> Self {
        let mut types = TypeTable::new();
        let mut scope = SymbolScopeStack::new();
        let builtins = builtins::install(&mut types, &mut scope);
        let mut methods = MethodTable::new();
        semantic::register_native_methods(&mut methods, &mut types, &builtins.native_method_sigs);
        CompilationUnit {
            ast: Ast::new(),
            vars: VarTable::new(),
            types,
            methods,
            scope,
            builtins,
            diags: Diagnostics::new(),
        }
    }

    /// Runs the semantic pass over every user-defined method with a body,
    /// in declaration order (mirroring the original's single top-to-bottom
    /// sweep; forward references across classes are resolved because every
    /// class's *type* is registered before any method body is visited).
    /// Returns every `New` expression built along the way, for the caller
    /// to hand to `run_api_validation`.
    pub fn run_semantic_pass(&mut self, method_order: &[MethodId]) -> Result<Vec<crate::ids::ExprId>, CompileError> {
        info!("running semantic pass over {} methods", method_order.len());
        let mut new_exprs = Vec::new();
        for &method in method_order {
            let mut pass = SemanticPass::new(
                &mut self.ast,
                &mut self.vars,
                &mut self.types,
                &mut self.methods,
                &mut self.scope,
                &self.diags,
                &self.builtins,
            );
            pass.resolve_method(method);
            new_exprs.extend(pass.take_new_exprs());
        }
        while let Some(instance) = self.types.pop_instance_queue() {
            let _ = instance;
        }
        if self.diags.num_errors() > 0 {
            return Err(CompileError::SemanticErrors(self.diags.num_errors()));
        }
        Ok(new_exprs)
    }

    pub fn run_api_validation(&self, new_exprs: &[crate::ids::ExprId]) -> Result<(), CompileError> {
        let validator = ApiValidator::new(&self.ast, &self.types, &self.builtins.native_classes, &self.diags);
        for &expr in new_exprs {
            validator.validate_expr(expr);
        }
        if self.diags.num_errors() > 0 {
            return Err(CompileError::SemanticErrors(self.diags.num_errors()));
        }
        Ok(())
    }

    /// Checks that a `RenderPipeline`/`ComputePipeline` instance's
    /// shader-stage requirements are satisfied, given the resolved method
    /// table (only available after the semantic pass completes).
    pub fn validate_pipeline(&self, class: ClassId) -> Result<(), CompileError> {
        let validator = ApiValidator::new(&self.ast, &self.types, &self.builtins.native_classes, &self.diags);
        let location = crate::file_location::FileLocation::unknown();
        if self.builtins.native_classes.kind_of(class) == Some(NativeClassKind::RenderPipeline) {
            validator.validate_pipeline_shader_stages(class, &self.methods, &location);
        }
        if self.diags.num_errors() > 0 {
            return Err(CompileError::SemanticErrors(self.diags.num_errors()));
        }
        Ok(())
    }

    /// Prepares and emits shader IR for every method tagged vertex,
    /// fragment, or compute, skipping ordinary (non-shader) methods.
    pub fn emit_shaders(&mut self, method_order: &[MethodId]) -> Vec<(MethodId, ShaderModule)> {
        let mut modules = Vec::new();
        for &method in method_order {
            if self.methods.get(method).shader_type == ShaderType::None {
                continue;
            }
            let interface = {
                let mut prep = ShaderPrepPass::new(
                    &mut self.ast,
                    &mut self.vars,
                    &self.types,
                    &mut self.methods,
                    &self.diags,
                );
                let interface = prep.extract_interface(method);
                prep.flatten_pointer_args(method);
                interface
            };
            let emitter = ShaderIrEmitter::new(&self.ast, &self.vars, &self.types, &self.methods, &self.builtins.native_classes);
            let module = emitter.emit_method(method, interface);
            modules.push((method, module));
        }
        modules
    }

    pub fn find_class(&self, name: &str) -> Result<ClassId, CompileError> {
        self.scope
            .lookup_type(name)
            .and_then(|ty| self.types.as_class(ty))
            .ok_or_else(|| CompileError::ClassNotFound(name.to_string()))
    }

    pub fn find_method(&self, class: ClassId, name: &str) -> Result<MethodId, CompileError> {
        self.types
            .class(class)
            .methods
            .iter()
            .copied()
            .find(|&m| self.methods.get(m).name == name)
            .ok_or_else(|| CompileError::MethodNotFound(name.to_string(), self.types.class(class).name.clone()))
    }

    /// `-s`: logs every resolved class's fields and methods. A real dump
    /// target (stdout vs `-o`) is a CLI concern; the core only knows how
    /// to produce the text.
    pub fn dump_symbol_table(&self) {
        for class in self.types.class_type_ids() {
            let class_id = match self.types.as_class(*class) {
                Some(c) => c,
                None => continue,
            };
            let def = self.types.class(class_id);
            info!("class {} ({} fields, {} methods)", def.name, def.fields.len(), def.methods.len());
            for field in &def.fields {
                info!("  field {}: {:?}", field.name, field.ty);
            }
            for &m in &def.methods {
                info!("  method {}", self.methods.get(m).name);
            }
        }
    }
}

impl Default for CompilationUnit {
    fn default() -> Self {
        CompilationUnit::new()
    }
}

/// Runs the full pipeline the CLI drives: semantic pass, layout, API
/// validation, and (for `-c class -m method`) locating the requested
/// class/method and, with `-v`, emitting its shader IR. Parsing user
/// source into the `Ast`/`VarTable` happens before this is called; it
/// isn't this crate's concern.
pub fn compile(unit: &mut CompilationUnit, config: &CompilerConfig, method_order: &[MethodId]) -> Result<(), CompileError> {
    let new_exprs = unit.run_semantic_pass(method_order)?;
    unit.types.layout();
    unit.run_api_validation(&new_exprs)?;

    if config.dump_symbol_table {
        unit.dump_symbol_table();
    }

    if let Some(class_name) = &config.class_name {
        let class = unit.find_class(class_name)?;
        unit.validate_pipeline(class)?;
        if let Some(method_name) = &config.method_name {
            let method = unit.find_method(class, method_name)?;
            if config.emit_shader_ir {
                if unit.methods.get(method).shader_type == ShaderType::None {
                    return Err(CompileError::UnsupportedDumpMode);
                }
                let modules = unit.emit_shaders(&[method]);
                if config.dump_ir {
                    for (_, module) in &modules {
                        info!("{:?}", module.execution_model);
                        for op in &module.ops {
                            info!("  {:?}", op);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
