//! Generation driver.
//!
//! This module ties the pieces together for one generated type:
//! resolve modules → create definition → contribute → emit bodies → finalize.

use std::sync::Arc;

use crate::backend::{InstructionEmitter, MemberBuilder};
use crate::context::ForgeContext;
use crate::definition::{TypeAttributes, TypeDefinition};
use crate::error::ForgeResult;
use crate::ids::{MemberId, TypeId};
use crate::modules::{resolve_modules, MemberModule};

/// Result of a successful generation.
#[derive(Debug)]
pub struct Generated<O> {
    /// The sealed definition.
    pub definition: TypeDefinition,
    /// Whatever the member builder produced.
    pub output: O,
}

/// Generation session.
pub struct GenerationSession {
    ctx: ForgeContext,
    modules: Vec<Arc<dyn MemberModule>>,
}

impl GenerationSession {
    pub fn new(ctx: ForgeContext) -> Self {
        Self {
            ctx,
            modules: Vec::new(),
        }
    }

    pub fn context(&self) -> &ForgeContext {
        &self.ctx
    }

    /// Add a root module. Its dependencies are pulled in automatically.
    pub fn with_module(mut self, module: Arc<dyn MemberModule>) -> Self {
        self.modules.push(module);
        self
    }

    pub fn add_module(&mut self, module: Arc<dyn MemberModule>) {
        self.modules.push(module);
    }

    /// Modules in the order they will contribute.
    pub fn resolve_modules(&self) -> ForgeResult<Vec<Arc<dyn MemberModule>>> {
        resolve_modules(&self.modules)
    }

    /// Generate the type `name` deriving from `base`.
    ///
    /// Module ordering is resolved before the definition is created, so a
    /// dependency cycle never reaches the emitter or the builder. Bodies are
    /// requested only for members that still lack one after every module has
    /// contributed.
    pub fn generate<E, B>(
        &self,
        name: &str,
        base: Option<TypeId>,
        attributes: TypeAttributes,
        emitter: &mut E,
        builder: &mut B,
    ) -> ForgeResult<Generated<B::Output>>
    where
        E: InstructionEmitter,
        B: MemberBuilder,
    {
        let modules = self.resolve_modules()?;
        let mut definition = self.ctx.define(name, base, attributes)?;

        for module in &modules {
            let before = definition.member_count();
            module.contribute(&mut definition)?;
            tracing::debug!(
                type_name = name,
                module = module.name(),
                added = definition.member_count() - before,
                "module contributed"
            );
        }

        self.emit_bodies(&mut definition, emitter)?;

        let output = definition.finalize(builder)?;
        Ok(Generated { definition, output })
    }

    fn emit_bodies<E: InstructionEmitter>(
        &self,
        definition: &mut TypeDefinition,
        emitter: &mut E,
    ) -> ForgeResult<()> {
        let pending: Vec<MemberId> = definition
            .members()
            .filter(|(_, member)| member.lacks_required_body())
            .map(|(id, _)| id)
            .collect();

        for id in pending {
            let body = match definition.member(id) {
                Some(member) => emitter.emit(member, definition)?,
                None => continue,
            };
            match body {
                Some(body) => definition.implement(id, body)?,
                None => tracing::trace!(member = %id, "emitter left member without a body"),
            }
        }
        Ok(())
    }
}
