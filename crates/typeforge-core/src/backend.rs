//! Seams to the external collaborators: the instruction emitter that writes
//! member bodies, and the member builder that materializes the final type.

use crate::definition::{TypeAttributes, TypeDefinition};
use crate::error::ForgeResult;
use crate::hierarchy::InheritedMembers;
use crate::ids::{BodyHandle, MemberId, TypeId};
use crate::member::GeneratedMember;
use crate::signature::MemberCategory;

/// Produces executable bodies for generated members.
pub trait InstructionEmitter {
    /// Emit a body for `member` of `definition`.
    ///
    /// Returning `Ok(None)` leaves the member without a body, which is only
    /// acceptable for abstract members.
    fn emit(
        &mut self,
        member: &GeneratedMember,
        definition: &TypeDefinition,
    ) -> ForgeResult<Option<BodyHandle>>;
}

/// Allocates concrete member slots for a validated definition.
///
/// Only called once module ordering and abstract-override completeness have
/// both passed.
pub trait MemberBuilder {
    type Output;

    fn build(&mut self, ty: &FinalizedType<'_>) -> ForgeResult<Self::Output>;
}

/// Read-only view of a definition that passed validation.
pub struct FinalizedType<'a> {
    definition: &'a TypeDefinition,
}

impl<'a> FinalizedType<'a> {
    pub(crate) fn new(definition: &'a TypeDefinition) -> Self {
        Self { definition }
    }

    pub fn name(&self) -> String {
        self.definition.type_name()
    }

    pub fn base(&self) -> TypeId {
        self.definition.base()
    }

    pub fn attributes(&self) -> TypeAttributes {
        self.definition.attributes()
    }

    pub fn inherited(&self) -> &InheritedMembers {
        self.definition.inherited_snapshot()
    }

    /// All generated members in the order they were added.
    pub fn members(&self) -> impl Iterator<Item = (MemberId, &'a GeneratedMember)> {
        self.definition.members()
    }

    pub fn category(&self, category: MemberCategory) -> impl Iterator<Item = &'a GeneratedMember> {
        self.definition.category(category)
    }

    /// Generated members that override an inherited slot.
    pub fn overrides(&self) -> impl Iterator<Item = &'a GeneratedMember> {
        self.definition
            .members()
            .map(|(_, member)| member)
            .filter(|member| member.overrides().is_some())
    }

    /// Generated members introducing a new dispatch slot.
    pub fn new_slots(&self) -> impl Iterator<Item = &'a GeneratedMember> {
        self.definition
            .members()
            .map(|(_, member)| member)
            .filter(|member| member.kind().is_virtual() && member.overrides().is_none())
    }

    pub fn definition(&self) -> &'a TypeDefinition {
        self.definition
    }
}
