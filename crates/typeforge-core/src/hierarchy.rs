//! Hierarchy walker: the member set a foreign subclass may see or override.
//!
//! The walk runs most-derived to least-derived over the base chain. At each
//! level only externally reachable members are considered, keyed by their
//! [`Signature`]:
//!
//! - once a virtual, abstract or override member has been recorded for a
//!   signature, less-derived members with that signature are dropped; only
//!   the most-derived implementation in the dispatch chain is visible.
//! - once a non-virtual member has been recorded, less-derived members with
//!   that signature are hidden by it. Hidden members are reported only when
//!   the caller asks for them. A hidden virtual member still ends the
//!   dispatch chain below it.
//!
//! Constructors are never inherited transitively: only the immediate base's
//! reachable constructors are reported. Interfaces are not walked.

use std::collections::{HashMap, HashSet};

use crate::context::ForgeContext;
use crate::error::{ForgeError, ForgeResult};
use crate::ids::TypeId;
use crate::member::{DeclaredMember, MemberKind};
use crate::signature::{MemberCategory, Signature};
use crate::universe::TypeFlavor;
use crate::visibility::Visibility;

/// A member a derived type inherits from its base chain.
#[derive(Clone, Debug)]
pub struct InheritedMember {
    pub signature: Signature,
    /// Effective visibility as seen from a foreign subclass.
    pub visibility: Visibility,
    /// Distance from the immediate base (0) up the chain.
    pub level: usize,
    pub declaring_type: TypeId,
    pub member: DeclaredMember,
    /// Shadowed by a more-derived non-virtual member with the same signature.
    pub hidden: bool,
}

impl InheritedMember {
    pub fn kind(&self) -> MemberKind {
        self.member.kind
    }

    pub fn category(&self) -> MemberCategory {
        self.signature.category()
    }

    /// Can receive an override from the derived type.
    pub fn is_overridable(&self) -> bool {
        !self.hidden && self.member.kind.is_overridable()
    }

    pub fn is_abstract(&self) -> bool {
        !self.hidden && self.member.kind.is_abstract()
    }
}

/// Immutable snapshot of the inherited member set, per category.
///
/// Every list is ordered most-derived first and keeps declaration order
/// within a level.
#[derive(Clone, Debug, Default)]
pub struct InheritedMembers {
    base: TypeId,
    fields: Vec<InheritedMember>,
    properties: Vec<InheritedMember>,
    events: Vec<InheritedMember>,
    methods: Vec<InheritedMember>,
    constructors: Vec<InheritedMember>,
}

impl InheritedMembers {
    pub fn base(&self) -> TypeId {
        self.base
    }

    pub fn category(&self, category: MemberCategory) -> &[InheritedMember] {
        match category {
            MemberCategory::Field => &self.fields,
            MemberCategory::Property => &self.properties,
            MemberCategory::Event => &self.events,
            MemberCategory::Method => &self.methods,
            MemberCategory::Constructor => &self.constructors,
        }
    }

    fn category_mut(&mut self, category: MemberCategory) -> &mut Vec<InheritedMember> {
        match category {
            MemberCategory::Field => &mut self.fields,
            MemberCategory::Property => &mut self.properties,
            MemberCategory::Event => &mut self.events,
            MemberCategory::Method => &mut self.methods,
            MemberCategory::Constructor => &mut self.constructors,
        }
    }

    /// Every recorded member, category by category.
    pub fn iter(&self) -> impl Iterator<Item = &InheritedMember> {
        MemberCategory::ALL
            .into_iter()
            .flat_map(move |category| self.category(category).iter())
    }

    /// Members of the default view: hidden members left out.
    pub fn visible(&self) -> impl Iterator<Item = &InheritedMember> {
        self.iter().filter(|m| !m.hidden)
    }

    /// `visible()` or `iter()` depending on `include_hidden`.
    pub fn view(&self, include_hidden: bool) -> impl Iterator<Item = &InheritedMember> {
        self.iter().filter(move |m| include_hidden || !m.hidden)
    }

    /// The visible member occupying `signature`'s slot.
    pub fn find(&self, signature: &Signature) -> Option<&InheritedMember> {
        self.category(signature.category())
            .iter()
            .find(|m| !m.hidden && &m.signature == signature)
    }

    /// Visible members that can still be overridden, in walk order.
    pub fn overridable(&self) -> impl Iterator<Item = &InheritedMember> {
        self.iter().filter(|m| m.is_overridable())
    }

    pub fn abstract_members(&self) -> impl Iterator<Item = &InheritedMember> {
        self.iter().filter(|m| m.is_abstract())
    }

    pub fn constructors(&self) -> &[InheritedMember] {
        &self.constructors
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes [`InheritedMembers`] over a context's type universe.
pub struct HierarchyWalker<'a> {
    ctx: &'a ForgeContext,
}

impl<'a> HierarchyWalker<'a> {
    pub fn new(ctx: &'a ForgeContext) -> Self {
        Self { ctx }
    }

    /// Walk the chain starting at `base`.
    ///
    /// Fails with `InvalidArgument` when `base` is unknown or cannot be
    /// derived from, and with `CyclicHierarchy` when the chain loops or
    /// exceeds the configured depth.
    pub fn walk(&self, base: TypeId, include_hidden: bool) -> ForgeResult<InheritedMembers> {
        let chain = self.base_chain(base)?;
        let types = self.ctx.types();

        let mut inherited = InheritedMembers {
            base,
            ..InheritedMembers::default()
        };
        // Signature -> whether a dispatching member has been recorded for it,
        // hidden or not.
        let mut recorded: HashMap<Signature, bool> = HashMap::new();

        for (level, &ty) in chain.iter().enumerate() {
            for member in types.declared_members(ty) {
                let Some(visibility) = member.effective_visibility() else {
                    continue;
                };
                let signature = member.signature();
                let category = signature.category();

                if category == MemberCategory::Constructor {
                    if level == 0 {
                        inherited.constructors.push(InheritedMember {
                            signature,
                            visibility,
                            level,
                            declaring_type: ty,
                            member: member.clone(),
                            hidden: false,
                        });
                    }
                    continue;
                }

                let hidden = match recorded.get_mut(&signature) {
                    Some(true) => continue,
                    Some(dispatching) => {
                        *dispatching = member.kind.is_virtual();
                        true
                    }
                    None => {
                        recorded.insert(signature.clone(), member.kind.is_virtual());
                        false
                    }
                };
                if hidden && !include_hidden {
                    continue;
                }

                inherited.category_mut(category).push(InheritedMember {
                    signature,
                    visibility,
                    level,
                    declaring_type: ty,
                    member: member.clone(),
                    hidden,
                });
            }
        }

        tracing::debug!(
            base = %self.ctx.type_name(base),
            depth = chain.len(),
            fields = inherited.fields.len(),
            properties = inherited.properties.len(),
            events = inherited.events.len(),
            methods = inherited.methods.len(),
            constructors = inherited.constructors.len(),
            include_hidden,
            "walked base hierarchy"
        );

        Ok(inherited)
    }

    /// Base chain from `base` up to its root, most-derived first.
    fn base_chain(&self, base: TypeId) -> ForgeResult<Vec<TypeId>> {
        let types = self.ctx.types();
        let info = types
            .type_info(base)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown base type {}", base)))?;
        if !info.is_inheritable() {
            return Err(ForgeError::InvalidArgument(format!(
                "`{}` cannot be used as a base type",
                self.ctx.type_name(base)
            )));
        }

        let limit = self.ctx.config().max_hierarchy_depth;
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(base);

        while let Some(ty) = current {
            let Some(info) = types.type_info(ty) else {
                return Err(ForgeError::InvalidArgument(format!(
                    "base chain of `{}` refers to unknown type {}",
                    self.ctx.type_name(base),
                    ty
                )));
            };
            if info.flavor == TypeFlavor::Interface {
                break;
            }
            if !seen.insert(ty) || chain.len() == limit {
                return Err(ForgeError::CyclicHierarchy {
                    type_name: self.ctx.type_name(base),
                    limit,
                });
            }
            chain.push(ty);
            current = info.base;
        }

        Ok(chain)
    }
}
