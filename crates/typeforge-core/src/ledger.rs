//! Override ledger: which inherited dispatch slots have been overridden.
//!
//! The ledger is seeded once from the overridable members of an inherited
//! snapshot. Each slot moves from `Unbound` to `Bound` at most once.
//! Whether unbound abstract slots are acceptable depends on the type being
//! abstract or not, which is checked at finalize, not here.

use std::collections::HashMap;

use thiserror::Error;

use crate::hierarchy::InheritedMembers;
use crate::ids::MemberId;
use crate::signature::Signature;

/// State of one overridable slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlotState {
    Unbound,
    Bound(MemberId),
}

#[derive(Clone, Debug)]
struct Slot {
    signature: Signature,
    is_abstract: bool,
    state: SlotState,
}

/// Why a registration was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("slot already bound to {existing}")]
    DuplicateOverride { existing: MemberId },
    #[error("signature was never reported as overridable")]
    UnknownMember,
}

/// Bookkeeping of overrides for one type definition.
#[derive(Clone, Debug, Default)]
pub struct OverrideLedger {
    slots: Vec<Slot>,
    by_signature: HashMap<Signature, usize>,
}

impl OverrideLedger {
    /// Seed from the visible overridable members of `inherited`, in walk order.
    pub fn seed(inherited: &InheritedMembers) -> Self {
        let mut ledger = Self::default();
        for member in inherited.overridable() {
            if ledger.by_signature.contains_key(&member.signature) {
                continue;
            }
            ledger
                .by_signature
                .insert(member.signature.clone(), ledger.slots.len());
            ledger.slots.push(Slot {
                signature: member.signature.clone(),
                is_abstract: member.is_abstract(),
                state: SlotState::Unbound,
            });
        }
        ledger
    }

    /// Abstract slots still waiting for an override, in walk order.
    pub fn unbound_abstract(&self) -> impl Iterator<Item = &Signature> {
        self.slots
            .iter()
            .filter(|slot| slot.is_abstract && slot.state == SlotState::Unbound)
            .map(|slot| &slot.signature)
    }

    /// Validate a registration without changing anything.
    pub fn check(&self, signature: &Signature) -> Result<(), LedgerError> {
        let index = self
            .by_signature
            .get(signature)
            .ok_or(LedgerError::UnknownMember)?;
        match self.slots[*index].state {
            SlotState::Unbound => Ok(()),
            SlotState::Bound(existing) => Err(LedgerError::DuplicateOverride { existing }),
        }
    }

    /// Bind `signature` to `member`.
    ///
    /// On failure the ledger is unchanged; on success the member id is
    /// handed back so the caller can keep working with it.
    pub fn register(
        &mut self,
        signature: &Signature,
        member: MemberId,
    ) -> Result<MemberId, LedgerError> {
        self.check(signature)?;
        let index = self.by_signature[signature];
        self.slots[index].state = SlotState::Bound(member);
        tracing::trace!(%member, "override bound");
        Ok(member)
    }

    pub fn state(&self, signature: &Signature) -> Option<SlotState> {
        self.by_signature
            .get(signature)
            .map(|&index| self.slots[index].state)
    }

    pub fn bound_member(&self, signature: &Signature) -> Option<MemberId> {
        match self.state(signature)? {
            SlotState::Bound(member) => Some(member),
            SlotState::Unbound => None,
        }
    }

    pub fn is_bound(&self, signature: &Signature) -> bool {
        self.bound_member(signature).is_some()
    }

    /// Number of overridable slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ForgeContext;
    use crate::hierarchy::HierarchyWalker;
    use crate::ids::TypeId;
    use crate::member::{MemberKind, MemberShape};
    use crate::universe::TypeUniverse;
    use crate::visibility::Visibility;

    /// Abstract `Shape` with abstract `Area`, `Perimeter`, virtual `Name`
    /// and a non-virtual `Id`.
    fn shape_ledger() -> (ForgeContext, OverrideLedger, TypeId) {
        let mut universe = TypeUniverse::new();
        let known = *universe.known();
        let shape = universe.define_class("Shape", None).unwrap();
        universe.set_abstract(shape, true).unwrap();

        let float = MemberShape::method(Visibility::Public, Vec::new(), known.float64);
        universe
            .declare(shape, "Area", MemberKind::Abstract, float.clone())
            .unwrap();
        universe
            .declare(shape, "Perimeter", MemberKind::Abstract, float)
            .unwrap();
        universe
            .declare(
                shape,
                "Name",
                MemberKind::Virtual,
                MemberShape::property(known.string, Some(Visibility::Public), None),
            )
            .unwrap();
        universe
            .declare(
                shape,
                "Id",
                MemberKind::Normal,
                MemberShape::method(Visibility::Public, Vec::new(), known.int32),
            )
            .unwrap();

        let ctx = ForgeContext::new(universe);
        let inherited = HierarchyWalker::new(&ctx).walk(shape, true).unwrap();
        let ledger = OverrideLedger::seed(&inherited);
        (ctx, ledger, shape)
    }

    fn method(ctx: &ForgeContext, name: &str) -> Signature {
        Signature::method(ctx.intern(name), Vec::new())
    }

    #[test]
    fn test_seeded_from_overridable_members() {
        let (ctx, ledger, _) = shape_ledger();
        assert_eq!(ledger.len(), 3);

        let unbound: Vec<_> = ledger.unbound_abstract().cloned().collect();
        assert_eq!(unbound, vec![method(&ctx, "Area"), method(&ctx, "Perimeter")]);
    }

    #[test]
    fn test_register_binds_once() {
        let (ctx, mut ledger, _) = shape_ledger();
        let area = method(&ctx, "Area");

        assert_eq!(ledger.register(&area, MemberId::new(0)), Ok(MemberId::new(0)));
        assert_eq!(
            ledger.register(&area, MemberId::new(1)),
            Err(LedgerError::DuplicateOverride {
                existing: MemberId::new(0)
            })
        );
        // The first registration survives the rejected one.
        assert_eq!(ledger.bound_member(&area), Some(MemberId::new(0)));

        let unbound: Vec<_> = ledger.unbound_abstract().cloned().collect();
        assert_eq!(unbound, vec![method(&ctx, "Perimeter")]);
    }

    #[test]
    fn test_unknown_and_non_virtual_signatures() {
        let (ctx, mut ledger, _) = shape_ledger();

        let missing = method(&ctx, "Volume");
        assert_eq!(
            ledger.register(&missing, MemberId::new(0)),
            Err(LedgerError::UnknownMember)
        );
        let id = method(&ctx, "Id");
        assert_eq!(ledger.check(&id), Err(LedgerError::UnknownMember));
        assert_eq!(ledger.state(&id), None);
    }

    #[test]
    fn test_virtual_slot_is_not_abstract() {
        let (ctx, mut ledger, _) = shape_ledger();
        let name = Signature::property(ctx.intern("Name"), ctx.known().string);

        assert_eq!(ledger.state(&name), Some(SlotState::Unbound));
        ledger.register(&name, MemberId::new(3)).unwrap();
        assert!(ledger.is_bound(&name));
        assert_eq!(ledger.unbound_abstract().count(), 2);
    }
}
