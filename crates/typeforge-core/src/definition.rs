//! The type definition aggregate.
//!
//! A [`TypeDefinition`] is the description of one generated type. At
//! construction it walks the base hierarchy once and seeds its override
//! ledger from the result. Members are then added or overridden until
//! [`TypeDefinition::finalize`] validates the set, hands it to a
//! [`MemberBuilder`] and seals the definition.
//!
//! Every mutating call is all-or-nothing: when it fails, the definition is
//! exactly as it was before the call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::{FinalizedType, MemberBuilder};
use crate::context::ForgeContext;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::{ForgeError, ForgeResult};
use crate::hierarchy::{InheritedMember, InheritedMembers};
use crate::ids::{BodyHandle, MemberId, TypeId};
use crate::index_vec::IndexVec;
use crate::interner::Name;
use crate::ledger::{LedgerError, OverrideLedger};
use crate::member::{GeneratedMember, MemberKind, MemberShape};
use crate::signature::{MemberCategory, Signature};
use crate::universe::TypeFlavor;
use crate::visibility::{effective_visibility, Visibility};

/// Diagnostic code for a generated member hiding an inherited one.
pub const HIDES_INHERITED: &str = "hides-inherited";

/// Type-level modifiers of a definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TypeAttributes {
    pub is_abstract: bool,
    pub is_sealed: bool,
}

impl TypeAttributes {
    pub fn abstract_type() -> Self {
        Self {
            is_abstract: true,
            is_sealed: false,
        }
    }

    pub fn sealed_type() -> Self {
        Self {
            is_abstract: false,
            is_sealed: true,
        }
    }
}

/// Description of a type being generated.
pub struct TypeDefinition {
    ctx: ForgeContext,
    name: Name,
    base: TypeId,
    attributes: TypeAttributes,
    /// Hidden-inclusive snapshot, computed once.
    inherited: Arc<InheritedMembers>,
    ledger: OverrideLedger,
    members: IndexVec<MemberId, GeneratedMember>,
    by_signature: HashMap<Signature, MemberId>,
    fields: Vec<MemberId>,
    properties: Vec<MemberId>,
    events: Vec<MemberId>,
    methods: Vec<MemberId>,
    constructors: Vec<MemberId>,
    diagnostics: Diagnostics,
    finalized: bool,
}

impl TypeDefinition {
    /// Create a definition named `name` deriving from `base`.
    pub fn new(
        ctx: ForgeContext,
        name: &str,
        base: TypeId,
        attributes: TypeAttributes,
    ) -> ForgeResult<Self> {
        if name.trim().is_empty() {
            return Err(ForgeError::InvalidArgument("type name is empty".into()));
        }
        check_attributes(name, attributes)?;

        let inherited = Arc::new(ctx.walker().walk(base, true)?);
        let ledger = OverrideLedger::seed(&inherited);
        tracing::debug!(
            type_name = name,
            base = %ctx.type_name(base),
            overridable = ledger.len(),
            unbound_abstract = ledger.unbound_abstract().count(),
            "created type definition"
        );

        Ok(Self {
            name: ctx.intern(name),
            ctx,
            base,
            attributes,
            inherited,
            ledger,
            members: IndexVec::new(),
            by_signature: HashMap::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            diagnostics: Diagnostics::new(),
            finalized: false,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn context(&self) -> &ForgeContext {
        &self.ctx
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn type_name(&self) -> String {
        self.ctx.str(self.name)
    }

    pub fn base(&self) -> TypeId {
        self.base
    }

    pub fn attributes(&self) -> TypeAttributes {
        self.attributes
    }

    pub fn is_abstract(&self) -> bool {
        self.attributes.is_abstract
    }

    /// Whether a successful finalize has sealed the definition.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn set_abstract(&mut self, is_abstract: bool) -> ForgeResult<()> {
        self.ensure_open()?;
        let attributes = TypeAttributes {
            is_abstract,
            ..self.attributes
        };
        check_attributes(&self.type_name(), attributes)?;
        self.attributes = attributes;
        Ok(())
    }

    pub fn set_sealed(&mut self, is_sealed: bool) -> ForgeResult<()> {
        self.ensure_open()?;
        let attributes = TypeAttributes {
            is_sealed,
            ..self.attributes
        };
        check_attributes(&self.type_name(), attributes)?;
        self.attributes = attributes;
        Ok(())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn ledger(&self) -> &OverrideLedger {
        &self.ledger
    }

    // ========================================================================
    // Inherited members
    // ========================================================================

    /// Inherited members; hidden ones only when `include_hidden` is set.
    pub fn inherited(&self, include_hidden: bool) -> impl Iterator<Item = &InheritedMember> {
        self.inherited.view(include_hidden)
    }

    pub fn inherited_snapshot(&self) -> &InheritedMembers {
        &self.inherited
    }

    /// Shared handle to the snapshot, readable from other threads.
    pub fn shared_inherited(&self) -> Arc<InheritedMembers> {
        Arc::clone(&self.inherited)
    }

    pub fn find_inherited(&self, signature: &Signature) -> Option<&InheritedMember> {
        self.inherited.find(signature)
    }

    /// Inherited abstract members that still have no override, in walk order.
    pub fn unbound_abstract(&self) -> impl Iterator<Item = &InheritedMember> {
        self.ledger
            .unbound_abstract()
            .filter_map(move |signature| self.inherited.find(signature))
    }

    // ========================================================================
    // Generated members
    // ========================================================================

    pub fn member(&self, id: MemberId) -> Option<&GeneratedMember> {
        self.members.get(id)
    }

    pub fn member_mut(&mut self, id: MemberId) -> ForgeResult<&mut GeneratedMember> {
        self.ensure_open()?;
        self.members
            .get_mut(id)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown {}", id)))
    }

    pub fn find(&self, signature: &Signature) -> Option<(MemberId, &GeneratedMember)> {
        let id = *self.by_signature.get(signature)?;
        Some((id, &self.members[id]))
    }

    /// All generated members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = (MemberId, &GeneratedMember)> {
        self.members.iter_enumerated()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Generated members of one category in insertion order.
    pub fn category(&self, category: MemberCategory) -> impl Iterator<Item = &GeneratedMember> {
        self.category_ids(category)
            .iter()
            .map(move |&id| &self.members[id])
    }

    pub fn fields(&self) -> impl Iterator<Item = &GeneratedMember> {
        self.category(MemberCategory::Field)
    }

    pub fn properties(&self) -> impl Iterator<Item = &GeneratedMember> {
        self.category(MemberCategory::Property)
    }

    pub fn events(&self) -> impl Iterator<Item = &GeneratedMember> {
        self.category(MemberCategory::Event)
    }

    pub fn methods(&self) -> impl Iterator<Item = &GeneratedMember> {
        self.category(MemberCategory::Method)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &GeneratedMember> {
        self.category(MemberCategory::Constructor)
    }

    fn category_ids(&self, category: MemberCategory) -> &[MemberId] {
        match category {
            MemberCategory::Field => &self.fields,
            MemberCategory::Property => &self.properties,
            MemberCategory::Event => &self.events,
            MemberCategory::Method => &self.methods,
            MemberCategory::Constructor => &self.constructors,
        }
    }

    /// Attach a body to a generated member.
    pub fn implement(&mut self, id: MemberId, body: BodyHandle) -> ForgeResult<()> {
        self.member_mut(id)?.implement(body);
        Ok(())
    }

    // ========================================================================
    // Adding members
    // ========================================================================

    pub fn add_field(
        &mut self,
        name: &str,
        kind: MemberKind,
        ty: TypeId,
        visibility: Visibility,
    ) -> ForgeResult<&mut GeneratedMember> {
        if !matches!(kind, MemberKind::Normal | MemberKind::Static) {
            return Err(ForgeError::InvalidArgument(format!(
                "field `{}` cannot be {:?}",
                name, kind
            )));
        }
        self.add_new(name, kind, MemberShape::field(visibility, ty))
    }

    pub fn add_property(
        &mut self,
        name: &str,
        kind: MemberKind,
        ty: TypeId,
        getter: Option<Visibility>,
        setter: Option<Visibility>,
    ) -> ForgeResult<&mut GeneratedMember> {
        if getter.is_none() && setter.is_none() {
            return Err(ForgeError::InvalidArgument(format!(
                "property `{}` needs at least one accessor",
                name
            )));
        }
        self.add_new(name, kind, MemberShape::property(ty, getter, setter))
    }

    pub fn add_event(
        &mut self,
        name: &str,
        kind: MemberKind,
        ty: TypeId,
        visibility: Visibility,
    ) -> ForgeResult<&mut GeneratedMember> {
        self.add_new(name, kind, MemberShape::event(visibility, ty))
    }

    pub fn add_method(
        &mut self,
        name: &str,
        kind: MemberKind,
        params: &[TypeId],
        ret: TypeId,
        visibility: Visibility,
    ) -> ForgeResult<&mut GeneratedMember> {
        self.add_new(name, kind, MemberShape::method(visibility, params, ret))
    }

    /// Add a constructor chaining to the inherited constructor taking
    /// `base_params`.
    pub fn add_constructor(
        &mut self,
        params: &[TypeId],
        visibility: Visibility,
        base_params: &[TypeId],
    ) -> ForgeResult<&mut GeneratedMember> {
        self.ensure_open()?;
        let base_constructor = Signature::constructor(base_params);
        if self.inherited.find(&base_constructor).is_none() {
            return Err(ForgeError::UnknownMember {
                type_name: self.type_name(),
                signature: self.ctx.describe(&base_constructor),
            });
        }
        let member = self.add_new(
            ".ctor",
            MemberKind::Normal,
            MemberShape::constructor(visibility, params),
        )?;
        member.base_constructor = Some(base_constructor);
        Ok(member)
    }

    /// Attach a raiser method `raise_<event>` to a generated event.
    pub fn add_raiser(
        &mut self,
        event: MemberId,
        visibility: Visibility,
    ) -> ForgeResult<&mut GeneratedMember> {
        self.ensure_open()?;
        let member = self
            .members
            .get(event)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown {}", event)))?;
        let MemberShape::Event { ty, .. } = member.shape else {
            return Err(ForgeError::InvalidArgument(format!(
                "{} is not an event",
                event
            )));
        };
        if member.raiser.is_some() {
            return Err(ForgeError::InvalidArgument(format!(
                "event `{}` already has a raiser",
                self.ctx.str(member.name)
            )));
        }

        let raiser_name = format!("raise_{}", self.ctx.str(member.name));
        let void = self.ctx.known().void;
        let raiser = self.push_new(
            &raiser_name,
            MemberKind::Normal,
            MemberShape::method(visibility, vec![ty], void),
        )?;
        self.members[event].raiser = Some(raiser);
        Ok(&mut self.members[raiser])
    }

    fn add_new(
        &mut self,
        name: &str,
        kind: MemberKind,
        shape: MemberShape,
    ) -> ForgeResult<&mut GeneratedMember> {
        self.ensure_open()?;
        let id = self.push_new(name, kind, shape)?;
        Ok(&mut self.members[id])
    }

    fn push_new(&mut self, name: &str, kind: MemberKind, shape: MemberShape) -> ForgeResult<MemberId> {
        if name.trim().is_empty() {
            return Err(ForgeError::InvalidArgument("member name is empty".into()));
        }
        if matches!(kind, MemberKind::Override { .. }) {
            return Err(ForgeError::InvalidArgument(format!(
                "`{}` must be added through an override call",
                name
            )));
        }
        if shape.category() == MemberCategory::Constructor && kind != MemberKind::Normal {
            return Err(ForgeError::InvalidArgument(
                "constructors cannot be virtual, abstract or static".into(),
            ));
        }
        self.check_shape_types(&shape)?;

        let member = GeneratedMember::new(self.ctx.intern(name), kind, shape);
        self.check_unique(&member.signature)?;

        let hides = self
            .inherited
            .find(&member.signature)
            .filter(|m| m.category() != MemberCategory::Constructor)
            .map(|m| m.declaring_type);
        if let Some(declaring_type) = hides {
            self.note_hiding(&member.signature, declaring_type);
        }
        Ok(self.push(member))
    }

    // ========================================================================
    // Overriding inherited members
    // ========================================================================

    /// Override the inherited member occupying `signature`'s slot.
    ///
    /// The override keeps the inherited shape. Accessors a foreign subclass
    /// cannot reach are dropped and `protected internal` narrows to
    /// `protected`.
    pub fn override_member(
        &mut self,
        signature: &Signature,
        sealed: bool,
    ) -> ForgeResult<&mut GeneratedMember> {
        self.ensure_open()?;
        self.ledger
            .check(signature)
            .map_err(|e| self.ledger_error(e, signature))?;
        self.check_unique(signature)?;

        let inherited = self.inherited.find(signature).ok_or_else(|| {
            ForgeError::UnknownMember {
                type_name: self.type_name(),
                signature: self.ctx.describe(signature),
            }
        })?;
        let mut member = GeneratedMember::new(
            inherited.member.name,
            MemberKind::Override { sealed },
            override_shape(&inherited.member.shape),
        );
        member.overrides = Some(inherited.declaring_type);

        let id = self.members.next_idx();
        self.ledger
            .register(signature, id)
            .map_err(|e| self.ledger_error(e, signature))?;
        let id = self.push(member);
        tracing::debug!(
            type_name = %self.type_name(),
            member = %self.ctx.describe(signature),
            sealed,
            "registered override"
        );
        Ok(&mut self.members[id])
    }

    pub fn override_method(
        &mut self,
        name: &str,
        params: &[TypeId],
    ) -> ForgeResult<&mut GeneratedMember> {
        let signature = Signature::method(self.ctx.intern(name), params);
        self.override_member(&signature, false)
    }

    pub fn override_property(&mut self, name: &str, ty: TypeId) -> ForgeResult<&mut GeneratedMember> {
        let signature = Signature::property(self.ctx.intern(name), ty);
        self.override_member(&signature, false)
    }

    pub fn override_event(&mut self, name: &str, ty: TypeId) -> ForgeResult<&mut GeneratedMember> {
        let signature = Signature::event(self.ctx.intern(name), ty);
        self.override_member(&signature, false)
    }

    // ========================================================================
    // Finalize
    // ========================================================================

    /// Pre-finalize checks.
    ///
    /// A non-abstract definition must override every inherited abstract
    /// member and may not declare abstract members of its own. With
    /// `require_bodies` configured, every concrete member that needs a body
    /// must have one.
    pub fn validate(&self) -> ForgeResult<()> {
        self.ensure_open()?;

        if !self.is_abstract() {
            let missing: Vec<String> = self
                .ledger
                .unbound_abstract()
                .map(|signature| self.ctx.describe(signature))
                .collect();
            if !missing.is_empty() {
                return Err(ForgeError::IncompleteAbstractOverride {
                    type_name: self.type_name(),
                    missing,
                });
            }

            if let Some((_, member)) = self.members().find(|(_, m)| m.kind.is_abstract()) {
                return Err(ForgeError::AbstractMemberInConcreteType {
                    type_name: self.type_name(),
                    signature: self.ctx.describe(&member.signature),
                });
            }
        }

        if self.ctx.config().require_bodies {
            if let Some((_, member)) = self.members().find(|(_, m)| m.lacks_required_body()) {
                return Err(ForgeError::MissingBody {
                    type_name: self.type_name(),
                    signature: self.ctx.describe(&member.signature),
                });
            }
        }

        Ok(())
    }

    /// Validate, hand the member set to `builder`, and seal the definition.
    ///
    /// If the builder fails the definition stays open and unchanged.
    pub fn finalize<B: MemberBuilder>(&mut self, builder: &mut B) -> ForgeResult<B::Output> {
        self.validate()?;
        let output = builder.build(&FinalizedType::new(self))?;
        self.finalized = true;
        tracing::debug!(
            type_name = %self.type_name(),
            members = self.members.len(),
            overrides = self.members.iter().filter(|m| m.overrides.is_some()).count(),
            "finalized type definition"
        );
        Ok(output)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_open(&self) -> ForgeResult<()> {
        if self.finalized {
            return Err(ForgeError::DefinitionSealed {
                type_name: self.type_name(),
            });
        }
        Ok(())
    }

    fn check_unique(&self, signature: &Signature) -> ForgeResult<()> {
        if self.by_signature.contains_key(signature) {
            return Err(ForgeError::DuplicateMember {
                type_name: self.type_name(),
                signature: self.ctx.describe(signature),
            });
        }
        Ok(())
    }

    fn check_shape_types(&self, shape: &MemberShape) -> ForgeResult<()> {
        let void = self.ctx.known().void;
        let (values, ret): (&[TypeId], Option<TypeId>) = match shape {
            MemberShape::Field { ty, .. }
            | MemberShape::Property { ty, .. }
            | MemberShape::Event { ty, .. } => (std::slice::from_ref(ty), None),
            MemberShape::Method { params, ret, .. } => (params.as_slice(), Some(*ret)),
            MemberShape::Constructor { params, .. } => (params.as_slice(), None),
        };

        for &ty in values.iter().chain(ret.iter()) {
            if self.ctx.types().type_info(ty).is_none() {
                return Err(ForgeError::InvalidArgument(format!("unknown type {}", ty)));
            }
        }
        if values.contains(&void) {
            return Err(ForgeError::InvalidArgument(
                "`void` is only valid as a return type".into(),
            ));
        }
        if let MemberShape::Event { ty, .. } = shape {
            let is_delegate = self
                .ctx
                .types()
                .type_info(*ty)
                .is_some_and(|info| info.flavor == TypeFlavor::Delegate);
            if !is_delegate {
                return Err(ForgeError::InvalidArgument(format!(
                    "event type `{}` is not a delegate",
                    self.ctx.type_name(*ty)
                )));
            }
        }
        Ok(())
    }

    fn note_hiding(&mut self, signature: &Signature, declaring_type: TypeId) {
        if !self.ctx.config().warn_on_hiding {
            return;
        }
        let member = self.ctx.describe(signature);
        let declared_on = self.ctx.type_name(declaring_type);
        tracing::warn!(
            type_name = %self.type_name(),
            member = %member,
            declared_on = %declared_on,
            "generated member hides an inherited member"
        );
        self.diagnostics.push(
            Diagnostic::warning(format!("`{}` hides an inherited member", member))
                .with_code(HIDES_INHERITED)
                .with_note(format!("declared on `{}`", declared_on)),
        );
    }

    fn push(&mut self, member: GeneratedMember) -> MemberId {
        let category = member.category();
        let signature = member.signature.clone();
        let id = self.members.push(member);
        self.by_signature.insert(signature, id);
        match category {
            MemberCategory::Field => self.fields.push(id),
            MemberCategory::Property => self.properties.push(id),
            MemberCategory::Event => self.events.push(id),
            MemberCategory::Method => self.methods.push(id),
            MemberCategory::Constructor => self.constructors.push(id),
        }
        id
    }

    fn ledger_error(&self, error: LedgerError, signature: &Signature) -> ForgeError {
        let type_name = self.type_name();
        let signature = self.ctx.describe(signature);
        match error {
            LedgerError::DuplicateOverride { .. } => ForgeError::DuplicateOverride {
                type_name,
                signature,
            },
            LedgerError::UnknownMember => ForgeError::UnknownMember {
                type_name,
                signature,
            },
        }
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("name", &self.type_name())
            .field("base", &self.base)
            .field("attributes", &self.attributes)
            .field("members", &self.members.len())
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

fn check_attributes(name: &str, attributes: TypeAttributes) -> ForgeResult<()> {
    if attributes.is_abstract && attributes.is_sealed {
        return Err(ForgeError::InvalidArgument(format!(
            "type `{}` cannot be both abstract and sealed",
            name
        )));
    }
    Ok(())
}

/// Shape of an override as seen from another assembly.
fn override_shape(inherited: &MemberShape) -> MemberShape {
    let narrow = |vis: Visibility| match vis {
        Visibility::ProtectedInternal => Visibility::Protected,
        other => other,
    };
    let reachable = |vis: Option<Visibility>| {
        vis.filter(|v| v.is_externally_reachable()).map(narrow)
    };

    match inherited {
        MemberShape::Property { ty, getter, setter } => MemberShape::Property {
            ty: *ty,
            getter: reachable(*getter),
            setter: reachable(*setter),
        },
        MemberShape::Event { ty, add, remove } => {
            // Both accessors must exist; an unreachable one takes the level
            // of the reachable one.
            let shared = effective_visibility([*add, *remove]).map(narrow);
            let accessor = |vis: Visibility| match reachable(Some(vis)) {
                Some(vis) => vis,
                None => shared.unwrap_or(vis),
            };
            MemberShape::Event {
                ty: *ty,
                add: accessor(*add),
                remove: accessor(*remove),
            }
        }
        MemberShape::Method {
            params,
            ret,
            visibility,
        } => MemberShape::Method {
            params: params.clone(),
            ret: *ret,
            visibility: narrow(*visibility),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgeConfig;
    use crate::universe::TypeUniverse;

    /// `Animal` (abstract): abstract `Speak()`, abstract property `Legs`,
    /// virtual `Describe()`, normal `Id()`, virtual event `Moved`,
    /// protected ctor `(string)`.
    fn animal_context() -> (ForgeContext, TypeId) {
        let mut universe = TypeUniverse::new();
        let known = *universe.known();
        let animal = universe.define_class("Animal", None).unwrap();
        universe.set_abstract(animal, true).unwrap();

        universe
            .declare(
                animal,
                "Speak",
                MemberKind::Abstract,
                MemberShape::method(Visibility::Public, Vec::new(), known.string),
            )
            .unwrap();
        universe
            .declare(
                animal,
                "Legs",
                MemberKind::Abstract,
                MemberShape::property(known.int32, Some(Visibility::Public), Some(Visibility::ProtectedInternal)),
            )
            .unwrap();
        universe
            .declare(
                animal,
                "Describe",
                MemberKind::Virtual,
                MemberShape::method(Visibility::ProtectedInternal, vec![known.bool], known.string),
            )
            .unwrap();
        universe
            .declare(
                animal,
                "Id",
                MemberKind::Normal,
                MemberShape::method(Visibility::Public, Vec::new(), known.int64),
            )
            .unwrap();
        universe
            .declare(
                animal,
                "Moved",
                MemberKind::Virtual,
                MemberShape::event(Visibility::Public, known.event_handler),
            )
            .unwrap();
        universe
            .declare(
                animal,
                "",
                MemberKind::Normal,
                MemberShape::constructor(Visibility::Protected, vec![known.string]),
            )
            .unwrap();

        (ForgeContext::new(universe), animal)
    }

    struct CountingBuilder {
        builds: usize,
        fail: bool,
    }

    impl MemberBuilder for CountingBuilder {
        type Output = Vec<String>;

        fn build(&mut self, ty: &FinalizedType<'_>) -> ForgeResult<Vec<String>> {
            if self.fail {
                return Err(ForgeError::Backend("slot table full".into()));
            }
            self.builds += 1;
            let ctx = ty.definition().context();
            Ok(ty
                .members()
                .map(|(_, m)| ctx.describe(m.signature()))
                .collect())
        }
    }

    fn builder() -> CountingBuilder {
        CountingBuilder {
            builds: 0,
            fail: false,
        }
    }

    fn dog(ctx: &ForgeContext, animal: TypeId) -> TypeDefinition {
        ctx.define("Dog", Some(animal), TypeAttributes::default()).unwrap()
    }

    fn override_everything(def: &mut TypeDefinition) {
        let int32 = def.context().known().int32;
        def.override_method("Speak", &[]).unwrap().implement(BodyHandle(1));
        def.override_property("Legs", int32).unwrap().implement(BodyHandle(2));
    }

    #[test]
    fn test_snapshot_and_ledger_seeded_at_construction() {
        let (ctx, animal) = animal_context();
        let def = dog(&ctx, animal);

        assert_eq!(def.ledger().len(), 4);
        let unbound: Vec<_> = def
            .unbound_abstract()
            .map(|m| ctx.str(m.member.name))
            .collect();
        assert_eq!(unbound, vec!["Legs", "Speak"]);
        assert_eq!(def.inherited(false).count(), 6);
        assert_eq!(def.member_count(), 0);
    }

    #[test]
    fn test_add_members_go_to_their_category() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);

        def.add_field("name", MemberKind::Normal, known.string, Visibility::Private)
            .unwrap();
        def.add_property(
            "Owner",
            MemberKind::Virtual,
            known.string,
            Some(Visibility::Public),
            Some(Visibility::Protected),
        )
        .unwrap();
        def.add_method("Fetch", MemberKind::Normal, &[known.int32], known.bool, Visibility::Public)
            .unwrap();
        def.add_event("Barked", MemberKind::Normal, known.event_handler, Visibility::Public)
            .unwrap();
        let (barked, _) = def
            .find(&Signature::event(ctx.intern("Barked"), known.event_handler))
            .unwrap();
        def.add_constructor(&[], Visibility::Public, &[known.string])
            .unwrap();
        def.add_raiser(barked, Visibility::Protected).unwrap();

        assert_eq!(def.fields().count(), 1);
        assert_eq!(def.properties().count(), 1);
        assert_eq!(def.events().count(), 1);
        assert_eq!(def.methods().count(), 2);
        assert_eq!(def.constructors().count(), 1);

        let owner = def.properties().next().unwrap();
        assert_eq!(owner.visibility(), Visibility::Protected);

        let raiser = def.member(barked).unwrap().raiser().unwrap();
        assert_eq!(ctx.str(def.member(raiser).unwrap().name()), "raise_Barked");
        assert_eq!(
            def.constructors().next().unwrap().base_constructor(),
            Some(&Signature::constructor(vec![known.string]))
        );
    }

    #[test]
    fn test_add_rejects_bad_input_without_side_effects() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);

        def.add_field("age", MemberKind::Normal, known.int32, Visibility::Private)
            .unwrap();
        let duplicate = def
            .add_field("age", MemberKind::Static, known.int32, Visibility::Public)
            .unwrap_err();
        assert!(matches!(duplicate, ForgeError::DuplicateMember { .. }));

        let cases = [
            def.add_field("f", MemberKind::Virtual, known.int32, Visibility::Public).err(),
            def.add_field("", MemberKind::Normal, known.int32, Visibility::Public).err(),
            def.add_field("v", MemberKind::Normal, known.void, Visibility::Public).err(),
            def.add_property("P", MemberKind::Normal, known.int32, None, None).err(),
            def.add_event("E", MemberKind::Normal, known.int32, Visibility::Public).err(),
            def.add_method("M", MemberKind::Override { sealed: false }, &[], known.void, Visibility::Public).err(),
            def.add_method("M", MemberKind::Normal, &[TypeId(9_999)], known.void, Visibility::Public).err(),
        ];
        for err in cases {
            assert!(matches!(err, Some(ForgeError::InvalidArgument(_))), "{:?}", err);
        }

        let err = def
            .add_constructor(&[], Visibility::Public, &[known.int32])
            .unwrap_err();
        assert!(matches!(err, ForgeError::UnknownMember { .. }));
        assert_eq!(def.member_count(), 1);
    }

    #[test]
    fn test_override_keeps_inherited_shape() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);

        let legs = def.override_property("Legs", known.int32).unwrap();
        assert_eq!(legs.kind(), MemberKind::Override { sealed: false });
        assert_eq!(legs.overrides(), Some(animal));
        assert_eq!(
            legs.shape(),
            &MemberShape::property(known.int32, Some(Visibility::Public), Some(Visibility::Protected))
        );

        let describe = def.override_method("Describe", &[known.bool]).unwrap();
        assert_eq!(describe.visibility(), Visibility::Protected);

        let legs_sig = Signature::property(ctx.intern("Legs"), known.int32);
        assert!(def.ledger().is_bound(&legs_sig));
        assert_eq!(def.unbound_abstract().count(), 1);
    }

    #[test]
    fn test_second_override_is_rejected() {
        let (ctx, animal) = animal_context();
        let mut def = dog(&ctx, animal);

        def.override_method("Speak", &[]).unwrap();
        let err = def.override_method("Speak", &[]).unwrap_err();
        assert!(matches!(err, ForgeError::DuplicateOverride { .. }));

        // The first registration stays valid and queryable.
        let speak = Signature::method(ctx.intern("Speak"), Vec::new());
        let (id, member) = def.find(&speak).unwrap();
        assert_eq!(def.ledger().bound_member(&speak), Some(id));
        assert_eq!(member.kind(), MemberKind::Override { sealed: false });
        assert_eq!(def.member_count(), 1);
    }

    #[test]
    fn test_method_identity_excludes_return_type() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);

        def.add_method("Run", MemberKind::Normal, &[known.int32], known.int32, Visibility::Public)
            .unwrap();
        let err = def
            .add_method("Run", MemberKind::Normal, &[known.int32], known.string, Visibility::Public)
            .unwrap_err();
        assert!(matches!(err, ForgeError::DuplicateMember { .. }), "{:?}", err);

        // `Speak` returns string; the override binds by name and parameters.
        let speak = def.override_method("Speak", &[]).unwrap();
        assert_eq!(
            speak.shape(),
            &MemberShape::method(Visibility::Public, Vec::new(), known.string)
        );
        let speak = Signature::method(ctx.intern("Speak"), Vec::new());
        assert!(def.ledger().is_bound(&speak));
        assert_eq!(def.member_count(), 2);
    }

    #[test]
    fn test_override_event_drops_unreachable_accessor_level() {
        let mut universe = TypeUniverse::new();
        let handler = universe.known().event_handler;
        let source = universe.define_class("Source", None).unwrap();
        let events = [
            ("Changed", Visibility::Public, Visibility::Private),
            ("Closed", Visibility::Internal, Visibility::ProtectedInternal),
        ];
        for (name, add, remove) in events {
            universe
                .declare(source, name, MemberKind::Virtual, MemberShape::Event { ty: handler, add, remove })
                .unwrap();
        }
        let ctx = ForgeContext::new(universe);
        let mut def = ctx
            .define("Sink", Some(source), TypeAttributes::default())
            .unwrap();

        let changed = def.override_event("Changed", handler).unwrap();
        assert_eq!(
            changed.shape(),
            &MemberShape::Event {
                ty: handler,
                add: Visibility::Public,
                remove: Visibility::Public,
            }
        );
        let closed = def.override_event("Closed", handler).unwrap();
        assert_eq!(
            closed.shape(),
            &MemberShape::Event {
                ty: handler,
                add: Visibility::Protected,
                remove: Visibility::Protected,
            }
        );
    }

    #[test]
    fn test_override_of_unknown_or_non_virtual_member() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);

        for err in [
            def.override_method("Fly", &[]).unwrap_err(),
            def.override_method("Id", &[]).unwrap_err(),
            def.override_method("Speak", &[known.int32]).unwrap_err(),
        ] {
            assert!(matches!(err, ForgeError::UnknownMember { .. }), "{:?}", err);
        }
        assert_eq!(def.member_count(), 0);
    }

    #[test]
    fn test_new_member_then_override_conflicts() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);

        def.add_method("Describe", MemberKind::Normal, &[known.bool], known.string, Visibility::Public)
            .unwrap();
        assert_eq!(def.diagnostics().by_code(HIDES_INHERITED).count(), 1);

        let err = def.override_method("Describe", &[known.bool]).unwrap_err();
        assert!(matches!(err, ForgeError::DuplicateMember { .. }));
        let describe = Signature::method(ctx.intern("Describe"), vec![known.bool]);
        assert!(!def.ledger().is_bound(&describe));
    }

    #[test]
    fn test_hiding_warning_can_be_disabled() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let ctx = ctx
            .with_config(ForgeConfig {
                warn_on_hiding: false,
                ..ForgeConfig::default()
            })
            .unwrap();
        let mut def = dog(&ctx, animal);

        def.add_method("Id", MemberKind::Normal, &[], known.int64, Visibility::Public)
            .unwrap();
        assert!(def.diagnostics().is_empty());
    }

    #[test]
    fn test_incomplete_overrides_fail_finalize() {
        let (ctx, animal) = animal_context();
        let mut def = dog(&ctx, animal);
        def.override_method("Speak", &[]).unwrap().implement(BodyHandle(1));

        let mut backend = builder();
        let err = def.finalize(&mut backend).unwrap_err();
        match &err {
            ForgeError::IncompleteAbstractOverride { type_name, missing } => {
                assert_eq!(type_name, "Dog");
                assert_eq!(missing, &vec!["property Legs: int32".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.is_configuration());
        assert_eq!(backend.builds, 0);
        assert!(!def.is_finalized());

        // The same definition marked abstract may leave them unbound.
        def.set_abstract(true).unwrap();
        def.finalize(&mut backend).unwrap();
        assert_eq!(backend.builds, 1);
    }

    #[test]
    fn test_complete_definition_finalizes_and_seals() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);
        override_everything(&mut def);

        let mut backend = builder();
        let built = def.finalize(&mut backend).unwrap();
        assert_eq!(built, vec!["method Speak()", "property Legs: int32"]);
        assert!(def.is_finalized());

        let sealed = [
            def.add_field("late", MemberKind::Normal, known.int32, Visibility::Private).err(),
            def.override_method("Describe", &[known.bool]).err(),
            def.set_abstract(true).err(),
            def.add_constructor(&[], Visibility::Public, &[known.int32]).err(),
            def.finalize(&mut backend).err(),
        ];
        for err in sealed {
            assert!(matches!(err, Some(ForgeError::DefinitionSealed { .. })), "{:?}", err);
        }
        assert_eq!(backend.builds, 1);
    }

    #[test]
    fn test_backend_failure_leaves_definition_open() {
        let (ctx, animal) = animal_context();
        let mut def = dog(&ctx, animal);
        override_everything(&mut def);

        let mut failing = CountingBuilder {
            builds: 0,
            fail: true,
        };
        let err = def.finalize(&mut failing).unwrap_err();
        assert!(matches!(err, ForgeError::Backend(_)));
        assert!(!def.is_finalized());

        def.finalize(&mut builder()).unwrap();
    }

    #[test]
    fn test_missing_bodies_and_abstract_members() {
        let (ctx, animal) = animal_context();
        let known = *ctx.known();
        let mut def = dog(&ctx, animal);
        override_everything(&mut def);

        def.add_method("Sleep", MemberKind::Abstract, &[], known.void, Visibility::Public)
            .unwrap();
        let err = def.validate().unwrap_err();
        assert!(matches!(err, ForgeError::AbstractMemberInConcreteType { .. }));

        let mut def = dog(&ctx, animal);
        override_everything(&mut def);
        def.add_method("Wag", MemberKind::Normal, &[], known.void, Visibility::Public)
            .unwrap();
        let err = def.validate().unwrap_err();
        assert!(matches!(err, ForgeError::MissingBody { .. }));

        let relaxed = ctx
            .with_config(ForgeConfig {
                require_bodies: false,
                ..ForgeConfig::default()
            })
            .unwrap();
        let mut def = dog(&relaxed, animal);
        override_everything(&mut def);
        def.add_method("Wag", MemberKind::Normal, &[], known.void, Visibility::Public)
            .unwrap();
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_attribute_rules() {
        let (ctx, animal) = animal_context();
        let both = TypeAttributes {
            is_abstract: true,
            is_sealed: true,
        };
        assert!(ctx.define("Broken", Some(animal), both).is_err());
        assert!(ctx.define("", Some(animal), TypeAttributes::default()).is_err());

        let mut def = ctx
            .define("Puppy", Some(animal), TypeAttributes::sealed_type())
            .unwrap();
        assert!(def.set_abstract(true).is_err());
        assert!(!def.is_abstract());
        def.set_sealed(false).unwrap();
        def.set_abstract(true).unwrap();
        assert!(def.is_abstract());
    }

    #[test]
    fn test_snapshot_is_shareable_across_threads() {
        let (ctx, animal) = animal_context();
        let def = dog(&ctx, animal);
        let snapshot = def.shared_inherited();

        let count = std::thread::spawn(move || snapshot.visible().count())
            .join()
            .unwrap();
        assert_eq!(count, def.inherited(false).count());
    }
}
