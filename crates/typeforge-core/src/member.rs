//! Member kinds and shapes shared by declared and generated members.

use serde::Serialize;

use crate::ids::{BodyHandle, MemberId, TypeId};
use crate::interner::Name;
use crate::signature::{MemberCategory, Signature};
use crate::visibility::{effective_visibility, Visibility};

/// Dispatch kind of a member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum MemberKind {
    /// No body; must be overridden by concrete subclasses.
    Abstract,
    /// Has a body and introduces a dispatch slot.
    Virtual,
    /// Replaces an inherited slot. A sealed override ends the chain.
    Override { sealed: bool },
    /// Instance member without dispatch.
    Normal,
    Static,
}

impl MemberKind {
    /// Takes part in virtual dispatch.
    pub fn is_virtual(self) -> bool {
        matches!(
            self,
            MemberKind::Abstract | MemberKind::Virtual | MemberKind::Override { .. }
        )
    }

    /// Can still be overridden by a subclass.
    pub fn is_overridable(self) -> bool {
        matches!(
            self,
            MemberKind::Abstract | MemberKind::Virtual | MemberKind::Override { sealed: false }
        )
    }

    pub fn is_abstract(self) -> bool {
        matches!(self, MemberKind::Abstract)
    }
}

/// Category-specific shape of a member.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum MemberShape {
    Field {
        ty: TypeId,
        visibility: Visibility,
    },
    Property {
        ty: TypeId,
        getter: Option<Visibility>,
        setter: Option<Visibility>,
    },
    Event {
        ty: TypeId,
        add: Visibility,
        remove: Visibility,
    },
    Method {
        params: Vec<TypeId>,
        ret: TypeId,
        visibility: Visibility,
    },
    Constructor {
        params: Vec<TypeId>,
        visibility: Visibility,
    },
}

impl MemberShape {
    pub fn field(visibility: Visibility, ty: TypeId) -> Self {
        MemberShape::Field { ty, visibility }
    }

    pub fn property(ty: TypeId, getter: Option<Visibility>, setter: Option<Visibility>) -> Self {
        MemberShape::Property { ty, getter, setter }
    }

    /// Event whose add and remove accessors share one visibility.
    pub fn event(visibility: Visibility, ty: TypeId) -> Self {
        MemberShape::Event {
            ty,
            add: visibility,
            remove: visibility,
        }
    }

    pub fn method(visibility: Visibility, params: impl Into<Vec<TypeId>>, ret: TypeId) -> Self {
        MemberShape::Method {
            params: params.into(),
            ret,
            visibility,
        }
    }

    pub fn constructor(visibility: Visibility, params: impl Into<Vec<TypeId>>) -> Self {
        MemberShape::Constructor {
            params: params.into(),
            visibility,
        }
    }

    pub fn category(&self) -> MemberCategory {
        match self {
            MemberShape::Field { .. } => MemberCategory::Field,
            MemberShape::Property { .. } => MemberCategory::Property,
            MemberShape::Event { .. } => MemberCategory::Event,
            MemberShape::Method { .. } => MemberCategory::Method,
            MemberShape::Constructor { .. } => MemberCategory::Constructor,
        }
    }

    /// Visibility of every accessor the member has.
    pub fn accessor_visibilities(&self) -> Vec<Visibility> {
        match self {
            MemberShape::Field { visibility, .. }
            | MemberShape::Method { visibility, .. }
            | MemberShape::Constructor { visibility, .. } => vec![*visibility],
            MemberShape::Property { getter, setter, .. } => {
                getter.iter().chain(setter.iter()).copied().collect()
            }
            MemberShape::Event { add, remove, .. } => vec![*add, *remove],
        }
    }

    /// Signature of a member with this shape called `name`.
    pub fn signature(&self, name: Name) -> Signature {
        match self {
            MemberShape::Field { ty, .. } => Signature::field(name, *ty),
            MemberShape::Property { ty, .. } => Signature::property(name, *ty),
            MemberShape::Event { ty, .. } => Signature::event(name, *ty),
            MemberShape::Method { params, .. } => Signature::method(name, params.clone()),
            MemberShape::Constructor { params, .. } => Signature::constructor(params.clone()),
        }
    }

    /// Whether a concrete member of this shape needs an executable body.
    pub fn needs_body(&self) -> bool {
        !matches!(self, MemberShape::Field { .. })
    }
}

/// A member declared on an already-compiled type.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DeclaredMember {
    pub name: Name,
    pub kind: MemberKind,
    pub shape: MemberShape,
}

impl DeclaredMember {
    pub fn signature(&self) -> Signature {
        self.shape.signature(self.name)
    }

    /// Narrowest reachable accessor level, or `None` if a foreign subclass
    /// cannot see the member at all.
    pub fn effective_visibility(&self) -> Option<Visibility> {
        effective_visibility(self.shape.accessor_visibilities())
    }
}

/// A member contributed to a [`TypeDefinition`](crate::definition::TypeDefinition).
///
/// Identity fields are fixed once the member is added; only the body can
/// be attached afterwards, so the owning definition's indexes stay valid.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedMember {
    pub(crate) name: Name,
    pub(crate) signature: Signature,
    pub(crate) kind: MemberKind,
    pub(crate) visibility: Visibility,
    pub(crate) shape: MemberShape,
    /// Executable body supplied by the instruction emitter.
    pub(crate) body: Option<BodyHandle>,
    /// Declaring type of the inherited member this one overrides.
    pub(crate) overrides: Option<TypeId>,
    /// Raiser method attached to an event.
    pub(crate) raiser: Option<MemberId>,
    /// Inherited constructor a generated constructor chains to.
    pub(crate) base_constructor: Option<Signature>,
}

impl GeneratedMember {
    pub(crate) fn new(name: Name, kind: MemberKind, shape: MemberShape) -> Self {
        let accessors = shape.accessor_visibilities();
        let visibility = effective_visibility(accessors.iter().copied())
            .or_else(|| accessors.first().copied())
            .unwrap_or(Visibility::Private);
        Self {
            name,
            signature: shape.signature(name),
            kind,
            visibility,
            shape,
            body: None,
            overrides: None,
            raiser: None,
            base_constructor: None,
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn shape(&self) -> &MemberShape {
        &self.shape
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn overrides(&self) -> Option<TypeId> {
        self.overrides
    }

    pub fn raiser(&self) -> Option<MemberId> {
        self.raiser
    }

    pub fn base_constructor(&self) -> Option<&Signature> {
        self.base_constructor.as_ref()
    }

    pub fn category(&self) -> MemberCategory {
        self.signature.category()
    }

    /// Attach an executable body.
    pub fn implement(&mut self, body: BodyHandle) -> &mut Self {
        self.body = Some(body);
        self
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Missing a body it must have before finalize.
    pub fn lacks_required_body(&self) -> bool {
        !self.kind.is_abstract() && self.shape.needs_body() && self.body.is_none()
    }
}
