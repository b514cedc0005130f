//! Member signatures: the identity key for hiding and override matching.
//!
//! Two members occupy the same slot iff their signatures are equal.
//! Fields, properties and events are keyed by name and type; methods by
//! name and ordered parameter types; constructors by parameter types alone.
//! Return types never take part in overload identity.

use serde::Serialize;
use std::fmt;

use crate::ids::TypeId;
use crate::interner::{Interner, Name};
use crate::universe::TypeIntrospection;

/// Category of a member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize)]
pub enum MemberCategory {
    Field,
    Property,
    Event,
    Method,
    Constructor,
}

impl MemberCategory {
    pub const ALL: [MemberCategory; 5] = [
        MemberCategory::Field,
        MemberCategory::Property,
        MemberCategory::Event,
        MemberCategory::Method,
        MemberCategory::Constructor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MemberCategory::Field => "field",
            MemberCategory::Property => "property",
            MemberCategory::Event => "event",
            MemberCategory::Method => "method",
            MemberCategory::Constructor => "constructor",
        }
    }
}

impl fmt::Display for MemberCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value-type identity key of a member.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum Signature {
    Field { name: Name, ty: TypeId },
    Property { name: Name, ty: TypeId },
    Event { name: Name, ty: TypeId },
    Method { name: Name, params: Vec<TypeId> },
    Constructor { params: Vec<TypeId> },
}

impl Signature {
    pub fn field(name: Name, ty: TypeId) -> Self {
        Signature::Field { name, ty }
    }

    pub fn property(name: Name, ty: TypeId) -> Self {
        Signature::Property { name, ty }
    }

    pub fn event(name: Name, ty: TypeId) -> Self {
        Signature::Event { name, ty }
    }

    pub fn method(name: Name, params: impl Into<Vec<TypeId>>) -> Self {
        Signature::Method {
            name,
            params: params.into(),
        }
    }

    pub fn constructor(params: impl Into<Vec<TypeId>>) -> Self {
        Signature::Constructor {
            params: params.into(),
        }
    }

    pub fn category(&self) -> MemberCategory {
        match self {
            Signature::Field { .. } => MemberCategory::Field,
            Signature::Property { .. } => MemberCategory::Property,
            Signature::Event { .. } => MemberCategory::Event,
            Signature::Method { .. } => MemberCategory::Method,
            Signature::Constructor { .. } => MemberCategory::Constructor,
        }
    }

    /// Member name; constructors are unnamed.
    pub fn name(&self) -> Option<Name> {
        match self {
            Signature::Field { name, .. }
            | Signature::Property { name, .. }
            | Signature::Event { name, .. }
            | Signature::Method { name, .. } => Some(*name),
            Signature::Constructor { .. } => None,
        }
    }

    /// Ordered parameter types. Empty for fields, properties and events.
    pub fn params(&self) -> &[TypeId] {
        match self {
            Signature::Method { params, .. } | Signature::Constructor { params } => params,
            _ => &[],
        }
    }

    /// Human readable form, e.g. `method Speak(int32, string)`.
    pub fn render(&self, names: &Interner, types: &dyn TypeIntrospection) -> String {
        let type_name = |ty: TypeId| -> String {
            types
                .type_info(ty)
                .map(|info| names.resolve(info.name).to_string())
                .unwrap_or_else(|| ty.to_string())
        };
        let param_list = |params: &[TypeId]| -> String {
            params
                .iter()
                .map(|&ty| type_name(ty))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self {
            Signature::Field { name, ty }
            | Signature::Property { name, ty }
            | Signature::Event { name, ty } => format!(
                "{} {}: {}",
                self.category(),
                names.resolve(*name),
                type_name(*ty)
            ),
            Signature::Method { name, params } => {
                format!("method {}({})", names.resolve(*name), param_list(params))
            }
            Signature::Constructor { params } => format!(".ctor({})", param_list(params)),
        }
    }
}
