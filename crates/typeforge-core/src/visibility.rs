//! Visibility levels and accessor reachability.
//!
//! A type generated by the forge always lives outside the assembly of its
//! base types, so only members reachable from a foreign subclass can be
//! seen or overridden: `Protected`, `ProtectedInternal` and `Public`.
//! `Private` and `Internal` members never surface.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical visibility level of a member or accessor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Visibility {
    Private,
    Internal,
    Protected,
    ProtectedInternal,
    Public,
}

impl Visibility {
    /// Whether a subclass in another assembly can reach this level.
    pub fn is_externally_reachable(self) -> bool {
        matches!(
            self,
            Visibility::Protected | Visibility::ProtectedInternal | Visibility::Public
        )
    }

    /// Width of a reachable level as seen from a foreign subclass.
    /// Unreachable levels have no width.
    fn external_width(self) -> Option<u8> {
        match self {
            Visibility::Private | Visibility::Internal => None,
            Visibility::Protected => Some(0),
            Visibility::ProtectedInternal => Some(1),
            Visibility::Public => Some(2),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Protected => "protected",
            Visibility::ProtectedInternal => "protected internal",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective visibility of a member from the levels of its accessors.
///
/// Returns `None` when no accessor is externally reachable. Otherwise the
/// narrowest reachable accessor decides: a public getter paired with a
/// protected setter yields `Protected`, while a private setter is ignored.
pub fn effective_visibility<I>(accessors: I) -> Option<Visibility>
where
    I: IntoIterator<Item = Visibility>,
{
    accessors
        .into_iter()
        .filter_map(|vis| vis.external_width().map(|width| (width, vis)))
        .min_by_key(|(width, _)| *width)
        .map(|(_, vis)| vis)
}
