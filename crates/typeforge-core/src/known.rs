//! Builtin types every type universe starts with.
//!
//! [`TypeUniverse::new`](crate::universe::TypeUniverse::new) registers these
//! before any host type, so their ids are available to signatures and as
//! default base types.

use crate::ids::TypeId;

/// Ids of the builtin types registered at universe construction.
#[derive(Debug, Clone, Copy)]
pub struct KnownTypes {
    // Root bases
    pub object: TypeId,
    pub value_type: TypeId,

    // Primitives
    pub void: TypeId,
    pub bool: TypeId,
    pub int32: TypeId,
    pub int64: TypeId,
    pub float64: TypeId,
    pub string: TypeId,

    // Delegate type used by events
    pub event_handler: TypeId,
}

impl KnownTypes {
    /// The implicit base of a definition that names none.
    pub fn default_base(&self) -> TypeId {
        self.object
    }

    pub fn is_root(&self, ty: TypeId) -> bool {
        ty == self.object || ty == self.value_type
    }
}
