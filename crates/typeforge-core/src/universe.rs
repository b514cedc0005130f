//! Base-type introspection.
//!
//! The forge never compiles base types itself. A host supplies an already
//! compiled type universe through [`TypeIntrospection`]; the hierarchy
//! walker only needs each type's metadata and its declared members.
//! [`TypeUniverse`] is the in-memory implementation used by hosts that
//! describe their types programmatically, and by the tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ForgeError, ForgeResult};
use crate::ids::TypeId;
use crate::index_vec::IndexVec;
use crate::interner::{Interner, Name};
use crate::known::KnownTypes;
use crate::member::{DeclaredMember, MemberKind, MemberShape};
use crate::visibility::Visibility;

/// Broad classification of a type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeFlavor {
    /// `object` and `value_type`.
    Root,
    Class,
    /// Never walked; cannot be used as a base.
    Interface,
    Primitive,
    Delegate,
}

/// Metadata of a type in the universe.
#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub name: Name,
    pub base: Option<TypeId>,
    pub flavor: TypeFlavor,
    pub is_abstract: bool,
    pub is_sealed: bool,
}

impl TypeInfo {
    /// Whether a generated type may derive from this one.
    pub fn is_inheritable(&self) -> bool {
        matches!(self.flavor, TypeFlavor::Root | TypeFlavor::Class) && !self.is_sealed
    }
}

/// Capability to inspect an already-compiled type universe.
pub trait TypeIntrospection: Send + Sync {
    fn type_info(&self, ty: TypeId) -> Option<&TypeInfo>;

    /// Members declared directly on `ty`, in declaration order.
    fn declared_members(&self, ty: TypeId) -> &[DeclaredMember];

    fn known(&self) -> &KnownTypes;

    fn base_of(&self, ty: TypeId) -> Option<TypeId> {
        self.type_info(ty).and_then(|info| info.base)
    }
}

#[derive(Debug)]
struct TypeEntry {
    info: TypeInfo,
    members: Vec<DeclaredMember>,
}

/// In-memory type universe.
#[derive(Debug)]
pub struct TypeUniverse {
    interner: Arc<Interner>,
    types: IndexVec<TypeId, TypeEntry>,
    by_name: HashMap<Name, TypeId>,
    known: KnownTypes,
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeUniverse {
    pub fn new() -> Self {
        Self::with_interner(Arc::new(Interner::new()))
    }

    /// Create a universe sharing an existing interner.
    pub fn with_interner(interner: Arc<Interner>) -> Self {
        let placeholder = KnownTypes {
            object: TypeId::INVALID,
            value_type: TypeId::INVALID,
            void: TypeId::INVALID,
            bool: TypeId::INVALID,
            int32: TypeId::INVALID,
            int64: TypeId::INVALID,
            float64: TypeId::INVALID,
            string: TypeId::INVALID,
            event_handler: TypeId::INVALID,
        };
        let mut universe = Self {
            interner,
            types: IndexVec::new(),
            by_name: HashMap::new(),
            known: placeholder,
        };
        universe.register_builtin_types();
        universe
    }

    fn register_builtin_types(&mut self) {
        // Roots first: every class chain ends in one of them.
        let object = self.alloc("object", None, TypeFlavor::Root, false, false);
        let value_type = self.alloc("value_type", Some(object), TypeFlavor::Root, true, false);

        let void = self.alloc("void", None, TypeFlavor::Primitive, false, true);
        let bool = self.alloc("bool", Some(value_type), TypeFlavor::Primitive, false, true);
        let int32 = self.alloc("int32", Some(value_type), TypeFlavor::Primitive, false, true);
        let int64 = self.alloc("int64", Some(value_type), TypeFlavor::Primitive, false, true);
        let float64 = self.alloc("float64", Some(value_type), TypeFlavor::Primitive, false, true);
        let string = self.alloc("string", Some(object), TypeFlavor::Primitive, false, true);
        let event_handler = self.alloc("event_handler", Some(object), TypeFlavor::Delegate, false, true);

        // Roots expose nothing but a public parameterless constructor.
        let ctor = self.interner.intern(".ctor");
        for root in [object, value_type] {
            self.types[root].members.push(DeclaredMember {
                name: ctor,
                kind: MemberKind::Normal,
                shape: MemberShape::constructor(Visibility::Public, Vec::new()),
            });
        }

        self.known = KnownTypes {
            object,
            value_type,
            void,
            bool,
            int32,
            int64,
            float64,
            string,
            event_handler,
        };
    }

    fn alloc(
        &mut self,
        name: &str,
        base: Option<TypeId>,
        flavor: TypeFlavor,
        is_abstract: bool,
        is_sealed: bool,
    ) -> TypeId {
        let name = self.interner.intern(name);
        let id = self.types.push(TypeEntry {
            info: TypeInfo {
                name,
                base,
                flavor,
                is_abstract,
                is_sealed,
            },
            members: Vec::new(),
        });
        self.by_name.insert(name, id);
        id
    }

    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    pub fn known(&self) -> &KnownTypes {
        &self.known
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        let name = self.interner.lookup(name)?;
        self.by_name.get(&name).copied()
    }

    pub fn name_of(&self, ty: TypeId) -> Option<Arc<str>> {
        self.types
            .get(ty)
            .map(|entry| self.interner.resolve(entry.info.name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Define a class deriving from `base` (`object` when `None`).
    pub fn define_class(&mut self, name: &str, base: Option<TypeId>) -> ForgeResult<TypeId> {
        self.check_fresh_name(name)?;
        let base = base.unwrap_or(self.known.object);
        let info = self.entry(base)?;
        if !info.info.is_inheritable() {
            return Err(ForgeError::InvalidArgument(format!(
                "`{}` cannot be used as a base type",
                self.interner.resolve(info.info.name)
            )));
        }
        Ok(self.alloc(name, Some(base), TypeFlavor::Class, false, false))
    }

    pub fn define_interface(&mut self, name: &str) -> ForgeResult<TypeId> {
        self.check_fresh_name(name)?;
        Ok(self.alloc(name, None, TypeFlavor::Interface, true, false))
    }

    pub fn set_abstract(&mut self, ty: TypeId, is_abstract: bool) -> ForgeResult<()> {
        self.class_entry_mut(ty)?.info.is_abstract = is_abstract;
        Ok(())
    }

    pub fn set_sealed(&mut self, ty: TypeId, is_sealed: bool) -> ForgeResult<()> {
        self.class_entry_mut(ty)?.info.is_sealed = is_sealed;
        Ok(())
    }

    /// Declare a member on `ty`.
    ///
    /// Abstract members are only accepted on abstract types. Override
    /// members are trusted as already checked by whatever compiled `ty`.
    pub fn declare(
        &mut self,
        ty: TypeId,
        name: &str,
        kind: MemberKind,
        shape: MemberShape,
    ) -> ForgeResult<()> {
        for referenced in shape_types(&shape) {
            self.entry(referenced)?;
        }
        let entry = self.entry(ty)?;
        if kind.is_abstract() && !entry.info.is_abstract {
            return Err(ForgeError::InvalidArgument(format!(
                "abstract member `{}` declared on non-abstract type `{}`",
                name,
                self.interner.resolve(entry.info.name)
            )));
        }

        let name = match shape {
            MemberShape::Constructor { .. } => self.interner.intern(".ctor"),
            _ => self.interner.intern(name),
        };
        self.types[ty].members.push(DeclaredMember { name, kind, shape });
        Ok(())
    }

    fn check_fresh_name(&self, name: &str) -> ForgeResult<()> {
        if name.trim().is_empty() {
            return Err(ForgeError::InvalidArgument("type name is empty".into()));
        }
        if self.lookup(name).is_some() {
            return Err(ForgeError::InvalidArgument(format!(
                "type `{}` is already defined",
                name
            )));
        }
        Ok(())
    }

    fn entry(&self, ty: TypeId) -> ForgeResult<&TypeEntry> {
        self.types
            .get(ty)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown type {}", ty)))
    }

    fn class_entry_mut(&mut self, ty: TypeId) -> ForgeResult<&mut TypeEntry> {
        let entry = self
            .types
            .get_mut(ty)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown type {}", ty)))?;
        if entry.info.flavor != TypeFlavor::Class {
            return Err(ForgeError::InvalidArgument(format!(
                "{} is not a user-defined class",
                ty
            )));
        }
        Ok(entry)
    }
}

fn shape_types(shape: &MemberShape) -> Vec<TypeId> {
    match shape {
        MemberShape::Field { ty, .. }
        | MemberShape::Property { ty, .. }
        | MemberShape::Event { ty, .. } => vec![*ty],
        MemberShape::Method { params, ret, .. } => {
            params.iter().copied().chain(std::iter::once(*ret)).collect()
        }
        MemberShape::Constructor { params, .. } => params.clone(),
    }
}

impl TypeIntrospection for TypeUniverse {
    fn type_info(&self, ty: TypeId) -> Option<&TypeInfo> {
        self.types.get(ty).map(|entry| &entry.info)
    }

    fn declared_members(&self, ty: TypeId) -> &[DeclaredMember] {
        self.types
            .get(ty)
            .map(|entry| entry.members.as_slice())
            .unwrap_or(&[])
    }

    fn known(&self) -> &KnownTypes {
        &self.known
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let universe = TypeUniverse::new();
        let known = *universe.known();

        assert_eq!(universe.lookup("object"), Some(known.object));
        assert_eq!(universe.lookup("string"), Some(known.string));
        assert!(known.is_root(known.value_type));
        assert_eq!(universe.base_of(known.object), None);
        assert_eq!(universe.declared_members(known.object).len(), 1);
    }

    #[test]
    fn test_define_class_defaults_to_object() {
        let mut universe = TypeUniverse::new();
        let animal = universe.define_class("Animal", None).unwrap();
        let dog = universe.define_class("Dog", Some(animal)).unwrap();

        assert_eq!(universe.base_of(animal), Some(universe.known().object));
        assert_eq!(universe.base_of(dog), Some(animal));
        assert_eq!(&*universe.name_of(dog).unwrap(), "Dog");
    }

    #[test]
    fn test_rejects_bad_bases_and_duplicates() {
        let mut universe = TypeUniverse::new();
        let string = universe.known().string;
        let shape = universe.define_interface("IShape").unwrap();

        assert!(universe.define_class("Text", Some(string)).is_err());
        assert!(universe.define_class("Circle", Some(shape)).is_err());
        assert!(universe.define_class("IShape", None).is_err());
        assert!(universe.define_class("  ", None).is_err());
    }

    #[test]
    fn test_abstract_member_requires_abstract_type() {
        let mut universe = TypeUniverse::new();
        let void = universe.known().void;
        let animal = universe.define_class("Animal", None).unwrap();

        let speak = MemberShape::method(Visibility::Public, Vec::new(), void);
        let err = universe
            .declare(animal, "Speak", MemberKind::Abstract, speak.clone())
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArgument(_)));

        universe.set_abstract(animal, true).unwrap();
        universe
            .declare(animal, "Speak", MemberKind::Abstract, speak)
            .unwrap();
        assert_eq!(universe.declared_members(animal).len(), 1);
    }

    #[test]
    fn test_declare_rejects_unknown_types() {
        let mut universe = TypeUniverse::new();
        let animal = universe.define_class("Animal", None).unwrap();
        let bogus = MemberShape::field(Visibility::Public, TypeId(9_999));
        assert!(universe
            .declare(animal, "Age", MemberKind::Normal, bogus)
            .is_err());
    }
}
