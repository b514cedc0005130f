//! Shared forge context.

use std::sync::Arc;

use crate::config::ForgeConfig;
use crate::definition::{TypeAttributes, TypeDefinition};
use crate::error::ForgeResult;
use crate::hierarchy::{HierarchyWalker, InheritedMembers};
use crate::ids::TypeId;
use crate::interner::{Interner, Name};
use crate::known::KnownTypes;
use crate::signature::Signature;
use crate::universe::{TypeIntrospection, TypeUniverse};

/// Everything a definition needs from its surroundings: the interner, the
/// base-type universe and the configuration.
///
/// Cloning is cheap; clones share the interner and the universe.
#[derive(Clone)]
pub struct ForgeContext {
    interner: Arc<Interner>,
    types: Arc<dyn TypeIntrospection>,
    config: ForgeConfig,
}

impl ForgeContext {
    /// Context over an in-memory universe, with the default configuration.
    pub fn new(universe: TypeUniverse) -> Self {
        let interner = universe.interner().clone();
        Self {
            interner,
            types: Arc::new(universe),
            config: ForgeConfig::default(),
        }
    }

    /// Context over a host-supplied introspection capability.
    ///
    /// `interner` must be the one the host used for member and type names.
    pub fn with_introspection(interner: Arc<Interner>, types: Arc<dyn TypeIntrospection>) -> Self {
        Self {
            interner,
            types,
            config: ForgeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ForgeConfig) -> ForgeResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn types(&self) -> &dyn TypeIntrospection {
        self.types.as_ref()
    }

    pub fn known(&self) -> &KnownTypes {
        self.types.known()
    }

    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    // ========================================================================
    // Names
    // ========================================================================

    pub fn intern(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    pub fn str(&self, name: Name) -> String {
        self.interner.resolve(name).to_string()
    }

    pub fn type_name(&self, ty: TypeId) -> String {
        self.types
            .type_info(ty)
            .map(|info| self.str(info.name))
            .unwrap_or_else(|| ty.to_string())
    }

    pub fn describe(&self, signature: &Signature) -> String {
        signature.render(&self.interner, self.types.as_ref())
    }

    // ========================================================================
    // Hierarchy and definitions
    // ========================================================================

    pub fn walker(&self) -> HierarchyWalker<'_> {
        HierarchyWalker::new(self)
    }

    /// Members a type deriving from `base` would inherit.
    pub fn inherited_members(
        &self,
        base: TypeId,
        include_hidden: bool,
    ) -> ForgeResult<InheritedMembers> {
        self.walker().walk(base, include_hidden)
    }

    /// Start a new definition deriving from `base` (`object` when `None`).
    pub fn define(
        &self,
        name: &str,
        base: Option<TypeId>,
        attributes: TypeAttributes,
    ) -> ForgeResult<TypeDefinition> {
        let base = base.unwrap_or(self.known().default_base());
        TypeDefinition::new(self.clone(), name, base, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FinalizedType, MemberBuilder};
    use crate::ids::BodyHandle;
    use crate::member::{DeclaredMember, MemberKind, MemberShape};
    use crate::signature::MemberCategory;
    use crate::universe::{TypeFlavor, TypeInfo};
    use crate::visibility::Visibility;

    /// A host-side universe that interns its names itself.
    struct HostTypes {
        types: Vec<(TypeInfo, Vec<DeclaredMember>)>,
        known: KnownTypes,
    }

    impl TypeIntrospection for HostTypes {
        fn type_info(&self, ty: TypeId) -> Option<&TypeInfo> {
            self.types.get(ty.index()).map(|(info, _)| info)
        }

        fn declared_members(&self, ty: TypeId) -> &[DeclaredMember] {
            self.types
                .get(ty.index())
                .map(|(_, members)| members.as_slice())
                .unwrap_or(&[])
        }

        fn known(&self) -> &KnownTypes {
            &self.known
        }
    }

    /// Builtins plus an abstract `Widget` with abstract `Draw(int32)`.
    fn host_types(interner: &Interner) -> (HostTypes, TypeId) {
        let mut types: Vec<(TypeInfo, Vec<DeclaredMember>)> = Vec::new();
        let mut alloc = |name: &str, base: Option<TypeId>, flavor: TypeFlavor, is_abstract: bool| {
            types.push((
                TypeInfo {
                    name: interner.intern(name),
                    base,
                    flavor,
                    is_abstract,
                    is_sealed: flavor == TypeFlavor::Primitive,
                },
                Vec::new(),
            ));
            TypeId::new(types.len() as u32 - 1)
        };

        let object = alloc("object", None, TypeFlavor::Root, false);
        let value_type = alloc("value_type", Some(object), TypeFlavor::Root, true);
        let known = KnownTypes {
            object,
            value_type,
            void: alloc("void", None, TypeFlavor::Primitive, false),
            bool: alloc("bool", Some(value_type), TypeFlavor::Primitive, false),
            int32: alloc("int32", Some(value_type), TypeFlavor::Primitive, false),
            int64: alloc("int64", Some(value_type), TypeFlavor::Primitive, false),
            float64: alloc("float64", Some(value_type), TypeFlavor::Primitive, false),
            string: alloc("string", Some(object), TypeFlavor::Primitive, false),
            event_handler: alloc("event_handler", Some(object), TypeFlavor::Delegate, false),
        };
        let widget = alloc("Widget", Some(object), TypeFlavor::Class, true);

        types[object.index()].1.push(DeclaredMember {
            name: interner.intern(".ctor"),
            kind: MemberKind::Normal,
            shape: MemberShape::constructor(Visibility::Public, Vec::new()),
        });
        types[widget.index()].1.push(DeclaredMember {
            name: interner.intern("Draw"),
            kind: MemberKind::Abstract,
            shape: MemberShape::method(Visibility::Public, vec![known.int32], known.void),
        });
        (HostTypes { types, known }, widget)
    }

    struct OverrideCount;

    impl MemberBuilder for OverrideCount {
        type Output = usize;

        fn build(&mut self, ty: &FinalizedType<'_>) -> ForgeResult<usize> {
            Ok(ty.overrides().count())
        }
    }

    #[test]
    fn test_host_introspection_walks_and_overrides() {
        let interner = Arc::new(Interner::new());
        let (host, widget) = host_types(&interner);
        let int32 = host.known.int32;
        let ctx = ForgeContext::with_introspection(interner.clone(), Arc::new(host));

        let inherited = ctx.inherited_members(widget, false).unwrap();
        let draw = &inherited.category(MemberCategory::Method)[0];
        assert!(draw.is_abstract());
        assert_eq!(ctx.describe(&draw.signature), "method Draw(int32)");
        assert_eq!(ctx.type_name(widget), "Widget");

        let mut button = ctx
            .define("Button", Some(widget), TypeAttributes::default())
            .unwrap();
        button
            .override_method("Draw", &[int32])
            .unwrap()
            .implement(BodyHandle(7));
        assert_eq!(button.finalize(&mut OverrideCount).unwrap(), 1);
    }

    #[test]
    fn test_host_names_need_the_host_interner() {
        let interner = Interner::new();
        let (host, widget) = host_types(&interner);
        let ctx = ForgeContext::with_introspection(Arc::new(Interner::new()), Arc::new(host));

        let inherited = ctx.inherited_members(widget, false).unwrap();
        let draw = &inherited.category(MemberCategory::Method)[0];
        assert_eq!(ctx.describe(&draw.signature), "method <unknown>(<unknown>)");
    }

    #[test]
    fn test_names_round_trip_through_shared_interner() {
        let universe = TypeUniverse::new();
        let preinterned = universe.interner().intern("Speak");
        let ctx = ForgeContext::new(universe);

        assert_eq!(ctx.intern("Speak"), preinterned);
        assert_eq!(ctx.str(preinterned), "Speak");
        assert_eq!(ctx.type_name(ctx.known().int32), "int32");
        assert_eq!(ctx.type_name(TypeId(12_345)), "type#12345");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ForgeConfig {
            max_hierarchy_depth: 0,
            ..ForgeConfig::default()
        };
        assert!(ForgeContext::new(TypeUniverse::new())
            .with_config(config)
            .is_err());
    }

    #[test]
    fn test_define_defaults_to_object() {
        let ctx = ForgeContext::new(TypeUniverse::new());
        let def = ctx
            .define("Widget", None, TypeAttributes::default())
            .unwrap();
        assert_eq!(def.base(), ctx.known().object);
        assert_eq!(def.inherited(false).count(), 1);
    }
}
