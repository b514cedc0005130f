//! typeforge-smith: Random type hierarchy generator for property tests
//!
//! This crate generates random but **valid** base-type universes and module
//! dependency graphs using the `arbitrary` crate. Everything generated is
//! accepted by `typeforge-core` as-is, so tests can go straight to the
//! hierarchy walker, the override ledger and the module resolver.
//!
//! # Architecture
//!
//! The generator keeps just enough state to stay valid:
//! - Types are generated in order; a base is always an earlier type
//! - Inheritance depth is capped by `Config::max_depth`
//! - Abstract members only appear on abstract types, with reachable accessors
//! - Signatures are unique within one type
//! - Module dependencies always point at earlier modules, so the graph is a DAG
//!
//! # Usage
//!
//! ```rust,ignore
//! use arbitrary::Unstructured;
//! use typeforge_smith::HierarchySpec;
//!
//! let data: &[u8] = /* from fuzzer */;
//! let mut u = Unstructured::new(data);
//! let spec: HierarchySpec = u.arbitrary()?;
//! let built = spec.build()?;
//! ```

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{ensure, Context as _};
use arbitrary::{Arbitrary, Result, Unstructured};
use typeforge_core::{
    KnownTypes, MemberKind, MemberShape, ModuleGraph, ModuleId, TypeId, TypeUniverse, Visibility,
};

/// Configuration for the generator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of generated types.
    pub max_types: usize,
    /// Maximum inheritance depth below `object`.
    pub max_depth: usize,
    /// Maximum number of members per type.
    pub max_members: usize,
    /// Size of the member name pool. Small pools make hiding and
    /// overriding across levels common.
    pub name_pool: usize,
    /// Maximum number of method or constructor parameters.
    pub max_params: usize,
    /// Maximum number of modules in a module graph.
    pub max_modules: usize,
    /// Maximum number of dependencies per module.
    pub max_module_deps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_types: 6,
            max_depth: 4,
            max_members: 8,
            name_pool: 4,
            max_params: 2,
            max_modules: 10,
            max_module_deps: 3,
        }
    }
}

// ============================================================================
// Hierarchies
// ============================================================================

/// A generated base-type universe.
#[derive(Debug, Clone)]
pub struct HierarchySpec {
    pub types: Vec<TypeSpec>,
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    /// Index of an earlier type in the spec; `None` derives from `object`.
    pub base: Option<usize>,
    pub is_abstract: bool,
    pub members: Vec<MemberSpec>,
}

#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub name: String,
    pub kind: MemberKind,
    pub shape: ShapeSpec,
}

/// Member shape over primitive type slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeSpec {
    Field {
        ty: Primitive,
        visibility: Visibility,
    },
    Property {
        ty: Primitive,
        getter: Option<Visibility>,
        setter: Option<Visibility>,
    },
    Event {
        visibility: Visibility,
    },
    Method {
        params: Vec<Primitive>,
        ret: Option<Primitive>,
        visibility: Visibility,
    },
    Constructor {
        params: Vec<Primitive>,
        visibility: Visibility,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    Int32,
    Int64,
    Float64,
    String,
}

impl Primitive {
    const ALL: [Primitive; 5] = [
        Primitive::Bool,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::Float64,
        Primitive::String,
    ];

    fn resolve(self, known: &KnownTypes) -> TypeId {
        match self {
            Primitive::Bool => known.bool,
            Primitive::Int32 => known.int32,
            Primitive::Int64 => known.int64,
            Primitive::Float64 => known.float64,
            Primitive::String => known.string,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Float64 => "float64",
            Primitive::String => "string",
        }
    }
}

/// A hierarchy materialized into a [`TypeUniverse`].
pub struct BuiltHierarchy {
    pub universe: TypeUniverse,
    /// Generated types, in spec order.
    pub types: Vec<TypeId>,
}

impl HierarchySpec {
    /// Generate a hierarchy with the given configuration.
    pub fn arbitrary_with_config(u: &mut Unstructured, config: &Config) -> Result<Self> {
        let mut ctx = GenerationContext::new(config.clone());
        let num_types: usize = u.int_in_range(1..=config.max_types)?;
        let types = (0..num_types)
            .map(|_| ctx.arbitrary_type(u))
            .collect::<Result<_>>()?;
        Ok(HierarchySpec { types })
    }

    /// Materialize the spec into a fresh universe.
    pub fn build(&self) -> anyhow::Result<BuiltHierarchy> {
        let mut universe = TypeUniverse::new();
        let known = *universe.known();
        let mut types: Vec<TypeId> = Vec::with_capacity(self.types.len());

        for spec in &self.types {
            let base = match spec.base {
                Some(index) => {
                    ensure!(index < types.len(), "`{}` derives from a later type", spec.name);
                    Some(types[index])
                }
                None => None,
            };
            let ty = universe
                .define_class(&spec.name, base)
                .with_context(|| format!("defining `{}`", spec.name))?;
            universe.set_abstract(ty, spec.is_abstract)?;

            for member in &spec.members {
                universe
                    .declare(ty, &member.name, member.kind, member.shape.to_shape(&known))
                    .with_context(|| format!("declaring `{}.{}`", spec.name, member.name))?;
            }
            types.push(ty);
        }

        Ok(BuiltHierarchy { universe, types })
    }
}

impl<'a> Arbitrary<'a> for HierarchySpec {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Self::arbitrary_with_config(u, &Config::default())
    }
}

impl ShapeSpec {
    fn to_shape(&self, known: &KnownTypes) -> MemberShape {
        let list = |params: &[Primitive]| -> Vec<TypeId> {
            params.iter().map(|p| p.resolve(known)).collect()
        };
        match self {
            ShapeSpec::Field { ty, visibility } => MemberShape::field(*visibility, ty.resolve(known)),
            ShapeSpec::Property { ty, getter, setter } => {
                MemberShape::property(ty.resolve(known), *getter, *setter)
            }
            ShapeSpec::Event { visibility } => MemberShape::event(*visibility, known.event_handler),
            ShapeSpec::Method {
                params,
                ret,
                visibility,
            } => MemberShape::method(
                *visibility,
                list(params),
                ret.map_or(known.void, |r| r.resolve(known)),
            ),
            ShapeSpec::Constructor { params, visibility } => {
                MemberShape::constructor(*visibility, list(params))
            }
        }
    }

    /// Identity of the slot this shape occupies under `name`.
    fn slot_key(&self, name: &str) -> (u8, String, Vec<Primitive>) {
        match self {
            ShapeSpec::Field { ty, .. } => (0, name.to_string(), vec![*ty]),
            ShapeSpec::Property { ty, .. } => (1, name.to_string(), vec![*ty]),
            ShapeSpec::Event { .. } => (2, name.to_string(), Vec::new()),
            ShapeSpec::Method { params, .. } => (3, name.to_string(), params.clone()),
            ShapeSpec::Constructor { params, .. } => (4, String::new(), params.clone()),
        }
    }
}

impl fmt::Display for HierarchySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for spec in &self.types {
            let base = spec
                .base
                .map_or("object", |index| self.types[index].name.as_str());
            let modifier = if spec.is_abstract { "abstract " } else { "" };
            writeln!(f, "{}class {} : {} {{", modifier, spec.name, base)?;
            for member in &spec.members {
                writeln!(f, "    {:?} {}", member.kind, member.render())?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl MemberSpec {
    fn render(&self) -> String {
        let params = |params: &[Primitive]| {
            params
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match &self.shape {
            ShapeSpec::Field { ty, visibility } => {
                format!("{} {}: {}", visibility, self.name, ty.as_str())
            }
            ShapeSpec::Property { ty, getter, setter } => format!(
                "{}: {} {{ get: {:?}, set: {:?} }}",
                self.name,
                ty.as_str(),
                getter,
                setter
            ),
            ShapeSpec::Event { visibility } => format!("{} event {}", visibility, self.name),
            ShapeSpec::Method {
                params: list,
                ret,
                visibility,
            } => format!(
                "{} {}({}) -> {}",
                visibility,
                self.name,
                params(list),
                ret.map_or("void", |r| r.as_str())
            ),
            ShapeSpec::Constructor {
                params: list,
                visibility,
            } => format!("{} .ctor({})", visibility, params(list)),
        }
    }
}

// ============================================================================
// Module graphs
// ============================================================================

/// A generated module dependency DAG.
#[derive(Debug, Clone)]
pub struct ModuleDagSpec {
    pub modules: Vec<ModuleSpec>,
}

#[derive(Debug, Clone)]
pub struct ModuleSpec {
    pub name: String,
    /// Indices of earlier modules this one depends on.
    pub deps: Vec<usize>,
}

impl ModuleDagSpec {
    pub fn arbitrary_with_config(u: &mut Unstructured, config: &Config) -> Result<Self> {
        let mut ctx = GenerationContext::new(config.clone());
        let num_modules: usize = u.int_in_range(1..=config.max_modules)?;
        let mut modules = Vec::with_capacity(num_modules);

        for index in 0..num_modules {
            let mut deps = BTreeSet::new();
            if index > 0 {
                let num_deps: usize = u.int_in_range(0..=config.max_module_deps)?;
                for _ in 0..num_deps {
                    deps.insert(u.int_in_range(0..=index - 1)?);
                }
            }
            modules.push(ModuleSpec {
                name: ctx.fresh_name("module"),
                deps: deps.into_iter().collect(),
            });
        }

        Ok(ModuleDagSpec { modules })
    }

    /// Modules no other module depends on.
    pub fn roots(&self) -> Vec<usize> {
        let depended: BTreeSet<usize> = self
            .modules
            .iter()
            .flat_map(|m| m.deps.iter().copied())
            .collect();
        (0..self.modules.len())
            .filter(|index| !depended.contains(index))
            .collect()
    }

    /// Build the graph; ids are assigned in spec order.
    pub fn to_graph(&self) -> anyhow::Result<(ModuleGraph, Vec<ModuleId>)> {
        let mut graph = ModuleGraph::new();
        let ids: Vec<ModuleId> = self.modules.iter().map(|m| graph.add(&m.name)).collect();
        for (index, module) in self.modules.iter().enumerate() {
            for &dep in &module.deps {
                ensure!(dep < index, "`{}` depends on a later module", module.name);
                graph.depend_on(ids[index], ids[dep])?;
            }
        }
        Ok((graph, ids))
    }
}

impl<'a> Arbitrary<'a> for ModuleDagSpec {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Self::arbitrary_with_config(u, &Config::default())
    }
}

// ============================================================================
// Generation state
// ============================================================================

/// Tracks state during generation to ensure validity.
struct GenerationContext {
    config: Config,
    /// Depth below `object` of every generated type, in order.
    depths: Vec<usize>,
    /// Counter for unique names.
    name_counter: usize,
}

impl GenerationContext {
    fn new(config: Config) -> Self {
        Self {
            config,
            depths: Vec::new(),
            name_counter: 0,
        }
    }

    fn fresh_name(&mut self, prefix: &str) -> String {
        self.name_counter += 1;
        format!("{}{}", prefix, self.name_counter)
    }

    fn arbitrary_type(&mut self, u: &mut Unstructured) -> Result<TypeSpec> {
        let candidates: Vec<usize> = self
            .depths
            .iter()
            .enumerate()
            .filter(|(_, &depth)| depth < self.config.max_depth)
            .map(|(index, _)| index)
            .collect();
        let base = if !candidates.is_empty() && u.ratio(3u8, 4u8)? {
            Some(*u.choose(&candidates)?)
        } else {
            None
        };
        let depth = base.map_or(1, |index| self.depths[index] + 1);
        let is_abstract: bool = u.arbitrary()?;

        let mut seen = BTreeSet::new();
        let mut members = Vec::new();
        let num_members: usize = u.int_in_range(0..=self.config.max_members)?;
        for _ in 0..num_members {
            let member = self.arbitrary_member(u, is_abstract)?;
            if seen.insert(member.shape.slot_key(&member.name)) {
                members.push(member);
            }
        }

        let name = self.fresh_name("Type");
        self.depths.push(depth);
        Ok(TypeSpec {
            name,
            base,
            is_abstract,
            members,
        })
    }

    fn arbitrary_member(&mut self, u: &mut Unstructured, abstract_type: bool) -> Result<MemberSpec> {
        let name = format!("M{}", u.int_in_range(0..=self.config.name_pool.saturating_sub(1))?);
        let member = match u.int_in_range(0..=4u8)? {
            0 => MemberSpec {
                name,
                kind: self.arbitrary_field_kind(u)?,
                shape: ShapeSpec::Field {
                    ty: self.arbitrary_primitive(u)?,
                    visibility: self.arbitrary_visibility(u)?,
                },
            },
            1 => {
                let kind = self.arbitrary_dispatch_kind(u, abstract_type)?;
                let (getter, setter) = if kind.is_abstract() {
                    (
                        Some(Visibility::Public),
                        self.arbitrary_optional_reachable(u)?,
                    )
                } else {
                    match (
                        self.arbitrary_optional_visibility(u)?,
                        self.arbitrary_optional_visibility(u)?,
                    ) {
                        (None, None) => (Some(Visibility::Public), None),
                        accessors => accessors,
                    }
                };
                MemberSpec {
                    name,
                    kind,
                    shape: ShapeSpec::Property {
                        ty: self.arbitrary_primitive(u)?,
                        getter,
                        setter,
                    },
                }
            }
            2 => {
                let kind = self.arbitrary_dispatch_kind(u, abstract_type)?;
                MemberSpec {
                    name,
                    shape: ShapeSpec::Event {
                        visibility: self.arbitrary_member_visibility(u, kind)?,
                    },
                    kind,
                }
            }
            3 => {
                let kind = self.arbitrary_dispatch_kind(u, abstract_type)?;
                let ret = if u.arbitrary()? {
                    Some(self.arbitrary_primitive(u)?)
                } else {
                    None
                };
                MemberSpec {
                    name,
                    shape: ShapeSpec::Method {
                        params: self.arbitrary_params(u)?,
                        ret,
                        visibility: self.arbitrary_member_visibility(u, kind)?,
                    },
                    kind,
                }
            }
            _ => MemberSpec {
                name: ".ctor".to_string(),
                kind: MemberKind::Normal,
                shape: ShapeSpec::Constructor {
                    params: self.arbitrary_params(u)?,
                    visibility: self.arbitrary_visibility(u)?,
                },
            },
        };
        Ok(member)
    }

    fn arbitrary_field_kind(&self, u: &mut Unstructured) -> Result<MemberKind> {
        Ok(if u.ratio(1u8, 4u8)? {
            MemberKind::Static
        } else {
            MemberKind::Normal
        })
    }

    fn arbitrary_dispatch_kind(&self, u: &mut Unstructured, abstract_type: bool) -> Result<MemberKind> {
        let upper = if abstract_type { 5 } else { 4 };
        Ok(match u.int_in_range(0..=upper)? {
            0 => MemberKind::Normal,
            1 => MemberKind::Static,
            2 => MemberKind::Virtual,
            3 => MemberKind::Override { sealed: false },
            4 => MemberKind::Override { sealed: true },
            _ => MemberKind::Abstract,
        })
    }

    /// Abstract members stay reachable so concrete subclasses can bind them.
    fn arbitrary_member_visibility(&self, u: &mut Unstructured, kind: MemberKind) -> Result<Visibility> {
        if kind.is_abstract() {
            self.arbitrary_reachable(u)
        } else {
            self.arbitrary_visibility(u)
        }
    }

    fn arbitrary_visibility(&self, u: &mut Unstructured) -> Result<Visibility> {
        Ok(*u.choose(&[
            Visibility::Private,
            Visibility::Internal,
            Visibility::Protected,
            Visibility::ProtectedInternal,
            Visibility::Public,
        ])?)
    }

    fn arbitrary_reachable(&self, u: &mut Unstructured) -> Result<Visibility> {
        Ok(*u.choose(&[
            Visibility::Protected,
            Visibility::ProtectedInternal,
            Visibility::Public,
        ])?)
    }

    fn arbitrary_optional_visibility(&self, u: &mut Unstructured) -> Result<Option<Visibility>> {
        if u.arbitrary()? {
            Ok(Some(self.arbitrary_visibility(u)?))
        } else {
            Ok(None)
        }
    }

    fn arbitrary_optional_reachable(&self, u: &mut Unstructured) -> Result<Option<Visibility>> {
        if u.arbitrary()? {
            Ok(Some(self.arbitrary_reachable(u)?))
        } else {
            Ok(None)
        }
    }

    fn arbitrary_primitive(&self, u: &mut Unstructured) -> Result<Primitive> {
        Ok(*u.choose(&Primitive::ALL)?)
    }

    fn arbitrary_params(&self, u: &mut Unstructured) -> Result<Vec<Primitive>> {
        let count: usize = u.int_in_range(0..=self.config.max_params)?;
        (0..count).map(|_| self.arbitrary_primitive(u)).collect()
    }
}
