//! Member-generation modules and their dependency resolver.
//!
//! A module is a unit of member-generation logic that may require other
//! modules to have contributed first. Before anything is applied to a
//! definition the module graph is ordered so that every module follows all
//! of its transitive dependencies.
//!
//! ```text
//!   Root ── A ─┬─ B0 ── C0          resolve([Root])
//!              ├─ B1 ── C1    ==>   [C0, B0, C1, B1, B2, A, Root]
//!              └─ B2
//! ```
//!
//! The order is a depth-first post-order from the roots. Visitation state
//! lives only for the duration of one `resolve` call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::definition::TypeDefinition;
use crate::error::{ForgeError, ForgeResult};
use crate::ids::ModuleId;
use crate::index_vec::IndexVec;

/// A unit of member-generation logic.
pub trait MemberModule: Send + Sync {
    /// Identity of the module. Two modules with the same name are the same
    /// module as far as ordering is concerned.
    fn name(&self) -> &str;

    /// Modules that must contribute before this one, in order.
    fn dependencies(&self) -> Vec<Arc<dyn MemberModule>> {
        Vec::new()
    }

    /// Add or override members on `definition`.
    fn contribute(&self, definition: &mut TypeDefinition) -> ForgeResult<()>;
}

impl fmt::Debug for dyn MemberModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberModule({})", self.name())
    }
}

/// A node of the module graph.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub name: String,
    pub dependencies: Vec<ModuleId>,
}

/// Transient dependency graph of modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    nodes: IndexVec<ModuleId, ModuleNode>,
    by_name: HashMap<String, ModuleId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    OnPath,
    Done,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, or return the existing one with the same name.
    pub fn add(&mut self, name: &str) -> ModuleId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.nodes.push(ModuleNode {
            name: name.to_string(),
            dependencies: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    /// Record that `module` requires `dependency`.
    pub fn depend_on(&mut self, module: ModuleId, dependency: ModuleId) -> ForgeResult<()> {
        self.node(dependency)?;
        let node = self
            .nodes
            .get_mut(module)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown {}", module)))?;
        if !node.dependencies.contains(&dependency) {
            node.dependencies.push(dependency);
        }
        Ok(())
    }

    pub fn node(&self, module: ModuleId) -> ForgeResult<&ModuleNode> {
        self.nodes
            .get(module)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown {}", module)))
    }

    pub fn name(&self, module: ModuleId) -> &str {
        self.nodes
            .get(module)
            .map(|node| node.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Order every module reachable from `roots` after its dependencies.
    ///
    /// Each module appears exactly once. A cycle fails the whole call with
    /// `CircularDependency`; no partial order is returned.
    pub fn resolve(&self, roots: &[ModuleId]) -> ForgeResult<Vec<ModuleId>> {
        for &root in roots {
            self.node(root)?;
        }

        let mut visits = vec![Visit::Pending; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for &root in roots {
            self.visit(root, &mut visits, &mut order)?;
        }

        tracing::debug!(
            order = ?order.iter().map(|&id| self.name(id)).collect::<Vec<_>>(),
            "resolved module order"
        );
        Ok(order)
    }

    /// Depth-first post-order walk from `root` on an explicit stack.
    ///
    /// Each frame holds a module on the current path and the index of the
    /// next dependency to look at.
    fn visit(
        &self,
        root: ModuleId,
        visits: &mut [Visit],
        order: &mut Vec<ModuleId>,
    ) -> ForgeResult<()> {
        if visits[root.index()] == Visit::Done {
            return Ok(());
        }
        visits[root.index()] = Visit::OnPath;
        let mut path: Vec<(ModuleId, usize)> = vec![(root, 0)];

        while let Some(frame) = path.last_mut() {
            let (module, next) = *frame;
            match self.nodes[module].dependencies.get(next) {
                Some(&dependency) => {
                    frame.1 += 1;
                    match visits[dependency.index()] {
                        Visit::Done => {}
                        Visit::OnPath => return Err(self.cycle_error(dependency, &path)),
                        Visit::Pending => {
                            visits[dependency.index()] = Visit::OnPath;
                            path.push((dependency, 0));
                        }
                    }
                }
                None => {
                    path.pop();
                    visits[module.index()] = Visit::Done;
                    order.push(module);
                }
            }
        }
        Ok(())
    }

    fn cycle_error(&self, module: ModuleId, path: &[(ModuleId, usize)]) -> ForgeError {
        let start = path.iter().position(|&(id, _)| id == module).unwrap_or(0);
        let cycle = path[start..]
            .iter()
            .map(|&(id, _)| id)
            .chain(std::iter::once(module))
            .map(|id| self.name(id).to_string())
            .collect();
        ForgeError::CircularDependency {
            module: self.name(module).to_string(),
            cycle,
        }
    }
}

/// Order module objects reachable from `roots` so that dependencies come
/// first.
///
/// Modules are identified by name; when two objects share a name the first
/// one discovered is kept.
pub fn resolve_modules(
    roots: &[Arc<dyn MemberModule>],
) -> ForgeResult<Vec<Arc<dyn MemberModule>>> {
    let mut graph = ModuleGraph::new();
    let mut objects: IndexVec<ModuleId, Arc<dyn MemberModule>> = IndexVec::new();

    let mut root_ids = Vec::with_capacity(roots.len());
    let mut pending: Vec<ModuleId> = Vec::new();
    for root in roots {
        let id = register(&mut graph, &mut objects, &mut pending, root)?;
        root_ids.push(id);
    }

    while let Some(id) = pending.pop() {
        let module = objects[id].clone();
        for dependency in module.dependencies() {
            let dep_id = register(&mut graph, &mut objects, &mut pending, &dependency)?;
            graph.depend_on(id, dep_id)?;
        }
    }

    let order = graph.resolve(&root_ids)?;
    Ok(order.into_iter().map(|id| objects[id].clone()).collect())
}

fn register(
    graph: &mut ModuleGraph,
    objects: &mut IndexVec<ModuleId, Arc<dyn MemberModule>>,
    pending: &mut Vec<ModuleId>,
    module: &Arc<dyn MemberModule>,
) -> ForgeResult<ModuleId> {
    let name = module.name();
    if name.trim().is_empty() {
        return Err(ForgeError::InvalidArgument("module name is empty".into()));
    }
    if let Some(id) = graph.lookup(name) {
        return Ok(id);
    }
    let id = graph.add(name);
    objects.push(module.clone());
    pending.push(id);
    Ok(id)
}
