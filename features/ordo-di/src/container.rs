use std::{fmt::Debug, sync::Arc};

use crate::{
    builder::InjectorBuilder,
    class_mapper::ClassMapper,
    dependency_graph::DependencyGraph,
    errors::{InitError, RequireError},
    initiator,
    state::State,
    types::TypeInfo,
};

/// Container holding every component once the build finished
///
/// Cloning is cheap, all clones share the same components.
#[derive(Clone)]
pub struct Injector(Arc<InjectorInner>);
struct InjectorInner {
    graph: DependencyGraph,
}

impl Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Injector");
        for node in self.0.graph.nodes() {
            map.field(node.info().type_name, &node.state());
        }
        map.finish()
    }
}

impl Injector {
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    pub(crate) fn new(graph: DependencyGraph) -> Self {
        Self(Arc::new(InjectorInner { graph }))
    }

    /// Get the component registered under `K`, the last registered one if there are several
    pub fn get<K>(&self) -> Option<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        self.mapper().get::<K>().ok()
    }

    /// Like [Self::get], but says why nothing was found
    ///
    /// This is the getOrThrow lookup: a missing key is
    /// [RequireError::TypeMissing], a key whose component was never constructed
    /// is [RequireError::NotReady].
    pub fn require<K>(&self) -> Result<Arc<K>, RequireError>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        self.mapper().get::<K>()
    }

    /// Every component registered under `K`, in registration order
    pub fn all<K>(&self) -> Vec<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        self.mapper().all::<K>()
    }

    /// Current state of the component registered under `K`
    pub fn state_of<K: ?Sized + 'static>(&self) -> Option<State> {
        self.mapper().state_of::<K>()
    }

    /// Keys of every managed component, in the order they were started
    pub fn keys(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.0.graph.ordered().map(|node| node.info())
    }

    /// Runs the STOPPED hooks - dependents are stopped before their dependencies
    ///
    /// A STOPPED hook parameter counts as a dependency, its target is stopped
    /// after the hook ran.
    ///
    /// Calling this again, also from a clone, does nothing.
    pub fn stop(&self) -> Result<(), InitError> {
        initiator::stop(&self.0.graph)
    }

    pub fn mapper(&self) -> ClassMapper<'_> {
        ClassMapper::new(&self.0.graph)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.0.graph
    }
}
