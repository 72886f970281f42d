use std::{any::TypeId, sync::Arc};

use crate::{
    dependency_graph::{DependencyGraph, DependencyNode},
    errors::{InjectError, RequireError},
    resolver::Resolver,
    state::State,
    types::TypeInfo,
};

/// Resolves keys to the instances managed by the [crate::Injector]
///
/// During the build this looks at the graph while components are still being
/// wired, afterwards at the finished container. A key provided by several
/// components resolves to the one registered last.
#[derive(Clone, Copy)]
pub struct ClassMapper<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> ClassMapper<'a> {
    pub(crate) fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Resolve the instance registered under `K`
    pub fn get<K>(&self) -> Result<Arc<K>, RequireError>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        let key = TypeInfo::of::<K>();
        let node = self
            .providers(key.type_id)
            .last()
            .ok_or(RequireError::TypeMissing(key.type_name))?;

        view::<K>(node, key)
    }

    /// Resolve every instance registered under `K`, in registration order
    pub fn all<K>(&self) -> Vec<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        let key = TypeInfo::of::<K>();
        self.providers(key.type_id)
            .filter_map(|node| view::<K>(node, key).ok())
            .collect()
    }

    /// Resolve using a [Resolver] - e.g. `Option<Arc<T>>`
    pub fn resolve<R: Resolver>(&self) -> Result<R, InjectError> {
        R::resolve(self)
    }

    /// Current state of `K` - the last registered provider if there are several
    pub fn state_of<K: ?Sized + 'static>(&self) -> Option<State> {
        self.providers(TypeId::of::<K>())
            .last()
            .map(DependencyNode::state)
    }

    pub fn contains(&self, key: TypeInfo) -> bool {
        self.providers(key.type_id).next().is_some()
    }

    fn providers(&self, type_id: TypeId) -> impl DoubleEndedIterator<Item = &'a DependencyNode> {
        let graph = self.graph;
        graph
            .provider_indices(type_id)
            .iter()
            .map(move |&index| graph.node_at(index))
    }
}

fn view<K>(node: &DependencyNode, key: TypeInfo) -> Result<Arc<K>, RequireError>
where
    K: ?Sized + Send + Sync + 'static,
{
    let instance = node
        .instance()
        .ok_or(RequireError::NotReady(node.info().type_name))?;

    node.descriptor()
        .view(key, instance)
        .and_then(|boxed| boxed.downcast::<Arc<K>>().ok())
        .map(|arc| *arc)
        .ok_or(RequireError::DowncastFailed {
            required_type: key.type_name,
            actual_type: instance.info.type_name,
        })
}
