use std::{any::TypeId, collections::HashMap};

use thiserror::Error;

use crate::{
    component::ComponentDescriptor,
    errors::RequiredBy,
    state::{State, StateCell},
    types::{DependencyInfo, Discover, Instance, TypeInfo},
};

/// Graph of every component of the Injector
///
/// Used to check for cycles and unsatisfiable requirements, and to compute
/// the order in which components are constructed and driven through their states.
/// Nodes are ranked in the order they were first requested, registrations
/// before the dependencies discovered from them. The rank breaks ties between
/// independent components.
#[derive(Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: HashMap<TypeId, usize>,
    /// Key -> nodes answering to it, in registration order
    providers: HashMap<TypeId, Vec<usize>>,
    order: Vec<usize>,
    /// Dependents before their dependencies, including STOPPED hook parameters
    stop_order: Vec<usize>,
}

/// A single component in the [DependencyGraph]
pub struct DependencyNode {
    descriptor: ComponentDescriptor,
    instance: Option<Instance>,
    prebuilt: bool,
    state: StateCell,
    dependencies: Vec<Edge>,
    dependents: Vec<TypeInfo>,
    expanded: bool,
    visit: VisitState,
}

/// Requirement of one node on another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: TypeInfo,
    /// State the target must have reached
    pub required: State,
    pub required_by: RequiredBy,
    /// The target has to be handled before the source within the same pass
    pub ordering: bool,
    /// The source has to be stopped before the target
    pub stopping: bool,
    target_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node for `info`, discovering the component if it is unknown
    ///
    /// Discovery is transitive: every discoverable dependency of a new node
    /// gets a node as well.
    pub fn get_or_create(&mut self, info: TypeInfo, discover: Discover) -> &DependencyNode {
        let index = self.declare_index(info, discover);
        if !self.nodes[index].expanded {
            self.expand(index);
        }
        &self.nodes[index]
    }

    /// Adds the node for `info` without discovering its dependencies yet
    ///
    /// Declaring every registration first gives registrations a lower rank than
    /// anything discovered from them. [Self::resolve] discovers the rest.
    pub fn declare(&mut self, info: TypeInfo, discover: Discover) -> &DependencyNode {
        let index = self.declare_index(info, discover);
        &self.nodes[index]
    }

    /// Adds an already constructed instance
    ///
    /// If the key is known already, the instance replaces its construction.
    /// Dependencies of a new node are discovered by [Self::resolve].
    pub fn insert_instance(
        &mut self,
        descriptor: ComponentDescriptor,
        instance: Instance,
    ) -> Result<&DependencyNode, GraphError> {
        let info = descriptor.info();
        let index = match self.index.get(&info.type_id) {
            Some(&index) => {
                let node = &mut self.nodes[index];
                if node.prebuilt {
                    return Err(GraphError::Duplicate(info));
                }
                tracing::debug!("Using pre-built instance for {}", info);
                node.instance = Some(instance);
                node.prebuilt = true;
                index
            }
            None => self.insert(descriptor, Some(instance)),
        };
        Ok(&self.nodes[index])
    }

    /// Looks up a node which was registered or discovered before
    ///
    /// Nodes are only marked in progress while an ordering pass runs,
    /// which holds the graph mutably, and are reset when it fails. A node
    /// returned here is never part of an unfinished traversal.
    pub fn get(&self, info: TypeInfo) -> Result<&DependencyNode, GraphError> {
        self.index
            .get(&info.type_id)
            .map(|&index| &self.nodes[index])
            .ok_or(GraphError::NotFound {
                dependency: info,
                required_by: None,
            })
    }

    /// Links and orders the graph without constructing anything
    ///
    /// Discovers the dependencies of every declared node first.
    /// Fails on missing dependencies, unsatisfiable requirements and cycles,
    /// also cycles which only exist while stopping.
    pub fn resolve(&mut self) -> Result<(), GraphError> {
        for index in 0..self.nodes.len() {
            if !self.nodes[index].expanded {
                self.expand(index);
            }
        }

        self.link()?;
        let order = self.topological_order()?;

        let mut stop_order = self.order_by(|edge| edge.ordering || edge.stopping)?;
        stop_order.reverse();
        self.stop_order = stop_order;

        tracing::debug!(
            "Dependency graph resolved: {}",
            order
                .iter()
                .map(|info| info.type_name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(())
    }

    /// Orders the nodes so every ordering dependency comes before its dependents
    ///
    /// Roots are visited by rank and so are the dependencies of each node.
    pub fn topological_order(&mut self) -> Result<Vec<TypeInfo>, GraphError> {
        self.order = self.order_by(|edge| edge.ordering)?;
        Ok(self.ordered().map(DependencyNode::info).collect())
    }

    /// Nodes in the order they were first requested
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &DependencyNode> {
        self.nodes.iter()
    }

    /// Nodes in topological order - empty before [Self::topological_order] ran
    pub fn ordered(&self) -> impl DoubleEndedIterator<Item = &DependencyNode> {
        self.order.iter().map(|&index| &self.nodes[index])
    }

    /// Nodes in the order they are stopped - empty before [Self::resolve] ran
    pub fn stopping(&self) -> impl DoubleEndedIterator<Item = &DependencyNode> {
        self.stop_order.iter().map(|&index| &self.nodes[index])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn order_indices(&self) -> &[usize] {
        &self.order
    }

    pub(crate) fn node_at(&self, index: usize) -> &DependencyNode {
        &self.nodes[index]
    }

    pub(crate) fn set_instance(&mut self, index: usize, instance: Instance) {
        self.nodes[index].instance = Some(instance);
    }

    pub(crate) fn provider_indices(&self, type_id: TypeId) -> &[usize] {
        self.providers
            .get(&type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn declare_index(&mut self, info: TypeInfo, discover: Discover) -> usize {
        match self.index.get(&info.type_id) {
            Some(&index) => index,
            None => self.insert(discover(), None),
        }
    }

    fn insert(&mut self, descriptor: ComponentDescriptor, instance: Option<Instance>) -> usize {
        let index = self.nodes.len();
        let info = descriptor.info();
        tracing::debug!("Adding {} to the dependency graph", info);

        for key in descriptor.keys() {
            self.providers.entry(key.type_id).or_default().push(index);
        }
        self.index.insert(info.type_id, index);
        self.nodes.push(DependencyNode {
            descriptor,
            prebuilt: instance.is_some(),
            instance,
            state: StateCell::new(State::Created),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            expanded: false,
            visit: VisitState::Unvisited,
        });
        index
    }

    fn expand(&mut self, index: usize) {
        self.nodes[index].expanded = true;
        let discoverable: Vec<(TypeInfo, Discover)> = requirements(&self.nodes[index])
            .into_iter()
            .filter_map(|(_, _, dependency)| {
                dependency
                    .discover
                    .map(|discover| (dependency.type_info, discover))
            })
            .collect();

        for (info, discover) in discoverable {
            self.get_or_create(info, discover);
        }
    }

    /// Turns the declared dependencies of every node into edges
    fn link(&mut self) -> Result<(), GraphError> {
        let mut all_edges = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            all_edges.push(self.edges_of(node)?);
        }

        for node in &mut self.nodes {
            node.dependents.clear();
        }
        for (index, edges) in all_edges.into_iter().enumerate() {
            let source = self.nodes[index].info();
            for edge in &edges {
                let dependents = &mut self.nodes[edge.target_index].dependents;
                if !dependents.contains(&source) {
                    dependents.push(source);
                }
            }
            self.nodes[index].dependencies = edges;
        }
        Ok(())
    }

    fn edges_of(&self, node: &DependencyNode) -> Result<Vec<Edge>, GraphError> {
        let component = node.info();
        let mut edges: Vec<Edge> = Vec::new();

        if let Some(hook) = node
            .descriptor
            .hooks()
            .iter()
            .find(|hook| hook.before == State::Created)
        {
            return Err(GraphError::InvalidHookState {
                component,
                hook: hook.name,
            });
        }

        for (required_by, pass, dependency) in requirements(node) {
            // Stop hooks run before their parameters are stopped, so STARTED is the latest
            let latest = if pass == State::Stopped {
                State::Started
            } else {
                pass
            };
            if dependency.state > latest {
                return Err(GraphError::NotInjectable {
                    component,
                    required_by,
                    dependency: dependency.type_info,
                    required: dependency.state,
                    pass,
                });
            }

            let targets = self.provider_indices(dependency.type_info.type_id);
            if targets.is_empty() {
                if dependency.optional {
                    continue;
                }
                return Err(GraphError::NotFound {
                    dependency: dependency.type_info,
                    required_by: Some(component),
                });
            }

            let ordering = match required_by {
                RequiredBy::Constructor => true,
                RequiredBy::Injection => dependency.state > State::Created,
                RequiredBy::Hook(_) => dependency.state == pass && pass != State::Stopped,
            };
            let stopping = matches!(required_by, RequiredBy::Hook(_)) && pass == State::Stopped;

            for &target_index in targets {
                let edge = Edge {
                    target: self.nodes[target_index].info(),
                    required: dependency.state,
                    required_by,
                    ordering,
                    stopping,
                    target_index,
                };
                let duplicate = edges.iter().any(|existing| {
                    existing.target_index == edge.target_index
                        && existing.required == edge.required
                        && existing.ordering == edge.ordering
                        && existing.stopping == edge.stopping
                });
                if !duplicate {
                    edges.push(edge);
                }
            }
        }

        Ok(edges)
    }

    /// Post-order DFS over the edges accepted by `follow`, dependencies first
    fn order_by(&mut self, follow: fn(&Edge) -> bool) -> Result<Vec<usize>, GraphError> {
        for node in &mut self.nodes {
            node.visit = VisitState::Unvisited;
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut path = Vec::new();
        let result = (0..self.nodes.len())
            .try_for_each(|root| self.visit(root, follow, &mut path, &mut order));

        for node in &mut self.nodes {
            node.visit = VisitState::Unvisited;
        }
        result.map(|_| order)
    }

    fn visit(
        &mut self,
        index: usize,
        follow: fn(&Edge) -> bool,
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), GraphError> {
        match self.nodes[index].visit {
            VisitState::Done => return Ok(()),
            VisitState::InProgress => {
                let start = path.iter().position(|&i| i == index).unwrap_or(0);
                let mut chain: Vec<TypeInfo> =
                    path[start..].iter().map(|&i| self.nodes[i].info()).collect();
                chain.push(self.nodes[index].info());

                tracing::error!("Cyclic reference: {}", format_chain(&chain));
                return Err(GraphError::CyclicReference { chain });
            }
            VisitState::Unvisited => {}
        }

        self.nodes[index].visit = VisitState::InProgress;
        path.push(index);

        let mut targets: Vec<usize> = self.nodes[index]
            .dependencies
            .iter()
            .filter(|edge| follow(edge))
            .map(|edge| edge.target_index)
            .collect();
        targets.sort_unstable();
        targets.dedup();
        for target in targets {
            self.visit(target, follow, path, order)?;
        }

        path.pop();
        self.nodes[index].visit = VisitState::Done;
        order.push(index);
        Ok(())
    }
}

/// Every requirement of a node with the pass it is checked in
///
/// Pre-built nodes are never constructed, so their constructor needs nothing.
fn requirements(node: &DependencyNode) -> Vec<(RequiredBy, State, &DependencyInfo)> {
    let descriptor = &node.descriptor;
    let constructor = descriptor
        .constructor_dependencies()
        .iter()
        .filter(|_| !node.prebuilt)
        .map(|dependency| (RequiredBy::Constructor, State::Created, dependency));

    let injections = descriptor.injection_points().iter().map(|point| {
        let pass = point.dependency.state.min(State::Started);
        (RequiredBy::Injection, pass, &point.dependency)
    });

    let hooks = descriptor.hooks().iter().flat_map(|hook| {
        hook.parameters
            .iter()
            .map(move |parameter| (RequiredBy::Hook(hook.name), hook.before, parameter))
    });

    constructor.chain(injections).chain(hooks).collect()
}

impl DependencyNode {
    pub fn info(&self) -> TypeInfo {
        self.descriptor.info()
    }

    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    /// The instance - None until the node was constructed
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn is_prebuilt(&self) -> bool {
        self.prebuilt
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    /// Outgoing edges
    pub fn dependencies(&self) -> &[Edge] {
        &self.dependencies
    }

    /// Nodes with an edge to this node
    pub fn dependents(&self) -> &[TypeInfo] {
        &self.dependents
    }

    /// Moves the node forward, returns the state it had before
    pub(crate) fn advance(&self, state: State) -> State {
        self.state.advance(state)
    }
}

impl std::fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for node in self.nodes() {
            writeln!(f, "{} [{}]", node.info(), node.state())?;
            for edge in node.dependencies() {
                let kind = if edge.ordering { "->" } else { "~>" };
                writeln!(
                    f,
                    "  {kind} {} @ {} ({})",
                    edge.target, edge.required, edge.required_by
                )?;
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("A Type has been registered twice: '{0}'")]
    Duplicate(TypeInfo),
    #[error("'{dependency}' is not registered{}", required_by_suffix(.required_by))]
    NotFound {
        dependency: TypeInfo,
        required_by: Option<TypeInfo>,
    },
    #[error("A cyclic reference exists: {}", format_chain(.chain))]
    CyclicReference { chain: Vec<TypeInfo> },
    #[error("{required_by} of '{component}' needs '{dependency}' at {required}, which can never be reached before {pass}")]
    NotInjectable {
        component: TypeInfo,
        required_by: RequiredBy,
        dependency: TypeInfo,
        required: State,
        pass: State,
    },
    #[error("Hook '{hook}' of '{component}' runs before CREATED, hooks can only run before later states")]
    InvalidHookState {
        component: TypeInfo,
        hook: &'static str,
    },
}

fn required_by_suffix(required_by: &Option<TypeInfo>) -> String {
    match required_by {
        Some(component) => format!(" but '{component}' needs it"),
        None => String::new(),
    }
}

fn format_chain(chain: &[TypeInfo]) -> String {
    chain
        .iter()
        .map(|info| info.type_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        component::{Component, DescriptorBuilder},
        types::Dep,
    };

    macro_rules! leaf {
        ($name:ident) => {
            #[derive(Default)]
            struct $name;
            impl Component for $name {
                fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
                    d.default_constructor()
                }
            }
        };
    }

    leaf!(Leaf);
    leaf!(Other);

    /// Constructor dependency on Leaf, hook dependency on Other
    struct Root;
    impl Component for Root {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([DependencyInfo::component::<Leaf>()], |_| Ok(Root))
                .hook(
                    "start",
                    State::Started,
                    [DependencyInfo::component::<Other>().at(State::Started)],
                    |_, _| Ok(()),
                )
        }
    }

    #[derive(Default)]
    struct Ping;
    impl Component for Ping {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.default_constructor()
                .inject(Dep::<Pong>::component().at(State::Initialized), |_, _| {})
        }
    }

    #[derive(Default)]
    struct Pong;
    impl Component for Pong {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.default_constructor()
                .inject(Dep::<Ping>::component().at(State::Initialized), |_, _| {})
        }
    }

    /// Only ever registered as a pre-built instance
    struct Settings;

    struct NeedsSettings;
    impl Component for NeedsSettings {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([DependencyInfo::of::<Settings>()], |_| Ok(NeedsSettings))
        }
    }

    /// Needs Leaf at STARTED while being constructed
    #[derive(Default)]
    struct TooEarly;
    impl Component for TooEarly {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor(
                [DependencyInfo::component::<Leaf>().at(State::Started)],
                |_| Ok(TooEarly),
            )
        }
    }

    #[derive(Default)]
    struct EarlyHook;
    impl Component for EarlyHook {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.default_constructor()
                .hook("never", State::Created, [], |_, _| Ok(()))
        }
    }

    fn discover<T: Component>(graph: &mut DependencyGraph) {
        graph.get_or_create(TypeInfo::of::<T>(), ComponentDescriptor::of::<T>);
    }

    #[test]
    fn get_or_create_discovers_the_transitive_closure() {
        let mut graph = DependencyGraph::new();
        discover::<Root>(&mut graph);

        let nodes: Vec<_> = graph.nodes().map(DependencyNode::info).collect();
        assert_eq!(
            nodes,
            vec![
                TypeInfo::of::<Root>(),
                TypeInfo::of::<Leaf>(),
                TypeInfo::of::<Other>()
            ]
        );

        // Asking again does not create a second node
        discover::<Leaf>(&mut graph);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn orders_dependencies_first() {
        let mut graph = DependencyGraph::new();
        discover::<Root>(&mut graph);
        graph.resolve().unwrap();

        let order: Vec<_> = graph.ordered().map(DependencyNode::info).collect();
        // Other is only needed at STARTED by a STARTED hook, Leaf by the constructor
        assert_eq!(
            order,
            vec![
                TypeInfo::of::<Leaf>(),
                TypeInfo::of::<Other>(),
                TypeInfo::of::<Root>()
            ]
        );

        let root = graph.get(TypeInfo::of::<Root>()).unwrap();
        assert_eq!(root.dependencies().len(), 2);
        assert!(root.dependencies().iter().all(|edge| edge.ordering));
        let leaf = graph.get(TypeInfo::of::<Leaf>()).unwrap();
        assert_eq!(leaf.dependents(), &[TypeInfo::of::<Root>()]);
    }

    #[test]
    fn reports_the_full_cycle() {
        let mut graph = DependencyGraph::new();
        discover::<Ping>(&mut graph);

        let Err(GraphError::CyclicReference { chain }) = graph.resolve() else {
            panic!("expected a cycle");
        };
        assert_eq!(
            chain,
            vec![
                TypeInfo::of::<Ping>(),
                TypeInfo::of::<Pong>(),
                TypeInfo::of::<Ping>()
            ]
        );
    }

    #[test]
    fn missing_dependency_names_the_key() {
        let mut graph = DependencyGraph::new();
        discover::<NeedsSettings>(&mut graph);

        match graph.resolve() {
            Err(GraphError::NotFound {
                dependency,
                required_by,
            }) => {
                assert_eq!(dependency, TypeInfo::of::<Settings>());
                assert_eq!(required_by, Some(TypeInfo::of::<NeedsSettings>()));
            }
            other => panic!("expected NotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn pre_built_instances_satisfy_dependencies() {
        let mut graph = DependencyGraph::new();
        discover::<NeedsSettings>(&mut graph);
        graph
            .insert_instance(
                ComponentDescriptor::instance::<Settings>(),
                Instance::new(Settings),
            )
            .unwrap();

        graph.resolve().unwrap();
        let settings = graph.get(TypeInfo::of::<Settings>()).unwrap();
        assert!(settings.is_prebuilt());
        assert!(settings.instance().is_some());

        let duplicate = graph.insert_instance(
            ComponentDescriptor::instance::<Settings>(),
            Instance::new(Settings),
        );
        assert!(matches!(duplicate, Err(GraphError::Duplicate(_))));
    }

    #[test]
    fn unknown_keys_are_not_found() {
        let graph = DependencyGraph::new();
        assert!(matches!(
            graph.get(TypeInfo::of::<Leaf>()),
            Err(GraphError::NotFound {
                required_by: None,
                ..
            })
        ));
    }

    #[test]
    fn requirements_which_can_never_be_met_fail_early() {
        let mut graph = DependencyGraph::new();
        discover::<TooEarly>(&mut graph);

        match graph.resolve() {
            Err(GraphError::NotInjectable {
                component,
                required_by,
                required,
                pass,
                ..
            }) => {
                assert_eq!(component, TypeInfo::of::<TooEarly>());
                assert_eq!(required_by, RequiredBy::Constructor);
                assert_eq!(required, State::Started);
                assert_eq!(pass, State::Created);
            }
            other => panic!("expected NotInjectable, got {:?}", other.err()),
        }
    }

    #[test]
    fn hooks_before_created_are_rejected() {
        let mut graph = DependencyGraph::new();
        discover::<EarlyHook>(&mut graph);

        assert!(matches!(
            graph.resolve(),
            Err(GraphError::InvalidHookState { hook: "never", .. })
        ));
    }

    #[test]
    fn declared_nodes_rank_before_discovered_ones() {
        let mut graph = DependencyGraph::new();
        graph.declare(TypeInfo::of::<Root>(), ComponentDescriptor::of::<Root>);
        graph.declare(TypeInfo::of::<Other>(), ComponentDescriptor::of::<Other>);
        assert_eq!(graph.len(), 2);

        graph.resolve().unwrap();
        let nodes: Vec<_> = graph.nodes().map(DependencyNode::info).collect();
        assert_eq!(
            nodes,
            vec![
                TypeInfo::of::<Root>(),
                TypeInfo::of::<Other>(),
                TypeInfo::of::<Leaf>()
            ]
        );

        // Ties follow the rank, not the order Root lists its dependencies in
        let order: Vec<_> = graph.ordered().map(DependencyNode::info).collect();
        assert_eq!(
            order,
            vec![
                TypeInfo::of::<Other>(),
                TypeInfo::of::<Leaf>(),
                TypeInfo::of::<Root>()
            ]
        );
    }

    #[test]
    fn failed_ordering_leaves_no_node_in_progress() {
        let mut graph = DependencyGraph::new();
        discover::<Ping>(&mut graph);

        assert!(graph.resolve().is_err());
        assert!(graph
            .nodes()
            .all(|node| node.visit == VisitState::Unvisited));
        assert!(graph.get(TypeInfo::of::<Ping>()).is_ok());
        assert_eq!(graph.ordered().count(), 0);
    }
}
