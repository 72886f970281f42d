use std::sync::Arc;

use crate::{
    builder::{InjectorBuilder, Registration},
    class_mapper::ClassMapper,
    container::Injector,
    dependency_graph::{DependencyGraph, DependencyNode},
    errors::{InitError, RequiredBy},
    state::State,
    types::{DependencyInfo, Instance},
};

/// Runs the build of an [Injector]
///
/// 1. Registrations are expanded into the [DependencyGraph]
/// 2. The graph is linked and ordered - nothing is constructed if that fails
/// 3. Every node is constructed in order, then injection points at CREATED run
/// 4. For every build state, in order, each node runs its injection points
///    and hooks for that state and then advances to it
pub(crate) struct Initiator {
    registrations: Vec<Registration>,
    graph: DependencyGraph,
}

impl Initiator {
    pub(crate) fn new(builder: InjectorBuilder) -> Initiator {
        Initiator {
            registrations: builder.registrations,
            graph: DependencyGraph::new(),
        }
    }

    pub(crate) fn initiate(self) -> Result<Injector, InitError> {
        self.try_initiate()
            .inspect_err(|e| tracing::error!("Failed to build the Injector: {}", e))
    }

    fn try_initiate(mut self) -> Result<Injector, InitError> {
        tracing::debug!(
            "Building Injector with {} registrations",
            self.registrations.len()
        );

        for registration in std::mem::take(&mut self.registrations) {
            match registration {
                Registration::Component { info, discover } => {
                    self.graph.declare(info, discover);
                }
                Registration::Instance {
                    descriptor,
                    instance,
                } => {
                    self.graph.insert_instance(descriptor, instance)?;
                }
            }
        }

        self.graph.resolve()?;
        self.construct_all()?;

        let graph = self.graph;
        for node in graph.ordered() {
            inject(&graph, node, State::Created)?;
        }

        for state in State::BUILD {
            for node in graph.ordered() {
                inject(&graph, node, state)?;
                run_hooks(&graph, node, state)?;
                node.advance(state);
            }
            tracing::debug!("All components reached {}", state);
        }

        tracing::info!("Injector built with {} components", graph.len());
        Ok(Injector::new(graph))
    }

    fn construct_all(&mut self) -> Result<(), InitError> {
        for index in self.graph.order_indices().to_vec() {
            let node = self.graph.node_at(index);
            if node.instance().is_some() {
                continue;
            }

            let component = node.info();
            for dependency in node.descriptor().constructor_dependencies() {
                check(&self.graph, node, RequiredBy::Constructor, dependency)?;
            }

            let mapper = ClassMapper::new(&self.graph);
            let instance = match node.descriptor().construct(&mapper) {
                Some(Ok(instance)) => instance,
                Some(Err(error)) => {
                    return Err(InitError::Instantiation {
                        component,
                        error: Arc::new(error),
                    })
                }
                None => {
                    return Err(InitError::Instantiation {
                        component,
                        error: Arc::new("no viable constructor and no pre-built instance".into()),
                    })
                }
            };

            tracing::debug!("Constructed {}", component);
            self.graph.set_instance(index, instance);
        }
        Ok(())
    }
}

/// Runs the STOPPED hooks of every node which was not stopped yet, dependents first
///
/// Every node is stopped even if a hook fails, the first failure is returned.
pub(crate) fn stop(graph: &DependencyGraph) -> Result<(), InitError> {
    let mut first_error = None;

    for node in graph.stopping() {
        if node.advance(State::Stopped) == State::Stopped {
            continue;
        }

        if let Err(error) = run_hooks(graph, node, State::Stopped) {
            tracing::error!("Failed to stop {}: {}", node.info(), error);
            first_error.get_or_insert(error);
        }
    }

    tracing::info!("Injector stopped");
    first_error.map_or(Ok(()), Err)
}

fn inject(graph: &DependencyGraph, node: &DependencyNode, state: State) -> Result<(), InitError> {
    let points = node
        .descriptor()
        .injection_points()
        .iter()
        .filter(|point| point.dependency.state == state);

    let mapper = ClassMapper::new(graph);
    for point in points {
        check(graph, node, RequiredBy::Injection, &point.dependency)?;

        point
            .inject(instance_of(node)?, &mapper)
            .map_err(|error| InitError::InjectionFailed {
                component: node.info(),
                dependency: point.dependency.type_info,
                error,
            })?;
        tracing::debug!(
            "Injected {} into {}",
            point.dependency.type_info,
            node.info()
        );
    }
    Ok(())
}

fn run_hooks(graph: &DependencyGraph, node: &DependencyNode, state: State) -> Result<(), InitError> {
    let mapper = ClassMapper::new(graph);
    for hook in node.descriptor().hooks_before(state) {
        for parameter in &hook.parameters {
            check(graph, node, RequiredBy::Hook(hook.name), parameter)?;
        }

        tracing::debug!("Running hook '{}' of {} before {}", hook.name, node.info(), state);
        hook.run(instance_of(node)?, &mapper)
            .map_err(|error| InitError::HookFailed {
                component: node.info(),
                hook: hook.name,
                error: Arc::new(error),
            })?;
    }
    Ok(())
}

/// Checks that every provider of `dependency` is constructed and reached the required state
fn check(
    graph: &DependencyGraph,
    node: &DependencyNode,
    required_by: RequiredBy,
    dependency: &DependencyInfo,
) -> Result<(), InitError> {
    for &index in graph.provider_indices(dependency.type_info.type_id) {
        let target = graph.node_at(index);
        let actual = target.state();
        // A stopped target no longer meets anything short of STOPPED
        let stopped = actual == State::Stopped && dependency.state < State::Stopped;
        if target.instance().is_none() || actual < dependency.state || stopped {
            return Err(InitError::NotInjectable {
                component: node.info(),
                required_by,
                dependency: target.info(),
                required: dependency.state,
                actual,
            });
        }
    }
    Ok(())
}

fn instance_of(node: &DependencyNode) -> Result<&Instance, InitError> {
    node.instance().ok_or_else(|| InitError::Instantiation {
        component: node.info(),
        error: Arc::new("component was not constructed".into()),
    })
}
