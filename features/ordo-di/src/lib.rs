//! Dependency injection with an ordered component lifecycle
//!
//! Components describe their dependencies and hooks through [Component::describe].
//! The [Injector] builds a [DependencyGraph] from them, rejects cycles and
//! unsatisfiable requirements, constructs every component in dependency order
//! and then drives all of them through [State::Initialized], [State::Resolved]
//! and [State::Started]. Hooks only run once the dependencies they ask for
//! reached the requested state.

mod builder;
mod bundle;
mod class_mapper;
mod component;
mod container;
mod dependency_graph;
mod errors;
mod initiator;
mod resolver;
mod state;
mod types;

pub use builder::InjectorBuilder;
pub use bundle::Bundle;
pub use class_mapper::ClassMapper;
pub use component::{Component, ComponentDescriptor, DescriptorBuilder, Hook, InjectionPoint};
pub use container::Injector;
pub use dependency_graph::{DependencyGraph, DependencyNode, Edge, GraphError};
pub use errors::{InitError, InjectError, RequireError, RequiredBy};
pub use resolver::Resolver;
pub use state::State;
pub use types::{Dep, DependencyInfo, Discover, DynError, Injectable, Instance, TypeInfo};
