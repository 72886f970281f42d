use std::sync::Arc;

use thiserror::Error;

use crate::{
    dependency_graph::GraphError,
    state::State,
    types::{DynError, TypeInfo},
};

/// Errors while resolving a dependency through the [crate::ClassMapper]
#[derive(Error, Debug)]
pub enum InjectError {
    /// Could not require the type
    #[error(transparent)]
    RequireError(#[from] RequireError),
    /// Generic error during Injection
    #[error("Error during injection: {0}")]
    Other(DynError),
}

/// Errors when trying to require a certain key
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    /// Nothing was registered under the key
    #[error("'{0}' is not registered")]
    TypeMissing(&'static str),
    /// The key is registered but its component is not constructed yet
    #[error("'{0}' is registered but was not constructed yet")]
    NotReady(&'static str),

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },
}

/// What declared a requirement on a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredBy {
    Constructor,
    Injection,
    Hook(&'static str),
}

impl std::fmt::Display for RequiredBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredBy::Constructor => f.write_str("constructor"),
            RequiredBy::Injection => f.write_str("injection point"),
            RequiredBy::Hook(name) => write!(f, "hook '{name}'"),
        }
    }
}

/// Errors while building the [crate::Injector]
///
/// Any of these aborts the build, no partially wired Injector is ever returned.
#[derive(Error, Debug, Clone)]
pub enum InitError {
    /// There are issues with the dependency graph
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A component could not be constructed
    #[error("Failed to instantiate '{component}' - error: {error}")]
    Instantiation {
        component: TypeInfo,
        error: Arc<DynError>,
    },

    /// A dependency did not reach the state required when it was due
    #[error("{required_by} of '{component}' needs '{dependency}' at {required} but it is {actual}")]
    NotInjectable {
        component: TypeInfo,
        required_by: RequiredBy,
        dependency: TypeInfo,
        required: State,
        actual: State,
    },

    /// An injection point could not resolve its dependency
    #[error("Injecting '{dependency}' into '{component}' failed - error: {error}")]
    InjectionFailed {
        component: TypeInfo,
        dependency: TypeInfo,
        error: RequireError,
    },

    /// A hook returned an error
    #[error("Hook '{hook}' of '{component}' failed - error: {error}")]
    HookFailed {
        component: TypeInfo,
        hook: &'static str,
        error: Arc<DynError>,
    },
}
