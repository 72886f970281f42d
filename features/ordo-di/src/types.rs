use std::{
    any::{Any, TypeId},
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    component::{Component, ComponentDescriptor},
    state::State,
};

/// Errors raised by user code (constructors, setters, hooks)
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the descriptor of a component type, used for auto discovery
pub type Discover = fn() -> ComponentDescriptor;

/// Components are shared as `Arc<T>` once built and the finished Injector
/// can be read from any thread, so everything injectable is Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A constructed component, type erased
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub(crate) fn new<T: Injectable>(instance: T) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub(crate) fn from_arc<T: Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }
}

/// Type Name and Type Id - the identity of a key
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Information about a single dependency of a component
#[derive(Debug, Clone)]
pub struct DependencyInfo {
    /// The required key
    pub type_info: TypeInfo,
    /// The state the dependency must have reached
    pub state: State,
    /// If it is optional or required
    pub optional: bool,
    /// Set when the key is a component which can be discovered on demand
    pub(crate) discover: Option<Discover>,
}

impl DependencyInfo {
    /// Dependency on a key which has to be registered explicitly
    pub fn of<T: ?Sized + 'static>() -> Self {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            state: State::Created,
            optional: false,
            discover: None,
        }
    }

    /// Dependency on a component, which is created on demand if nobody registered it
    pub fn component<T: Component>() -> Self {
        DependencyInfo {
            discover: Some(ComponentDescriptor::of::<T> as Discover),
            ..Self::of::<T>()
        }
    }

    pub fn at(self, state: State) -> Self {
        DependencyInfo { state, ..self }
    }

    pub fn optional(self) -> Self {
        DependencyInfo {
            optional: true,
            ..self
        }
    }

    pub fn is_discoverable(&self) -> bool {
        self.discover.is_some()
    }
}

/// A typed [DependencyInfo], so setters receive the right `Arc<D>`
pub struct Dep<D: ?Sized> {
    info: DependencyInfo,
    _marker: PhantomData<fn() -> Arc<D>>,
}

impl<D: Component> Dep<D> {
    /// Depend on another component - discovered automatically
    pub fn component() -> Self {
        Dep {
            info: DependencyInfo::component::<D>(),
            _marker: PhantomData,
        }
    }
}

impl<D: ?Sized + 'static> Dep<D> {
    /// Depend on a key which must be registered (pre-built instances, abstract keys)
    pub fn key() -> Self {
        Dep {
            info: DependencyInfo::of::<D>(),
            _marker: PhantomData,
        }
    }

    /// Require the dependency to have reached `state`
    pub fn at(self, state: State) -> Self {
        Dep {
            info: self.info.at(state),
            _marker: PhantomData,
        }
    }

    pub fn optional(self) -> Self {
        Dep {
            info: self.info.optional(),
            _marker: PhantomData,
        }
    }

    pub fn info(&self) -> &DependencyInfo {
        &self.info
    }
}

impl<D: ?Sized> From<Dep<D>> for DependencyInfo {
    fn from(dep: Dep<D>) -> Self {
        dep.info
    }
}
