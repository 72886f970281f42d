use std::{any::Any, marker::PhantomData, sync::Arc};

use crate::{
    class_mapper::ClassMapper,
    errors::RequireError,
    state::State,
    types::{Dep, DependencyInfo, DynError, Injectable, Instance, TypeInfo},
};

type ConstructFn = Box<dyn Fn(&ClassMapper<'_>) -> Result<Instance, DynError> + Send + Sync>;
type InjectFn = Box<dyn Fn(&Instance, &ClassMapper<'_>) -> Result<(), RequireError> + Send + Sync>;
type HookFn = Box<dyn Fn(&Instance, &ClassMapper<'_>) -> Result<(), DynError> + Send + Sync>;
type ViewFn = Box<dyn Fn(&Instance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// A type managed by the [crate::Injector]
///
/// Instead of reflecting over the type, every component describes itself:
/// how it is constructed, what gets injected into it and which hooks it
/// wants to run during the lifecycle.
///
/// ```rust
/// use std::sync::{Arc, OnceLock};
/// use ordo_di::{Component, Dep, DependencyInfo, DescriptorBuilder, State};
///
/// #[derive(Default)]
/// struct Database;
/// impl Component for Database {
///     fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
///         d.default_constructor()
///     }
/// }
///
/// #[derive(Default)]
/// struct Users {
///     db: OnceLock<Arc<Database>>,
/// }
/// impl Component for Users {
///     fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
///         d.default_constructor()
///             .inject(Dep::<Database>::component(), |this, db| {
///                 let _ = this.db.set(db);
///             })
///             .hook(
///                 "warm_up",
///                 State::Started,
///                 [DependencyInfo::component::<Database>().at(State::Started)],
///                 |_this, _mapper| Ok(()),
///             )
///     }
/// }
/// ```
pub trait Component: Injectable + Sized {
    fn describe(descriptor: DescriptorBuilder<Self>) -> DescriptorBuilder<Self>;
}

/// Static metadata of a component type
///
/// Produced once per type and graph, never changed afterwards.
pub struct ComponentDescriptor {
    info: TypeInfo,
    construction: Option<Construction>,
    injection_points: Vec<InjectionPoint>,
    hooks: Vec<Hook>,
    bindings: Vec<KeyBinding>,
}

struct Construction {
    dependencies: Vec<DependencyInfo>,
    construct: ConstructFn,
}

/// Injects a dependency into an already constructed instance
pub struct InjectionPoint {
    pub dependency: DependencyInfo,
    inject: InjectFn,
}

/// Callback run on the instance before the graph moves past `before`
pub struct Hook {
    pub name: &'static str,
    pub before: State,
    pub parameters: Vec<DependencyInfo>,
    run: HookFn,
}

/// A key the component can be looked up with
struct KeyBinding {
    key: TypeInfo,
    /// Turns the instance into a boxed `Arc<Key>`
    view: ViewFn,
}

impl ComponentDescriptor {
    /// Describe a component
    pub fn of<T: Component>() -> Self {
        T::describe(DescriptorBuilder::new()).build()
    }

    /// Descriptor of a plain value without construction recipe or hooks
    pub fn instance<T: Injectable>() -> Self {
        DescriptorBuilder::<T>::new().build()
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    /// True if the component knows how to construct itself
    pub fn is_constructible(&self) -> bool {
        self.construction.is_some()
    }

    pub fn constructor_dependencies(&self) -> &[DependencyInfo] {
        match &self.construction {
            Some(construction) => &construction.dependencies,
            None => &[],
        }
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    /// Hooks which run before the given state, in declaration order
    pub fn hooks_before(&self, state: State) -> impl Iterator<Item = &Hook> {
        self.hooks.iter().filter(move |hook| hook.before == state)
    }

    /// All keys the component answers to, its own key first
    pub fn keys(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.bindings.iter().map(|binding| binding.key)
    }

    /// Every dependency of the component, in declaration order
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyInfo> {
        self.constructor_dependencies()
            .iter()
            .chain(self.injection_points.iter().map(|point| &point.dependency))
            .chain(self.hooks.iter().flat_map(|hook| hook.parameters.iter()))
    }

    pub(crate) fn construct(&self, mapper: &ClassMapper<'_>) -> Option<Result<Instance, DynError>> {
        self.construction
            .as_ref()
            .map(|construction| (construction.construct)(mapper))
    }

    /// Views `instance` as a boxed `Arc<Key>`
    pub(crate) fn view(
        &self,
        key: TypeInfo,
        instance: &Instance,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        self.bindings
            .iter()
            .find(|binding| binding.key == key)
            .and_then(|binding| (binding.view)(instance))
    }
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("info", &self.info.type_name)
            .field("constructible", &self.is_constructible())
            .field("injection_points", &self.injection_points.len())
            .field(
                "hooks",
                &self.hooks.iter().map(|hook| hook.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl InjectionPoint {
    pub(crate) fn inject(&self, instance: &Instance, mapper: &ClassMapper<'_>) -> Result<(), RequireError> {
        (self.inject)(instance, mapper)
    }
}

impl Hook {
    pub(crate) fn run(&self, instance: &Instance, mapper: &ClassMapper<'_>) -> Result<(), DynError> {
        (self.run)(instance, mapper)
    }
}

/// Declarative builder for a [ComponentDescriptor]
pub struct DescriptorBuilder<T: Injectable> {
    descriptor: ComponentDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Default for DescriptorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Injectable> DescriptorBuilder<T> {
    pub fn new() -> Self {
        let own_key = KeyBinding {
            key: TypeInfo::of::<T>(),
            view: Box::new(|instance: &Instance| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|this| Box::new(this) as Box<dyn Any + Send + Sync>)
            }),
        };

        DescriptorBuilder {
            descriptor: ComponentDescriptor {
                info: TypeInfo::of::<T>(),
                construction: None,
                injection_points: Vec::new(),
                hooks: Vec::new(),
                bindings: vec![own_key],
            },
            _marker: PhantomData,
        }
    }

    /// Construct the component with `construct`
    ///
    /// Every dependency the recipe looks up must be listed in `dependencies`,
    /// they are constructed before this component.
    pub fn constructor<F>(
        mut self,
        dependencies: impl IntoIterator<Item = DependencyInfo>,
        construct: F,
    ) -> Self
    where
        F: Fn(&ClassMapper<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.descriptor.construction = Some(Construction {
            dependencies: dependencies.into_iter().collect(),
            construct: Box::new(move |mapper| construct(mapper).map(Instance::new)),
        });
        self
    }

    /// Construct the component with [Default]
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor([], |_| Ok(T::default()))
    }

    /// Inject a dependency once it reached `dependency.state`
    ///
    /// Optional dependencies which are not registered are skipped.
    pub fn inject<D, F>(mut self, dependency: Dep<D>, setter: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        let dependency = DependencyInfo::from(dependency);
        let optional = dependency.optional;

        let inject = move |instance: &Instance, mapper: &ClassMapper<'_>| {
            let this = downcast_self::<T>(instance)?;
            match mapper.get::<D>() {
                Ok(value) => setter(&this, value),
                Err(RequireError::TypeMissing(_)) if optional => {}
                Err(e) => return Err(e),
            }
            Ok(())
        };

        self.descriptor.injection_points.push(InjectionPoint {
            dependency,
            inject: Box::new(inject),
        });
        self
    }

    /// Run `hook` before any component moves to `before`
    ///
    /// The hook only runs once every parameter reached its required state.
    pub fn hook<F>(
        mut self,
        name: &'static str,
        before: State,
        parameters: impl IntoIterator<Item = DependencyInfo>,
        hook: F,
    ) -> Self
    where
        F: Fn(&T, &ClassMapper<'_>) -> Result<(), DynError> + Send + Sync + 'static,
    {
        let run = move |instance: &Instance, mapper: &ClassMapper<'_>| {
            let this = downcast_self::<T>(instance)?;
            hook(&this, mapper)
        };

        self.descriptor.hooks.push(Hook {
            name,
            before,
            parameters: parameters.into_iter().collect(),
            run: Box::new(run),
        });
        self
    }

    /// Make the component available under the abstract key `K`
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use ordo_di::{Component, DescriptorBuilder};
    /// trait Greeter: Send + Sync {}
    ///
    /// #[derive(Default)]
    /// struct English;
    /// impl Greeter for English {}
    ///
    /// impl Component for English {
    ///     fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
    ///         d.default_constructor().provides::<dyn Greeter>(|this| this)
    ///     }
    /// }
    /// ```
    pub fn provides<K>(mut self, cast: fn(Arc<T>) -> Arc<K>) -> Self
    where
        K: ?Sized + Send + Sync + 'static,
    {
        let key = TypeInfo::of::<K>();
        if self.descriptor.bindings.iter().any(|binding| binding.key == key) {
            return self;
        }

        self.descriptor.bindings.push(KeyBinding {
            key,
            view: Box::new(move |instance: &Instance| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|this| Box::new(cast(this)) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    pub fn build(self) -> ComponentDescriptor {
        self.descriptor
    }
}

fn downcast_self<T: Injectable>(instance: &Instance) -> Result<Arc<T>, RequireError> {
    instance
        .downcast::<T>()
        .map_err(|actual_type| RequireError::DowncastFailed {
            required_type: std::any::type_name::<T>(),
            actual_type,
        })
}
