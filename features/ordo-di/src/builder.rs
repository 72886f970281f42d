use crate::{
    bundle::Bundle,
    component::{Component, ComponentDescriptor},
    container::Injector,
    errors::InitError,
    initiator::Initiator,
    types::{Discover, Injectable, Instance, TypeInfo},
};

/// Collects everything the [Injector] should manage
///
/// Registrations are kept in order - the order decides how independent
/// components are ordered during the build.
/// ```rust
/// use ordo_di::{Component, DescriptorBuilder, Injector};
///
/// #[derive(Default)]
/// struct Clock;
/// impl Component for Clock {
///     fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
///         d.default_constructor()
///     }
/// }
///
/// let injector = Injector::builder().can_inject::<Clock>().build().unwrap();
/// assert!(injector.get::<Clock>().is_some());
/// ```
#[derive(Default)]
pub struct InjectorBuilder {
    pub(crate) registrations: Vec<Registration>,
}

pub(crate) enum Registration {
    /// Constructed by the Injector
    Component { info: TypeInfo, discover: Discover },
    /// Pre-built, only driven through the lifecycle
    Instance {
        descriptor: ComponentDescriptor,
        instance: Instance,
    },
}

impl InjectorBuilder {
    pub fn new() -> Self {
        InjectorBuilder {
            registrations: Vec::new(),
        }
    }

    /// Let the Injector construct `T`
    pub fn can_inject<T: Component>(mut self) -> Self {
        self.registrations.push(Registration::Component {
            info: TypeInfo::of::<T>(),
            discover: ComponentDescriptor::of::<T>,
        });
        self
    }

    /// Register an already constructed component - its hooks and injection points still run
    pub fn with_component<T: Component>(mut self, component: T) -> Self {
        self.registrations.push(Registration::Instance {
            descriptor: ComponentDescriptor::of::<T>(),
            instance: Instance::new(component),
        });
        self
    }

    /// Register a plain value, e.g. configuration
    pub fn with_instance<T: Injectable>(mut self, instance: T) -> Self {
        self.registrations.push(Registration::Instance {
            descriptor: ComponentDescriptor::instance::<T>(),
            instance: Instance::new(instance),
        });
        self
    }

    /// Register every component of a [Bundle]
    pub fn with_bundle(mut self, bundle: &Bundle) -> Self {
        tracing::debug!("Registering bundle '{}' with {} components", bundle.name(), bundle.len());
        for entry in bundle.entries() {
            self.registrations.push(Registration::Component {
                info: entry.info,
                discover: entry.discover,
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Builds the graph, constructs every component and drives it to [crate::State::Started]
    pub fn build(self) -> Result<Injector, InitError> {
        Initiator::new(self).initiate()
    }
}
