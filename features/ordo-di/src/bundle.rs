use crate::{
    component::{Component, ComponentDescriptor},
    types::{Discover, TypeInfo},
};

/// A named set of components which are registered together
///
/// Registering a bundle is the same as calling [crate::InjectorBuilder::can_inject]
/// for every component it lists, in the order they were added.
#[derive(Debug, Clone)]
pub struct Bundle {
    name: String,
    entries: Vec<BundleEntry>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BundleEntry {
    pub(crate) info: TypeInfo,
    pub(crate) discover: Discover,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Bundle {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add a component - adding the same component twice keeps the first position
    pub fn with<T: Component>(mut self) -> Self {
        self.push(BundleEntry {
            info: TypeInfo::of::<T>(),
            discover: ComponentDescriptor::of::<T>,
        });
        self
    }

    /// Add every component of another bundle
    pub fn include(mut self, other: &Bundle) -> Self {
        for entry in &other.entries {
            self.push(*entry);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.entries.iter().map(|entry| entry.info)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    fn push(&mut self, entry: BundleEntry) {
        if !self.entries.iter().any(|known| known.info == entry.info) {
            self.entries.push(entry);
        }
    }
}
