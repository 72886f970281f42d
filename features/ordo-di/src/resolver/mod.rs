use crate::{class_mapper::ClassMapper, errors::InjectError, types::DependencyInfo};

pub mod arc;

/// Allows custom behaviour on injection
///
/// A resolver knows which dependency it needs and how to turn it into a value,
/// which lets wrapper types such as `Option<Arc<T>>` be used in constructors and hooks.
pub trait Resolver: Sized {
    fn resolve(mapper: &ClassMapper<'_>) -> Result<Self, InjectError>;

    fn dependency_info() -> DependencyInfo;
}
