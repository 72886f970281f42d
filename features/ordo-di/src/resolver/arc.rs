use std::sync::Arc;

use crate::{
    class_mapper::ClassMapper,
    errors::{InjectError, RequireError},
    resolver::Resolver,
    types::DependencyInfo,
};

impl<T: ?Sized + Send + Sync + 'static> Resolver for Arc<T> {
    fn resolve(mapper: &ClassMapper<'_>) -> Result<Self, InjectError> {
        Ok(mapper.get::<T>()?)
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<T>()
    }
}

impl<Resolvable: Resolver> Resolver for Option<Resolvable> {
    fn resolve(mapper: &ClassMapper<'_>) -> Result<Self, InjectError> {
        match Resolvable::resolve(mapper) {
            Ok(resolved) => Ok(Some(resolved)),
            Err(e) => match e {
                // If the required type is not registered Option does not fail
                InjectError::RequireError(RequireError::TypeMissing(_)) => Ok(None),
                _ => Err(e),
            },
        }
    }

    fn dependency_info() -> DependencyInfo {
        Resolvable::dependency_info().optional()
    }
}
