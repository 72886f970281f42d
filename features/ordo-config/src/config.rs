use std::{ops::Deref, sync::Arc};

use ordo_di::{ClassMapper, DependencyInfo, InjectError, RequireError, Resolver};

use crate::{errors::ConfigError, provider::ConfigProvider};

/// A wrapper type to allow for config injections
///
/// Resolves the config `T` from the [ConfigProvider] registered in the Injector.
///
/// # Example
/// ```rust
/// use ordo_config::{config::Config, provider::ConfigProvider};
/// use ordo_di::{Component, DescriptorBuilder, Injector, Resolver};
///
/// pub struct ServerConfig {
///     port: u16,
/// }
///
/// pub struct Server {
///     port: u16,
/// }
/// impl Component for Server {
///     fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
///         d.constructor([Config::<ServerConfig>::dependency_info()], |mapper| {
///             let config = mapper.resolve::<Config<ServerConfig>>()?;
///             Ok(Server { port: config.port })
///         })
///     }
/// }
///
/// let mut provider = ConfigProvider::new();
/// provider.add_config(ServerConfig { port: 8080 }).unwrap();
///
/// let injector = Injector::builder()
///     .with_instance(provider)
///     .can_inject::<Server>()
///     .build()
///     .unwrap();
/// assert_eq!(injector.get::<Server>().unwrap().port, 8080);
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Config {
            inner: self.inner.clone(),
        }
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Send + Sync + 'static> Resolver for Config<T> {
    fn resolve(mapper: &ClassMapper<'_>) -> Result<Self, InjectError> {
        let config_provider = mapper.get::<ConfigProvider>()?;

        let config = config_provider.get_config::<T>().map_err(|e| match e {
            ConfigError::Missing(info) => {
                InjectError::RequireError(RequireError::TypeMissing(info.type_name))
            }
            other => InjectError::Other(Box::new(other)),
        })?;

        Ok(Config { inner: config })
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<ConfigProvider>()
    }
}
