use ordo_di::TypeInfo;

/// Errors of the [crate::provider::ConfigProvider]
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
    /// The required Config is not known
    #[error("Config '{0}' is not registered")]
    Missing(TypeInfo),
    /// The Config type is already registered
    #[error("Config '{0}' is already registered")]
    AlreadyRegistered(TypeInfo),
    #[error("Config '{0}' holds a value of another type")]
    DowncastFailed(TypeInfo),
}
