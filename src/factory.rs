//! Driver factory and registration system.
//!
//! Each [`DriverKind`] maps to a [`DriverConstructor`]. A constructor reads
//! its backend's location, resolves whatever secrets that backend needs
//! through the caller's [`SecretResolver`], and returns a ready driver.
//! Adding a backend means registering a constructor.

use crate::{
    ArtifactDriver, ArtifactError, ArtifactLocation, Artifact, Context, DriverKind, Result,
    SecretResolver,
};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Constructor function type for building drivers.
///
/// The future borrows the context, location and resolver for the duration
/// of construction only; the returned driver owns everything it needs.
pub type DriverConstructor = for<'a> fn(
    &'a Context,
    &'a ArtifactLocation,
    &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>>;

/// Table of driver constructors keyed by backend.
///
/// # Example
///
/// ```
/// use artifactmux::factory::DriverRegistry;
/// use artifactmux::DriverKind;
///
/// let registry = DriverRegistry::with_defaults();
/// # #[cfg(feature = "s3")]
/// assert!(registry.is_registered(DriverKind::S3));
///
/// let empty = DriverRegistry::new();
/// assert!(empty.kinds().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct DriverRegistry {
    constructors: HashMap<DriverKind, DriverConstructor>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every compiled-in driver.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all(&mut registry);
        registry
    }

    /// Registers a constructor, returning the one it replaces.
    pub fn register(
        &mut self,
        kind: DriverKind,
        constructor: DriverConstructor,
    ) -> Option<DriverConstructor> {
        self.constructors.insert(kind, constructor)
    }

    /// Checks if a constructor is registered for `kind`.
    pub fn is_registered(&self, kind: DriverKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Lists registered kinds in dispatch priority order.
    pub fn kinds(&self) -> Vec<DriverKind> {
        DriverKind::PRIORITY
            .into_iter()
            .filter(|kind| self.constructors.contains_key(kind))
            .collect()
    }

    fn constructor(&self, kind: DriverKind) -> Option<DriverConstructor> {
        self.constructors.get(&kind).copied()
    }

    /// Builds the driver for `artifact` using this registry.
    ///
    /// See [`new_driver`] for the error contract.
    pub async fn new_driver(
        &self,
        ctx: &Context,
        artifact: &Artifact,
        resolver: &dyn SecretResolver,
    ) -> Result<Box<dyn ArtifactDriver>> {
        let (location, constructor) = dispatch(artifact, |kind| self.constructor(kind))?;
        constructor(ctx, location, resolver).await
    }
}

static DRIVER_REGISTRY: OnceLock<RwLock<DriverRegistry>> = OnceLock::new();

pub(crate) fn registry() -> &'static RwLock<DriverRegistry> {
    DRIVER_REGISTRY.get_or_init(|| RwLock::new(DriverRegistry::with_defaults()))
}

/// Registers a constructor in the process-wide registry.
///
/// Replaces the built-in constructor for `kind`, if any.
///
/// # Example
///
/// ```no_run
/// use artifactmux::drivers::http;
/// use artifactmux::factory::register_driver;
/// use artifactmux::{
///     ArtifactDriver, ArtifactError, ArtifactLocation, Context, DriverKind, Result, SecretResolver,
/// };
/// use futures::future::BoxFuture;
///
/// fn vendored_curl<'a>(
///     ctx: &'a Context,
///     _location: &'a ArtifactLocation,
///     _resolver: &'a dyn SecretResolver,
/// ) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
///     Box::pin(async move {
///         let mut driver = http::create_driver(ctx);
///         driver.program = "/opt/curl/bin/curl".to_string();
///         Ok::<_, ArtifactError>(Box::new(driver) as Box<dyn ArtifactDriver>)
///     })
/// }
///
/// register_driver(DriverKind::Http, vendored_curl);
/// ```
pub fn register_driver(kind: DriverKind, constructor: DriverConstructor) {
    let mut reg = registry().write().unwrap_or_else(PoisonError::into_inner);
    reg.register(kind, constructor);
}

/// Builds a credentialed driver for `artifact`.
///
/// The constructor registered for the artifact's backend is looked up in the
/// process-wide registry. Secrets are resolved through `resolver` only when
/// that backend needs them, and the first failure aborts construction.
///
/// # Errors
///
/// - [`ArtifactError::UnsupportedDriver`]: the artifact has no location, or
///   its backend is not compiled in (missing feature flag)
/// - any secret-resolution error returned by `resolver`, unchanged
///
/// # Example
///
/// ```
/// use artifactmux::{factory, Artifact, ArtifactError, Context};
/// use artifactmux::resolvers::FileSecretResolver;
///
/// #[tokio::main]
/// async fn main() {
///     let resolver = FileSecretResolver::new("/nonexistent");
///     let result = factory::new_driver(&Context::default(), &Artifact::new("empty"), &resolver).await;
///
///     assert!(matches!(result, Err(ArtifactError::UnsupportedDriver)));
/// }
/// ```
pub async fn new_driver(
    ctx: &Context,
    artifact: &Artifact,
    resolver: &dyn SecretResolver,
) -> Result<Box<dyn ArtifactDriver>> {
    let (location, constructor) = dispatch(artifact, |kind| {
        registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .constructor(kind)
    })?;
    constructor(ctx, location, resolver).await
}

fn dispatch<'a>(
    artifact: &'a Artifact,
    lookup: impl FnOnce(DriverKind) -> Option<DriverConstructor>,
) -> Result<(&'a ArtifactLocation, DriverConstructor)> {
    let location = artifact.location.as_ref().ok_or_else(|| {
        tracing::debug!(artifact = %artifact.name, "artifact has no location");
        ArtifactError::UnsupportedDriver
    })?;

    let kind = location.kind();
    let constructor = lookup(kind).ok_or_else(|| {
        tracing::debug!(artifact = %artifact.name, kind = %kind, "no driver registered");
        ArtifactError::UnsupportedDriver
    })?;

    tracing::debug!(artifact = %artifact.name, kind = %kind, "constructing driver");
    Ok((location, constructor))
}
