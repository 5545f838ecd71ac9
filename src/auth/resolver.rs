//! Name resolution hooks used by the `resolveEns` / `resolveLens` login flags

use async_trait::async_trait;

use crate::models::{EnsData, LensProfile};

/// Looks up public names for an authenticated address
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_ens(&self, address: &str) -> Option<EnsData>;

    async fn resolve_lens(&self, address: &str) -> Option<Vec<LensProfile>>;
}

/// Resolver that knows no names
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

#[async_trait]
impl IdentityResolver for NoopResolver {
    async fn resolve_ens(&self, _address: &str) -> Option<EnsData> {
        None
    }

    async fn resolve_lens(&self, _address: &str) -> Option<Vec<LensProfile>> {
        None
    }
}
