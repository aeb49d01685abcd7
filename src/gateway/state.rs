use std::{sync::Arc, time::Duration};
use url::Url;

use super::{
    cookies::CookiePolicy,
    proxy::ApiProxy,
    upstream::{HttpUpstream, Upstream, UpstreamError},
};
use crate::{
    cache::{DEFAULT_MAX_ENTRIES, ProfileCache, ServiceNameCache},
    token::KeySet,
};

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub public_api_url: Url,
    pub internal_api_url: Url,
    pub upstream_timeout: Duration,
    pub cookie_domain: Option<String>,
    pub secure_cookies: bool,
    pub cache_max_entries: usize,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(public_api_url: Url, internal_api_url: Url) -> Self {
        Self {
            public_api_url,
            internal_api_url,
            upstream_timeout: Duration::from_secs(10),
            cookie_domain: None,
            secure_cookies: false,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: Option<String>) -> Self {
        self.cookie_domain = domain;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_cache_max_entries(mut self, max_entries: usize) -> Self {
        self.cache_max_entries = max_entries;
        self
    }

    #[must_use]
    pub fn proxy(&self) -> ApiProxy {
        ApiProxy::new(self.public_api_url.clone(), self.internal_api_url.clone())
    }
}

/// Everything the request pipeline shares, built once per process.
pub struct GatewayState {
    keys: KeySet,
    profiles: Arc<ProfileCache>,
    services: ServiceNameCache,
    upstream: Arc<dyn Upstream>,
    cookies: CookiePolicy,
}

impl GatewayState {
    #[must_use]
    pub fn new(keys: KeySet, upstream: Arc<dyn Upstream>, config: &GatewayConfig) -> Self {
        Self {
            keys,
            profiles: Arc::new(ProfileCache::new(config.cache_max_entries)),
            services: ServiceNameCache::default(),
            upstream,
            cookies: CookiePolicy::new(config.cookie_domain.clone(), config.secure_cookies),
        }
    }

    /// Build the state with the HTTP upstream client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_http_upstream(keys: KeySet, config: &GatewayConfig) -> Result<Self, UpstreamError> {
        let upstream = HttpUpstream::new(config.proxy(), config.upstream_timeout)?;
        Ok(Self::new(keys, Arc::new(upstream), config))
    }

    #[must_use]
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    #[must_use]
    pub fn profiles(&self) -> &Arc<ProfileCache> {
        &self.profiles
    }

    #[must_use]
    pub fn services(&self) -> &ServiceNameCache {
        &self.services
    }

    #[must_use]
    pub fn upstream(&self) -> &dyn Upstream {
        self.upstream.as_ref()
    }

    #[must_use]
    pub fn cookies(&self) -> &CookiePolicy {
        &self.cookies
    }
}
