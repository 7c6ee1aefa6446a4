//! Response cache stage.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use melchett_core::{
    CORRELATION_ID_HEADER, CacheKey, CacheStore, CachedResponse, Context, ErrorRecord, Next,
    Stage, StageResult,
};
use tracing::{debug, warn};

use crate::cache_control::{cache_ttl, is_cacheable};
use crate::config::CacheSettings;
use crate::hash::request_hash;
use crate::metrics;

/// Serves GET responses from a [`CacheStore`] and stores cacheable ones.
///
/// Entries are keyed by client name and request hash. Store failures reject
/// the call with `ECACHEINIT`, `ECACHEREAD` or `ECACHESTORE` unless
/// [`CacheSettings::ignore_errors`] is set, in which case the cache is
/// bypassed.
pub struct CacheStage {
    store: Arc<dyn CacheStore>,
    settings: CacheSettings,
}

impl CacheStage {
    /// Creates the stage. The correlation header is always added to the
    /// do-not-vary list.
    pub fn new(store: Arc<dyn CacheStore>, mut settings: CacheSettings) -> Self {
        let header = CORRELATION_ID_HEADER;
        let correlation = header.as_str();
        if !settings
            .do_not_vary
            .iter()
            .any(|name| name.eq_ignore_ascii_case(correlation))
        {
            settings.do_not_vary.push(correlation.to_owned());
        }
        Self { store, settings }
    }

    /// Effective settings.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    fn key(&self, ctx: &Context) -> CacheKey {
        let request = ctx.request();
        CacheKey::new(
            ctx.client().name.clone(),
            request_hash(request.url(), request.headers(), &self.settings.do_not_vary),
        )
    }
}

impl fmt::Debug for CacheStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStage")
            .field("store", &self.store.name())
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl Stage for CacheStage {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> StageResult {
        if !self.store.is_ready() {
            if let Err(error) = self.store.start().await {
                if !self.settings.ignore_errors {
                    return ctx.reject(ErrorRecord::cache_init().with_details(error.to_string()));
                }
                warn!(client = %ctx.client().name, %error, "cache store failed to start, bypassing cache");
                return next.run(ctx).await;
            }
        }

        // Only GET responses are ever stored.
        if *ctx.request().method() != Method::GET {
            return next.run(ctx).await;
        }

        let key = self.key(ctx);
        match self.store.get(&key).await {
            Ok(Some(cached)) => {
                debug!(%key, "cache hit");
                metrics::record_cache_lookup(&ctx.client().name, true);
                ctx.response = Some(cached.into());
                return Ok(());
            }
            Ok(None) => {
                debug!(%key, "cache miss");
                metrics::record_cache_lookup(&ctx.client().name, false);
            }
            Err(error) if self.settings.ignore_errors => {
                warn!(%key, %error, "cache read failed, treating as miss");
            }
            Err(error) => {
                return ctx.reject(ErrorRecord::cache_read().with_details(error.to_string()));
            }
        }

        next.run(ctx).await?;

        let Some(response) = ctx.response.as_ref() else {
            return Ok(());
        };
        if !is_cacheable(ctx.request().method(), response) {
            return Ok(());
        }
        let ttl = cache_ttl(response, self.settings.cache_ttl);
        let value = CachedResponse::from(response);

        match self.store.set(&key, value, ttl).await {
            Ok(()) => {
                debug!(%key, ttl_secs = ttl.as_secs(), "response cached");
                Ok(())
            }
            Err(error) if self.settings.ignore_errors => {
                warn!(%key, %error, "cache write failed");
                Ok(())
            }
            Err(error) => ctx.reject(ErrorRecord::cache_store().with_details(error.to_string())),
        }
    }
}

