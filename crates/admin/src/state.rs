//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AdminConfig, AuthConfig};
use crate::db::{
    AdminDirectory, OrderRepository, PgAdminDirectory, PgOrderRepository, PgProductCatalog,
    ProductCatalog,
};
use crate::identity::{IdentityError, IdentityProvider, StackAuthClient};
use crate::middleware::{AttemptCounter, ClientIpSource, MemoryAttemptCounter};
use crate::services::TokenService;

/// The collaborators handlers talk to.
///
/// Production wires the `Pg*` repositories and Stack Auth; tests pass
/// in-memory fakes.
pub struct Backends {
    pub admins: Arc<dyn AdminDirectory>,
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductCatalog>,
    /// `None` when Stack Auth is not configured; identity-gated routes then fail.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub login_attempts: Arc<dyn AttemptCounter>,
    /// How login attempts are attributed to a client.
    pub login_client_ip: ClientIpSource,
}

impl Backends {
    /// Production backends over a `PostgreSQL` pool.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the Stack Auth client cannot be built.
    pub fn postgres(pool: &PgPool, config: &AdminConfig) -> Result<Self, IdentityError> {
        let identity = match &config.identity {
            Some(stack) => {
                Some(Arc::new(StackAuthClient::new(stack)?) as Arc<dyn IdentityProvider>)
            }
            None => {
                tracing::warn!("STACK_PROJECT_ID not set; identity-gated admin routes are disabled");
                None
            }
        };

        Ok(Self {
            admins: Arc::new(PgAdminDirectory::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            products: Arc::new(PgProductCatalog::new(pool.clone())),
            identity,
            login_attempts: Arc::new(MemoryAttemptCounter::new(&config.login_limit)),
            login_client_ip: ClientIpSource::new(&config.login_limit),
        })
    }
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    auth: AuthConfig,
    tokens: TokenService,
    backends: Backends,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `pool` is only used by the readiness probe; pass `None` when the
    /// backends do not live in `PostgreSQL`.
    #[must_use]
    pub fn new(auth: AuthConfig, backends: Backends, pool: Option<PgPool>) -> Self {
        let tokens = TokenService::new(&auth);

        Self {
            inner: Arc::new(AppStateInner {
                auth,
                tokens,
                backends,
                pool,
            }),
        }
    }

    /// Authentication settings.
    #[must_use]
    pub fn auth_config(&self) -> &AuthConfig {
        &self.inner.auth
    }

    /// Admin token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Admin allow-list.
    #[must_use]
    pub fn admins(&self) -> &dyn AdminDirectory {
        self.inner.backends.admins.as_ref()
    }

    /// Order repository.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderRepository {
        self.inner.backends.orders.as_ref()
    }

    /// Product catalog.
    #[must_use]
    pub fn products(&self) -> &dyn ProductCatalog {
        self.inner.backends.products.as_ref()
    }

    /// Identity provider, if configured.
    #[must_use]
    pub fn identity(&self) -> Option<&dyn IdentityProvider> {
        self.inner.backends.identity.as_deref()
    }

    /// Login attempt counter.
    #[must_use]
    pub fn login_attempts(&self) -> &dyn AttemptCounter {
        self.inner.backends.login_attempts.as_ref()
    }

    /// Client address source for the login rate limit.
    #[must_use]
    pub fn login_client_ip(&self) -> &ClientIpSource {
        &self.inner.backends.login_client_ip
    }

    /// Database pool backing the readiness probe.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
