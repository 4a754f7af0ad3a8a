//! Shared fixtures for admin router tests.
//!
//! Every backend is an in-memory fake so the full router, extractors and
//! middleware run without `PostgreSQL` or Stack Auth.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderName, Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::{TimeDelta, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use atelier_admin::config::{AuthConfig, LoginCredentials};
use atelier_admin::db::{AdminDirectory, OrderRepository, ProductCatalog, RepositoryError};
use atelier_admin::identity::{IdentityError, IdentityProvider, IdentityUser};
use atelier_admin::middleware::{ClientIpSource, MemoryAttemptCounter};
use atelier_admin::models::{AdminProfile, LineItem, Order, OrderFilter, Product};
use atelier_admin::state::{AppState, Backends};
use atelier_core::{AdminProfileId, CurrencyCode, Email, OrderId, OrderStatus, Price, ProductId};

pub const JWT_SECRET: &str = "k3J9xq2LmP8vR4tY7wZ1aB6cD0eF5gH3";
pub const LEGACY_SECRET: &str = "Lg7#vQ2$wX9!pR4&";
pub const LOGIN_USERNAME: &str = "ops";
pub const LOGIN_PASSWORD: &str = "s3cure-Pass!";
pub const LEGACY_EMAIL: &str = "admin@atelier.local";

/// Access token of a signed-in user who is on the allow-list.
pub const ADMIN_SESSION: &str = "session-admin";
/// Access token of a signed-in user who is not on the allow-list.
pub const SHOPPER_SESSION: &str = "session-shopper";
pub const ADMIN_EMAIL: &str = "curator@atelier.test";
pub const SHOPPER_EMAIL: &str = "shopper@example.test";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SecretString::from(JWT_SECRET.to_string()),
        token_lifetime: TimeDelta::hours(24),
        login: Some(LoginCredentials {
            username: LOGIN_USERNAME.to_string(),
            password: SecretString::from(LOGIN_PASSWORD.to_string()),
        }),
        legacy_session_secret: Some(SecretString::from(LEGACY_SECRET.to_string())),
        legacy_email: Email::parse(LEGACY_EMAIL).unwrap(),
    }
}

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
pub struct FakeAdmins {
    profiles: Vec<AdminProfile>,
    fail: bool,
}

impl FakeAdmins {
    pub fn with_admin(email: &str) -> Self {
        Self {
            profiles: vec![AdminProfile {
                id: AdminProfileId::new(1),
                identity_id: "user-curator".to_string(),
                email: Email::parse(email).unwrap(),
                created_at: Utc::now(),
            }],
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            profiles: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl AdminDirectory for FakeAdmins {
    async fn find_by_email(&self, email: &Email) -> Result<Option<AdminProfile>, RepositoryError> {
        if self.fail {
            return Err(RepositoryError::DataCorruption("allow-list unavailable".to_string()));
        }
        Ok(self.profiles.iter().find(|p| &p.email == email).cloned())
    }
}

#[derive(Default)]
pub struct FakeOrders {
    orders: Mutex<HashMap<OrderId, Order>>,
    writes: Mutex<u32>,
    race_next_write: AtomicBool,
}

impl FakeOrders {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(orders.into_iter().map(|o| (o.id, o)).collect()),
            ..Self::default()
        }
    }

    /// Make the next status write see a version bumped by someone else.
    pub fn race_next_write(&self) {
        self.race_next_write.store(true, Ordering::SeqCst);
    }

    pub fn writes(&self) -> u32 {
        *self.writes.lock().unwrap()
    }

    pub fn stored(&self, id: i64) -> Order {
        self.orders.lock().unwrap()[&OrderId::new(id)].clone()
    }
}

#[async_trait]
impl OrderRepository for FakeOrders {
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.id));
        orders.truncate(usize::try_from(filter.limit).unwrap());
        Ok(orders)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected_version: i64,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.get_mut(&id) else {
            return Ok(None);
        };

        if self.race_next_write.swap(false, Ordering::SeqCst) {
            order.version += 1;
        }
        if order.version != expected_version {
            return Ok(None);
        }

        *self.writes.lock().unwrap() += 1;
        order.status = status;
        order.version += 1;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

pub struct FakeProducts(pub Vec<Product>);

#[async_trait]
impl ProductCatalog for FakeProducts {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.0.clone())
    }
}

pub struct FakeIdentity {
    sessions: HashMap<String, IdentityUser>,
    fail: bool,
}

impl FakeIdentity {
    pub fn standard() -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(
            ADMIN_SESSION.to_string(),
            IdentityUser {
                id: "user-curator".to_string(),
                primary_email: Some(ADMIN_EMAIL.to_string()),
            },
        );
        sessions.insert(
            SHOPPER_SESSION.to_string(),
            IdentityUser {
                id: "user-shopper".to_string(),
                primary_email: Some(SHOPPER_EMAIL.to_string()),
            },
        );
        Self {
            sessions,
            fail: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            sessions: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn current_user(
        &self,
        access_token: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        if self.fail {
            return Err(IdentityError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            });
        }
        Ok(self.sessions.get(access_token).cloned())
    }
}

// =============================================================================
// Sample data
// =============================================================================

pub fn order(id: i64, status: OrderStatus) -> Order {
    Order {
        id: OrderId::new(id),
        status,
        total: Price::new(Decimal::new(12950, 2), CurrencyCode::EUR),
        line_items: vec![LineItem {
            product_id: Some(ProductId::new(3)),
            name: "Silk scarf".to_string(),
            quantity: 1,
            unit_price: Decimal::new(12950, 2),
        }],
        version: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn product(id: i64, slug: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: slug.replace('-', " "),
        slug: slug.to_string(),
        price: Price::new(Decimal::new(8900, 2), CurrencyCode::EUR),
        active: true,
        created_at: Utc::now(),
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A router plus handles on the fakes behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub orders: Arc<FakeOrders>,
}

pub struct TestAppBuilder {
    admins: FakeAdmins,
    orders: Vec<Order>,
    identity: Option<FakeIdentity>,
    max_attempts: u32,
    window: Duration,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            admins: FakeAdmins::with_admin(ADMIN_EMAIL),
            orders: vec![
                order(1, OrderStatus::Pending),
                order(2, OrderStatus::Shipped),
                order(3, OrderStatus::Cancelled),
            ],
            identity: Some(FakeIdentity::standard()),
            max_attempts: 5,
            window: Duration::from_secs(900),
        }
    }
}

impl TestAppBuilder {
    pub fn admins(mut self, admins: FakeAdmins) -> Self {
        self.admins = admins;
        self
    }

    pub fn identity(mut self, identity: Option<FakeIdentity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn login_limit(mut self, max_attempts: u32, window: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.window = window;
        self
    }

    pub fn build(self) -> TestApp {
        let orders = Arc::new(FakeOrders::with_orders(self.orders));
        let backends = Backends {
            admins: Arc::new(self.admins),
            orders: orders.clone(),
            products: Arc::new(FakeProducts(vec![
                product(1, "linen-shirt"),
                product(2, "wool-coat"),
            ])),
            identity: self
                .identity
                .map(|i| Arc::new(i) as Arc<dyn IdentityProvider>),
            login_attempts: Arc::new(MemoryAttemptCounter::with_window(
                self.max_attempts,
                self.window,
            )),
            login_client_ip: ClientIpSource::header(HeaderName::from_static(TRUSTED_IP_HEADER)),
        };
        let state = AppState::new(auth_config(), backends, None);

        TestApp {
            router: atelier_admin::app(state.clone()),
            state,
            orders,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::default().build()
}

impl TestApp {
    /// Send a request and return status plus parsed JSON body (`Null` if empty or not JSON).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// Token signed with the test secret.
    pub fn token(&self) -> String {
        self.state
            .tokens()
            .issue("admin-7", ADMIN_EMAIL, atelier_core::AdminRole::Admin)
            .unwrap()
    }

    pub fn token_with_lifetime(&self, lifetime: TimeDelta) -> String {
        self.state
            .tokens()
            .issue_with_lifetime("admin-7", ADMIN_EMAIL, atelier_core::AdminRole::Admin, lifetime)
            .unwrap()
    }
}

// =============================================================================
// Request helpers
// =============================================================================

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn get_with(uri: &str, header: &str, value: &str) -> Request<Body> {
    Request::get(uri)
        .header(header, value)
        .body(Body::empty())
        .unwrap()
}

pub fn bearer(uri: &str, token: &str) -> Request<Body> {
    get_with(uri, "authorization", &format!("Bearer {token}"))
}

/// Header the test app trusts for the client IP, as on Fly.
pub const TRUSTED_IP_HEADER: &str = "fly-client-ip";

pub fn login_request(username: &str, password: &str, client_ip: &str) -> Request<Body> {
    login_request_with(username, password, &[(TRUSTED_IP_HEADER, client_ip)])
}

/// Login request carrying arbitrary headers.
pub fn login_request_with(
    username: &str,
    password: &str,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let body = serde_json::json!({ "username": username, "password": password });
    let mut builder = Request::post("/admin/auth").header(CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn put_status(id: &str, status: &str, token: &str) -> Request<Body> {
    let body = serde_json::json!({ "status": status });
    Request::put(format!("/admin/orders/{id}/status"))
        .header(CONTENT_TYPE, "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}
