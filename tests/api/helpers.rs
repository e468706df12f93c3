use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::{Connection, PgConnection};
use dieta_billing::configuration::{get_configuration, Settings};
use dieta_billing::domain::{BearerToken, UserEmail};
use dieta_billing::identity::{IdentifiedUser, IdentityProvider};
use dieta_billing::models::SubscriptionStatusRow;
use dieta_billing::payments::{ActiveSubscription, BillingPortalSession, Customer, PaymentProcessor};
use dieta_billing::startup::Application;
use dieta_billing::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".into();
    let subscriber_name = "test".into();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber).expect("Failed to install the test subscriber.");
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber).expect("Failed to install the test subscriber.");
    }
});

/// Accepts exactly the tokens handed out by `sign_in`.
#[derive(Default)]
pub struct TestIdentityProvider {
    users: Mutex<HashMap<String, IdentifiedUser>>,
}

#[async_trait]
impl IdentityProvider for TestIdentityProvider {
    async fn get_user(&self, token: &BearerToken) -> Result<IdentifiedUser, anyhow::Error> {
        self.users
            .lock()
            .unwrap()
            .get(token.expose_secret())
            .cloned()
            .ok_or_else(|| anyhow!("Invalid or expired access token."))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StripeCall {
    FindCustomer { email: String },
    FindActiveSubscription { customer_id: String },
    CreatePortalSession { customer_id: String, return_url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripeEndpoint {
    Customers,
    Subscriptions,
    PortalSessions,
}

impl StripeCall {
    fn endpoint(&self) -> StripeEndpoint {
        match self {
            StripeCall::FindCustomer { .. } => StripeEndpoint::Customers,
            StripeCall::FindActiveSubscription { .. } => StripeEndpoint::Subscriptions,
            StripeCall::CreatePortalSession { .. } => StripeEndpoint::PortalSessions,
        }
    }
}

/// In-memory stand-in for Stripe that records every call it receives.
#[derive(Default)]
pub struct TestPaymentProcessor {
    customers: Mutex<HashMap<String, Customer>>,
    subscriptions: Mutex<HashMap<String, ActiveSubscription>>,
    failure: Mutex<Option<String>>,
    endpoint_failures: Mutex<HashMap<StripeEndpoint, String>>,
    pub calls: Mutex<Vec<StripeCall>>,
}

impl TestPaymentProcessor {
    pub fn add_customer(&self, email: &str) -> String {
        let id = format!("cus_{}", Uuid::new_v4().to_simple());
        self.customers.lock().unwrap().insert(
            email.to_string(),
            Customer { id: id.clone() },
        );
        id
    }

    pub fn set_active_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        current_period_end: DateTime<Utc>,
    ) -> String {
        let id = format!("sub_{}", Uuid::new_v4().to_simple());
        self.subscriptions.lock().unwrap().insert(
            customer_id.to_string(),
            ActiveSubscription {
                id: id.clone(),
                price_id: Some(price_id.to_string()),
                current_period_end: Some(current_period_end),
            },
        );
        id
    }

    pub fn cancel_subscription(&self, customer_id: &str) {
        self.subscriptions.lock().unwrap().remove(customer_id);
    }

    /// Every call fails from now on.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Only calls to `endpoint` fail from now on.
    pub fn fail_endpoint_with(&self, endpoint: StripeEndpoint, message: &str) {
        self.endpoint_failures
            .lock()
            .unwrap()
            .insert(endpoint, message.to_string());
    }

    pub fn calls(&self) -> Vec<StripeCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: StripeCall) -> Result<(), anyhow::Error> {
        let endpoint = call.endpoint();
        self.calls.lock().unwrap().push(call);
        if let Some(message) = self.failure.lock().unwrap().as_ref() {
            return Err(anyhow!(message.clone()));
        }
        match self.endpoint_failures.lock().unwrap().get(&endpoint) {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProcessor for TestPaymentProcessor {
    async fn find_customer_by_email(
        &self,
        email: &UserEmail,
    ) -> Result<Option<Customer>, anyhow::Error> {
        self.record(StripeCall::FindCustomer {
            email: email.as_ref().to_string(),
        })?;
        Ok(self.customers.lock().unwrap().get(email.as_ref()).cloned())
    }

    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<ActiveSubscription>, anyhow::Error> {
        self.record(StripeCall::FindActiveSubscription {
            customer_id: customer_id.to_string(),
        })?;
        Ok(self.subscriptions.lock().unwrap().get(customer_id).cloned())
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<BillingPortalSession, anyhow::Error> {
        self.record(StripeCall::CreatePortalSession {
            customer_id: customer_id.to_string(),
            return_url: return_url.to_string(),
        })?;
        Ok(BillingPortalSession {
            id: "bps_test".into(),
            url: format!("https://billing.stripe.test/session/{}", customer_id),
        })
    }
}

pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

pub struct TestApp {
    pub address: String,
    pub db_connection: PgConnection,
    pub identity: Arc<TestIdentityProvider>,
    pub payments: Arc<TestPaymentProcessor>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub fn sign_in(&self) -> TestUser {
        let user_id = Uuid::new_v4();
        let email = format!("{}@dieta.test", user_id.to_simple());
        let token = Uuid::new_v4().to_string();
        self.identity.users.lock().unwrap().insert(
            token.clone(),
            IdentifiedUser {
                user_id,
                email: UserEmail::parse(email.clone()).unwrap(),
            },
        );
        TestUser {
            user_id,
            email,
            token,
        }
    }

    pub async fn post_check_subscription(&self, token: Option<&str>) -> reqwest::Response {
        self.check_subscription(reqwest::Method::POST, token).await
    }

    pub async fn check_subscription(
        &self,
        method: reqwest::Method,
        token: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .api_client
            .request(method, &format!("{}/check-subscription", &self.address));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn post_customer_portal(
        &self,
        token: Option<&str>,
        origin: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .api_client
            .post(&format!("{}/customer-portal", &self.address));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(origin) = origin {
            request = request.header("Origin", origin);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub fn insert_plan(&self, name: &str, price_cents: i32, stripe_price_id: Option<&str>) -> Uuid {
        use dieta_billing::schema::subscription_plans as plans;
        let plan_id = Uuid::new_v4();
        diesel::insert_into(plans::table)
            .values((
                plans::id.eq(plan_id),
                plans::name.eq(name),
                plans::price_cents.eq(price_cents),
                plans::stripe_price_id.eq(stripe_price_id),
            ))
            .execute(&self.db_connection)
            .expect("Failed to insert plan.");
        plan_id
    }

    pub fn deactivate_plan(&self, plan_id: Uuid) {
        use dieta_billing::schema::subscription_plans as plans;
        diesel::update(plans::table.filter(plans::id.eq(plan_id)))
            .set(plans::is_active.eq(false))
            .execute(&self.db_connection)
            .expect("Failed to deactivate plan.");
    }

    /// Makes every plan lookup fail from now on.
    pub fn drop_plans_table(&self) {
        diesel::sql_query("DROP TABLE subscription_plans CASCADE")
            .execute(&self.db_connection)
            .expect("Failed to drop the plans table.");
    }

    pub fn stored_status(&self, user_id: Uuid) -> Option<SubscriptionStatusRow> {
        use dieta_billing::schema::user_subscriptions as subs;
        subs::table
            .filter(subs::user_id.eq(user_id))
            .first::<SubscriptionStatusRow>(&self.db_connection)
            .optional()
            .expect("Failed to query subscription status.")
    }

    pub fn count_status_rows(&self) -> i64 {
        use dieta_billing::schema::user_subscriptions as subs;
        subs::table
            .count()
            .get_result(&self.db_connection)
            .expect("Failed to count subscription status rows.")
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.application.port = None;
        c.application.base_url = "https://dietafacil.test".into();
        c.application.portal_return_path = "/assinatura".into();
        c.database.database_name = Uuid::new_v4().to_string();
        c
    };

    create_database(&configuration);

    let identity = Arc::new(TestIdentityProvider::default());
    let payments = Arc::new(TestPaymentProcessor::default());

    let app = Application::build(&configuration, identity.clone(), payments.clone())
        .await
        .expect("Failed to build application.");
    let port = app.port;
    let _ = tokio::spawn(app.server.launch());
    let port = port.get().await.expect("The server never reported its port.");

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        db_connection: connect_to_database(&configuration),
        identity,
        payments,
        api_client: reqwest::Client::new(),
    }
}

fn create_database(configuration: &Settings) {
    let connection = connect_without_database(configuration);

    diesel::sql_query(format!(
        "CREATE DATABASE \"{}\"",
        configuration.database.database_name
    ))
    .execute(&connection)
    .expect("Failed to create database.");
}

fn connect_to_database(configuration: &Settings) -> PgConnection {
    let connection_string = configuration.database.connection_string();
    PgConnection::establish(&connection_string).expect("Failed to connect to Postgres.")
}

fn connect_without_database(configuration: &Settings) -> PgConnection {
    let connection_string = configuration.database.connection_string_without_database();
    PgConnection::establish(&connection_string).expect("Failed to connect to Postgres.")
}
