use crate::configuration::StripeSettings;
use crate::domain::UserEmail;
use crate::payments::{ActiveSubscription, BillingPortalSession, Customer, PaymentProcessor};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub struct StripeClient {
    http_client: Client,
    base_url: String,
    secret_key: Secret<String>,
}

impl StripeClient {
    pub fn new(settings: &StripeSettings) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            secret_key: Secret::new(settings.secret_key.expose_secret().clone()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct List<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct CustomerObject {
    id: String,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: String,
    current_period_end: Option<i64>,
    items: Option<List<SubscriptionItemObject>>,
}

#[derive(Deserialize)]
struct SubscriptionItemObject {
    price: Option<PriceObject>,
    current_period_end: Option<i64>,
}

#[derive(Deserialize)]
struct PriceObject {
    id: String,
}

#[derive(Deserialize)]
struct PortalSessionObject {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

impl From<CustomerObject> for Customer {
    fn from(customer: CustomerObject) -> Self {
        Customer { id: customer.id }
    }
}

impl From<SubscriptionObject> for ActiveSubscription {
    fn from(subscription: SubscriptionObject) -> Self {
        let first_item = subscription.items.and_then(|items| items.data.into_iter().next());
        // Newer API versions only report the period on subscription items.
        let period_end = subscription
            .current_period_end
            .or_else(|| first_item.as_ref().and_then(|item| item.current_period_end));
        ActiveSubscription {
            id: subscription.id,
            price_id: first_item.and_then(|item| item.price).map(|price| price.id),
            current_period_end: period_end.and_then(from_unix_seconds),
        }
    }
}

fn from_unix_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, anyhow::Error> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .context("Failed to decode the Stripe API response.");
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!(error_message(status.as_u16(), &body)))
}

fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| format!("Stripe API request failed with status {}.", status))
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[tracing::instrument(name = "Look up Stripe customer by email", skip(self))]
    async fn find_customer_by_email(
        &self,
        email: &UserEmail,
    ) -> Result<Option<Customer>, anyhow::Error> {
        let response = self
            .http_client
            .get(self.endpoint("customers"))
            .bearer_auth(self.secret_key.expose_secret())
            .query(&[("email", email.as_ref()), ("limit", "1")])
            .send()
            .await
            .context("Failed to reach the Stripe customers API.")?;
        let customers: List<CustomerObject> = decode(response).await?;
        Ok(customers.data.into_iter().next().map(Customer::from))
    }

    #[tracing::instrument(name = "List active Stripe subscriptions", skip(self))]
    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<ActiveSubscription>, anyhow::Error> {
        let response = self
            .http_client
            .get(self.endpoint("subscriptions"))
            .bearer_auth(self.secret_key.expose_secret())
            .query(&[("customer", customer_id), ("status", "active"), ("limit", "1")])
            .send()
            .await
            .context("Failed to reach the Stripe subscriptions API.")?;
        let subscriptions: List<SubscriptionObject> = decode(response).await?;
        Ok(subscriptions
            .data
            .into_iter()
            .next()
            .map(ActiveSubscription::from))
    }

    #[tracing::instrument(name = "Create Stripe billing portal session", skip(self))]
    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<BillingPortalSession, anyhow::Error> {
        let response = self
            .http_client
            .post(self.endpoint("billing_portal/sessions"))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&[("customer", customer_id), ("return_url", return_url)])
            .send()
            .await
            .context("Failed to reach the Stripe billing portal API.")?;
        let session: PortalSessionObject = decode(response).await?;
        Ok(BillingPortalSession {
            id: session.id,
            url: session.url,
        })
    }
}
