use anyhow::{anyhow, Context};
use dieta_billing::configuration::get_configuration;
use dieta_billing::identity::SupabaseAuthClient;
use dieta_billing::payments::StripeClient;
use dieta_billing::startup::Application;
use dieta_billing::telemetry::{get_subscriber, init_subscriber};
use std::sync::Arc;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("dieta_billing".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;

    let configuration = get_configuration().context("Failed to read configuration.")?;
    let identity = SupabaseAuthClient::new(&configuration.supabase)
        .context("Failed to build the identity provider client.")?;
    let payments =
        StripeClient::new(&configuration.stripe).context("Failed to build the Stripe client.")?;

    let application = Application::build(&configuration, Arc::new(identity), Arc::new(payments))
        .await
        .map_err(|e| anyhow!("Failed to build the application: {}", e))?;
    application
        .server
        .launch()
        .await
        .map_err(|e| anyhow!("The server stopped unexpectedly: {}", e))?;
    Ok(())
}
