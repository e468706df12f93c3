use crate::configuration::Settings;
use crate::cors::Cors;
use crate::identity::IdentityProvider;
use crate::payments::PaymentProcessor;
use crate::port_saver;
use crate::port_saver::Port;
use crate::routes::*;
use rocket::fairing::AdHoc;
use rocket::{Build, Ignite, Rocket};
use rocket_sync_db_pools::{database, diesel};
use std::sync::Arc;

embed_migrations!();

#[database("billing")]
pub struct BillingDbConn(diesel::PgConnection);

pub struct Application {
    pub server: Rocket<Ignite>,
    pub port: Port,
}

impl Application {
    /// Ignites the server: the database pool is opened and pending migrations
    /// are applied, but nothing listens until `server.launch()`.
    pub async fn build(
        configuration: &Settings,
        identity: Arc<dyn IdentityProvider>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Result<Application, rocket::Error> {
        let (port_saver, port) = port_saver::create_pair();
        let figment = rocket::Config::figment()
            .merge(("address", configuration.application.host))
            .merge(("port", configuration.application.port.unwrap_or(0)))
            .merge(("log_level", "off"))
            .merge((
                "databases.billing.url",
                configuration.database.connection_string(),
            ));
        let return_target = PortalReturnTarget {
            fallback_origin: configuration.application.base_url.clone(),
            path: configuration.application.portal_return_path.clone(),
        };

        let server = rocket::custom(figment)
            .attach(BillingDbConn::fairing())
            .attach(AdHoc::try_on_ignite("Database migrations", run_migrations))
            .attach(Cors)
            .attach(port_saver)
            .manage(identity)
            .manage(payments)
            .manage(return_target)
            .mount(
                "/",
                routes![
                    crate::routes::health_check::health_check,
                    list_plans,
                    crate::routes::check_subscription::check_subscription,
                    check_subscription_get,
                    check_subscription_put,
                    check_subscription_patch,
                    check_subscription_delete,
                    check_subscription_preflight,
                    crate::routes::customer_portal::customer_portal,
                    customer_portal_get,
                    customer_portal_put,
                    customer_portal_patch,
                    customer_portal_delete,
                    customer_portal_preflight,
                ],
            )
            .register("/", catchers![crate::catchers::json_error::json_error])
            .ignite()
            .await?;
        Ok(Application { server, port })
    }
}

async fn run_migrations(rocket: Rocket<Build>) -> Result<Rocket<Build>, Rocket<Build>> {
    let conn = match BillingDbConn::get_one(&rocket).await {
        Some(conn) => conn,
        None => {
            tracing::error!("No database connection available to run migrations");
            return Err(rocket);
        }
    };
    let outcome = conn.run(|c| embedded_migrations::run(c)).await;
    match outcome {
        Ok(()) => Ok(rocket),
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "Failed to run database migrations");
            Err(rocket)
        }
    }
}
