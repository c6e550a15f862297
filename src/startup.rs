use crate::auth_provider::{AuthProvider, SupabaseAuthClient};
use crate::catchers::*;
use crate::configuration::Settings;
use crate::domain::UserEmail;
use crate::email::{Email, SesEmailClient};
use crate::guards::SessionKeys;
use crate::image_generation::{ImageGenerator, StabilityClient};
use crate::port_saver;
use crate::port_saver::Port;
use crate::routes::*;
use crate::stripe::{RealStripeClient, StripeClient};
use anyhow::{anyhow, Context};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::fairing::{self, AdHoc};
use rocket::{Build, Ignite, Rocket};
use rocket_sync_db_pools::database;
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[database("wallscape")]
pub struct WallscapeDbConn(diesel::PgConnection);

/// Public URL of the web front end.
pub struct ApplicationBaseUrl(pub String);

pub struct StripeWebhookSecret(pub Option<Secret<String>>);

/// Inbox for contact form submissions and signup notifications.
pub struct TeamEmail(pub UserEmail);

/// The external collaborators, swapped for fakes in tests.
pub struct Services {
    pub email: Arc<dyn Email>,
    pub stripe: Arc<dyn StripeClient>,
    pub image_generator: Arc<dyn ImageGenerator>,
    pub auth_provider: Arc<dyn AuthProvider>,
}

impl Services {
    pub async fn from_settings(settings: &Settings) -> Result<Services, anyhow::Error> {
        Ok(Services {
            email: Arc::new(SesEmailClient::new(settings).await?),
            stripe: Arc::new(RealStripeClient::new(&settings.stripe)),
            image_generator: Arc::new(StabilityClient::new(&settings.image_generation)?),
            auth_provider: Arc::new(SupabaseAuthClient::new(&settings.auth)?),
        })
    }
}

pub struct Application {
    pub server: Rocket<Ignite>,
    pub port: Port,
}

impl Application {
    pub async fn build(settings: &Settings, services: Services) -> Result<Self, anyhow::Error> {
        let team = settings
            .email_client
            .team()
            .map_err(anyhow::Error::msg)
            .context("Invalid team email address.")?;
        let body_limit = settings.application.json_limit_megabytes * 1024 * 1024;
        let figment = rocket::Config::figment()
            .merge(("port", settings.application.port.unwrap_or(0)))
            .merge(("address", settings.application.host))
            .merge(("log_level", "off"))
            .merge(("limits.json", body_limit))
            .merge(("limits.string", body_limit))
            .merge((
                "databases.wallscape.url",
                settings.database.connection_string().expose_secret().clone(),
            ));

        let (port_saver, port) = port_saver::create_pair();
        let server = rocket::custom(figment)
            .attach(WallscapeDbConn::fairing())
            .attach(AdHoc::try_on_ignite("Database migrations", run_migrations))
            .attach(port_saver)
            .manage(SessionKeys::new(&settings.auth))
            .manage(ApplicationBaseUrl(settings.application.base_url.clone()))
            .manage(StripeWebhookSecret(settings.stripe.webhook_secret.clone()))
            .manage(TeamEmail(team))
            .manage(services.email)
            .manage(services.stripe)
            .manage(services.image_generator)
            .manage(services.auth_provider)
            .mount(
                "/",
                routes![
                    health,
                    create_checkout_session,
                    create_subscription,
                    downgrade_to_free,
                    reactivate_subscription,
                    refresh_subscription,
                    create_portal_session,
                    stripe_webhook,
                    generate_image,
                    generate_from_image,
                    track_usage,
                    list_wallpapers,
                    save_wallpaper,
                    update_wallpaper,
                    delete_wallpaper,
                    submit_contact_form,
                    newsletter_signup,
                    create_profile,
                    session_profile,
                    get_profile,
                    update_profile,
                    verify_email,
                    logout,
                ],
            )
            .register(
                "/",
                catchers![
                    bad_request,
                    unauthorized_request_credentials,
                    route_not_found,
                    unprocessable_entity_to_bad_request,
                ],
            )
            .ignite()
            .await
            .map_err(|e| anyhow!("Failed to ignite the server: {}", e))?;
        Ok(Application { server, port })
    }

    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        self.server
            .launch()
            .await
            .map(|_| ())
            .map_err(|e| anyhow!("The server stopped with an error: {}", e))
    }
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    let conn = match WallscapeDbConn::get_one(&rocket).await {
        Some(conn) => conn,
        None => {
            tracing::error!("No database connection available for migrations");
            return Err(rocket);
        }
    };
    let migrated = conn
        .run(|c| {
            c.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                .map_err(|e| e.to_string())
        })
        .await;
    match migrated {
        Ok(count) => {
            tracing::info!("Applied {} pending migrations", count);
            Ok(rocket)
        }
        Err(error) => {
            tracing::error!("Failed to run database migrations: {}", error);
            Err(rocket)
        }
    }
}
