use anyhow::Context;
use wallscape::configuration::get_configuration;
use wallscape::startup::{Application, Services};
use wallscape::telemetry::{get_subscriber, init_subscriber};

#[rocket::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("wallscape".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().context("Failed to read configuration.")?;
    let services = Services::from_settings(&configuration).await?;
    let application = Application::build(&configuration, services).await?;
    application.run_until_stopped().await
}
