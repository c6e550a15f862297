use anyhow::Context;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Orbit, Rocket};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Pair a fairing that reports the bound port at liftoff with the handle that receives it.
pub fn create_pair() -> (PortSaver, Port) {
    let (tx, rx) = oneshot::channel();
    let port_saver = PortSaver {
        sender: Mutex::new(Some(tx)),
    };
    (port_saver, Port { rx })
}

pub struct Port {
    rx: oneshot::Receiver<u16>,
}

impl Port {
    /// Resolves once the server is listening.
    pub async fn get(self) -> Result<u16, anyhow::Error> {
        self.rx
            .await
            .context("The server shut down before reporting its port.")
    }
}

pub struct PortSaver {
    sender: Mutex<Option<oneshot::Sender<u16>>>,
}

#[rocket::async_trait]
impl Fairing for PortSaver {
    fn info(&self) -> Info {
        Info {
            name: "Port Saver",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let sender = match self.sender.lock() {
            Ok(mut sender) => sender.take(),
            Err(_) => None,
        };
        if let Some(sender) = sender {
            let port = rocket.config().port;
            if sender.send(port).is_err() {
                tracing::warn!("Nobody was waiting for port {}", port);
            }
        }
    }
}
