use rocket::fairing::Info;
use rocket::{Orbit, Rocket};
use tokio::sync::watch;

pub fn create_pair() -> (PortSaver, Port) {
    let (tx, rx) = watch::channel(None);
    (PortSaver { sender: tx }, Port { receiver: rx })
}

/// The port the server actually bound, known once it has lifted off.
pub struct Port {
    receiver: watch::Receiver<Option<u16>>,
}

impl Port {
    /// Waits for liftoff. `None` if the server was dropped before binding.
    pub async fn get(&self) -> Option<u16> {
        let mut receiver = self.receiver.clone();
        loop {
            if let Some(port) = *receiver.borrow() {
                return Some(port);
            }
            receiver.changed().await.ok()?;
        }
    }
}

pub struct PortSaver {
    sender: watch::Sender<Option<u16>>,
}

#[rocket::async_trait]
impl rocket::fairing::Fairing for PortSaver {
    fn info(&self) -> Info {
        Info {
            name: "Port Saver",
            kind: rocket::fairing::Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let port = rocket.config().port;
        tracing::info!(port, "Billing API is listening");
        if self.sender.send(Some(port)).is_err() {
            tracing::debug!("Nobody is waiting for the bound port");
        }
    }
}
