//! Startup wiring and the main supervision loop.

use anyhow::{Context, anyhow};
use pinpad_hardware::{ActuatorController, AnyGpio, DoorMonitor, DoorStatus, SysfsGpio};
use pinpad_keypad::{DisplayMessages, PinValidator};
use pinpad_link::LinkSender;
use pinpad_network::ControlSocket;
use pinpad_protocol::BeepKind;
use pinpad_storage::{CredentialStore, FailureIndicator, SyncOutcome, Synchronizer};
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;

/// Run the controller until a shutdown signal or a fatal failure.
///
/// # Errors
///
/// Startup failures (credential file, serial device, GPIO) and a failed
/// terminal link are returned; everything else is logged.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = CredentialStore::load(&config.sync.pin_path)
        .context("failed to load credential file")?;

    let serial = config.serial_config();
    let mut link = pinpad_link::open(&serial, config.link_config())
        .with_context(|| format!("failed to open terminal on {}", serial.device))?;
    let keys = link
        .take_key_events()
        .context("terminal key events already taken")?;
    let sender = link.sender();
    announce_startup(&sender);

    let gpio: AnyGpio = SysfsGpio::new(&config.actuator.gpio_base).into();
    let controller = ActuatorController::new(gpio.clone(), config.actuator_config());
    controller
        .initialize()
        .await
        .context("failed to initialize GPIO")?;

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let (actuator, worker) = controller.spawn(config.actuator.queue_capacity);
    tasks.push(worker);

    let (door, poller) = DoorMonitor::start(gpio, config.door_config()).await;
    tasks.push(poller);
    tasks.push(tokio::spawn(mirror_door(door.clone(), sender.clone())));

    let indicator = FailureIndicator::new(sender.clone(), config.sync_config().indicator_period);
    let mut sync = Synchronizer::new(store.clone(), config.sync_config(), indicator)
        .context("failed to create HTTP client")?;
    match sync.update().await {
        SyncOutcome::Failed(reason) => warn!("Initial credential sync failed: {}", reason),
        SyncOutcome::Unchanged => info!("Initial credential sync: unchanged"),
        SyncOutcome::Applied { entries } => info!("Initial credential sync: {} entries", entries),
    }
    tasks.push(tokio::spawn(sync.run()));

    if config.control.enabled {
        match ControlSocket::bind(config.control_config()) {
            Ok(socket) => tasks.push(tokio::spawn(socket.serve(actuator.clone()))),
            Err(e) => warn!("Control socket disabled: {}", e),
        }
    }

    let validator = PinValidator::new(store, sender, actuator, door, config.validator_config());
    let mut validator_task = tokio::spawn(validator.run(keys));

    info!("Pinpad controller running");
    let result = tokio::select! {
        reason = link.join() => {
            error!("Terminal link failed: {}", reason);
            Err(anyhow::Error::new(reason).context("terminal link failed"))
        }
        _ = &mut validator_task => Err(anyhow!("PIN validator stopped")),
        _ = shutdown_signal() => {
            info!("Shutting down");
            Ok(())
        }
    };

    validator_task.abort();
    for task in tasks {
        task.abort();
    }
    result
}

/// Power-up cue on the terminal.
fn announce_startup(link: &LinkSender) {
    link.beep(BeepKind::Short);
}

/// Show the door state whenever it changes.
async fn mirror_door(mut door: DoorStatus, link: LinkSender) {
    link.lcd_set(DisplayMessages::door(door.current()));
    while let Some(state) = door.changed().await {
        link.lcd_set(DisplayMessages::door(state));
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinpad_core::DoorState;
    use pinpad_protocol::Command;

    #[test]
    fn test_startup_beeps_short() {
        let (link, mut commands) = LinkSender::channel();
        announce_startup(&link);

        assert_eq!(commands.try_recv().unwrap(), Command::Beep(BeepKind::Short));
        assert!(commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mirror_door_only_updates_display() {
        let (link, mut commands) = LinkSender::channel();
        mirror_door(DoorStatus::fixed(DoorState::Closed), link).await;

        assert_eq!(
            commands.try_recv().unwrap(),
            Command::LcdSet(DisplayMessages::DOOR_CLOSED.to_string())
        );
        assert!(commands.try_recv().is_err());
    }
}
