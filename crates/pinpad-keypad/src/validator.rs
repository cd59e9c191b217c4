//! Async driver around [`PinEntry`].
//!
//! Consumes key events, gives feedback on the terminal, hands decisions to
//! the actuator and restores the idle screen after a rejection.

use std::time::Duration;

use pinpad_core::constants::{DEFAULT_STATUS_RESTORE_DELAY_MS, MASK_CHAR};
use pinpad_core::{ActuatorCommand, KeyEvent};
use pinpad_hardware::{ActuatorHandle, DoorStatus};
use pinpad_link::{KeyEvents, LinkSender};
use pinpad_protocol::{BeepKind, Led};
use pinpad_storage::CredentialLookup;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::messages::DisplayMessages;
use crate::state_machine::{Decision, KeyOutcome, PinEntry};

/// Activity LED flash on every key press.
const KEY_FLASH_MS: u32 = 50;

/// Green or red LED after a decision.
const RESULT_LED_MS: u32 = 3000;

/// Validator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Time a rejection stays on the display.
    pub restore_delay: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            restore_delay: Duration::from_millis(DEFAULT_STATUS_RESTORE_DELAY_MS),
        }
    }
}

/// Turns key presses into feedback and actuator commands.
pub struct PinValidator<L> {
    entry: PinEntry,
    credentials: L,
    link: LinkSender,
    actuator: ActuatorHandle,
    door: DoorStatus,
    config: ValidatorConfig,

    /// Pending display restore, at most one.
    restore: Option<JoinHandle<()>>,
}

impl<L: CredentialLookup> PinValidator<L> {
    pub fn new(
        credentials: L,
        link: LinkSender,
        actuator: ActuatorHandle,
        door: DoorStatus,
        config: ValidatorConfig,
    ) -> Self {
        Self {
            entry: PinEntry::new(),
            credentials,
            link,
            actuator,
            door,
            config,
            restore: None,
        }
    }

    /// Process one key. Returns the decision when the key was a terminator.
    pub async fn handle_key(&mut self, key: KeyEvent) -> Option<Decision> {
        self.cancel_restore();

        self.link.led(Led::Activity, KEY_FLASH_MS);
        self.link.beep(BeepKind::Ack);

        match self.entry.press(key) {
            KeyOutcome::Masked { first: true } => {
                self.link.lcd_set(DisplayMessages::PIN_PROMPT);
                None
            }
            KeyOutcome::Masked { first: false } => {
                self.link.lcd_put(MASK_CHAR);
                None
            }
            KeyOutcome::Submitted(submission) => {
                let decision = Decision::resolve(submission, &self.credentials);
                self.apply(&decision).await;
                Some(decision)
            }
        }
    }

    /// Handle keys until the stream ends.
    pub async fn run(mut self, mut keys: KeyEvents) {
        while let Some(key) = keys.next().await {
            self.handle_key(key).await;
        }
        self.cancel_restore();
        debug!("Key event stream ended, validator stopping");
    }

    async fn apply(&mut self, decision: &Decision) {
        match decision {
            Decision::ShortCircuitClose => {
                info!("Emergency close requested from keypad");
                self.link.lcd_set(DisplayMessages::LOCKING);
                self.accept(ActuatorCommand::Close).await;
            }
            Decision::Authorized { handle } => {
                info!("PIN accepted for {}", handle);
                self.link.lcd_set(DisplayMessages::greeting(handle));
                self.accept(ActuatorCommand::Open).await;
            }
            rejected => {
                info!("Rejected: {}", rejected);
                self.link.lcd_set(DisplayMessages::INVALID_PIN);
                self.link.led(Led::Error, RESULT_LED_MS);
                self.schedule_restore();
            }
        }
    }

    async fn accept(&self, command: ActuatorCommand) {
        self.link.led(Led::Success, RESULT_LED_MS);
        self.link.led(Led::Error, 1);

        if let Err(e) = self.actuator.submit(command).await {
            error!("Failed to queue {} command: {}", command, e);
        }
    }

    fn schedule_restore(&mut self) {
        self.cancel_restore();

        let link = self.link.clone();
        let door = self.door.clone();
        let delay = self.config.restore_delay;
        self.restore = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            link.lcd_set(DisplayMessages::door(door.current()));
        }));
    }

    fn cancel_restore(&mut self) {
        if let Some(task) = self.restore.take() {
            task.abort();
        }
    }
}

impl<L> Drop for PinValidator<L> {
    fn drop(&mut self) {
        if let Some(task) = self.restore.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinpad_core::DoorState;
    use pinpad_hardware::ActuatorRequest;
    use pinpad_protocol::Command;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CountingLookup {
        pins: HashMap<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl CredentialLookup for CountingLookup {
        fn lookup(&self, pin: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pins.get(pin).map(|h| h.to_string())
        }
    }

    struct Harness {
        validator: PinValidator<Arc<CountingLookup>>,
        lookups: Arc<CountingLookup>,
        commands: mpsc::UnboundedReceiver<Command>,
        requests: mpsc::Receiver<ActuatorRequest>,
    }

    fn harness() -> Harness {
        let lookups = Arc::new(CountingLookup {
            pins: HashMap::from([("123456", "secure")]),
            ..Default::default()
        });
        let (link, commands) = LinkSender::channel();
        let (actuator, requests) = ActuatorHandle::channel(8);
        let validator = PinValidator::new(
            lookups.clone(),
            link,
            actuator,
            DoorStatus::fixed(DoorState::Closed),
            ValidatorConfig::default(),
        );
        Harness {
            validator,
            lookups,
            commands,
            requests,
        }
    }

    impl Harness {
        async fn type_keys(&mut self, keys: &str) -> Option<Decision> {
            let mut last = None;
            for c in keys.chars() {
                last = self.validator.handle_key(KeyEvent::from_char(c).unwrap()).await;
            }
            last
        }

        fn drain(&mut self) -> Vec<Command> {
            let mut out = Vec::new();
            while let Ok(command) = self.commands.try_recv() {
                out.push(command);
            }
            out
        }

        fn actuator_commands(&mut self) -> Vec<ActuatorCommand> {
            let mut out = Vec::new();
            while let Ok(request) = self.requests.try_recv() {
                out.push(request.command);
            }
            out
        }
    }

    #[tokio::test]
    async fn test_every_key_gets_feedback() {
        let mut h = harness();
        h.type_keys("12").await;

        assert_eq!(
            h.drain(),
            vec![
                Command::led(Led::Activity, 50),
                Command::Beep(BeepKind::Ack),
                Command::LcdSet("PIN: *".into()),
                Command::led(Led::Activity, 50),
                Command::Beep(BeepKind::Ack),
                Command::LcdPut('*'),
            ]
        );
    }

    #[tokio::test]
    async fn test_known_pin_opens_once() {
        let mut h = harness();
        let decision = h.type_keys("123456#").await;

        assert_eq!(decision, Some(Decision::Authorized { handle: "secure".into() }));
        assert_eq!(h.actuator_commands(), vec![ActuatorCommand::Open]);

        let commands = h.drain();
        let greeting = Command::LcdSet("Hi secure!\nUnlocking...".into());
        let at = commands.iter().position(|c| *c == greeting).unwrap();
        assert_eq!(commands[at + 1], Command::led(Led::Success, 3000));
        assert_eq!(commands[at + 2], Command::led(Led::Error, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_pin_sends_no_command() {
        let mut h = harness();
        let decision = h.type_keys("1234#").await;

        assert_eq!(decision, Some(Decision::LengthInvalid { pin: "1234".into() }));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(h.actuator_commands().is_empty());
        assert_eq!(h.lookups.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_escape_closes_without_lookup() {
        let mut h = harness();
        let decision = h.type_keys("666#").await;

        assert_eq!(decision, Some(Decision::ShortCircuitClose));
        assert_eq!(h.actuator_commands(), vec![ActuatorCommand::Close]);
        assert_eq!(h.lookups.calls.load(Ordering::SeqCst), 0);
        assert!(h.drain().contains(&Command::LcdSet("Locking door...".into())));
    }

    #[tokio::test]
    async fn test_non_numeric_pin_rejected() {
        let mut h = harness();
        let decision = h.type_keys("12*456#").await;

        assert!(matches!(decision, Some(Decision::FormatInvalid { .. })));
        assert!(h.actuator_commands().is_empty());
        assert_eq!(h.lookups.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_restores_door_status() {
        let mut h = harness();
        let decision = h.type_keys("999999#").await;
        assert_eq!(decision, Some(Decision::NotFound { pin: "999999".into() }));

        let commands = h.drain();
        let tail = &commands[commands.len() - 2..];
        assert_eq!(tail[0], Command::LcdSet("Invalid PIN!".into()));
        assert_eq!(tail[1], Command::led(Led::Error, 3000));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(h.drain().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(h.drain(), vec![Command::LcdSet(" \nClosed".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystroke_supersedes_restore() {
        let mut h = harness();
        h.type_keys("#").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        h.type_keys("1").await;
        h.drain();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_actuator_is_logged() {
        let mut h = harness();
        drop(h.requests);
        let (_tx, requests) = mpsc::channel(1);
        h.requests = requests;

        // Must not panic or hang
        let decision = h.type_keys("123456#").await;
        assert!(matches!(decision, Some(Decision::Authorized { .. })));
    }
}
