//! # Transition Controller
//!
//! Receives actions from the mounted frame, applies them to the host store and
//! remounts the active room whenever canonical state changes.
//!
//! ```text
//!  Frame ──post──► Outbox ══ unbounded channel ══► inbox ─┐
//!    ▲                                                    │ handle_message
//!    │ mount (new mirror)                                 ▼
//!  FrameHost ◄── compile ◄── HostStateStore ◄── apply_message
//! ```
//!
//! Each mount owns exactly one channel. On remount the old inbox is closed and
//! drained before the old frame is unmounted and the new one is mounted, so a
//! listener never outlives its mount and no message is delivered twice.
//! Messages drained from a closed inbox are kept in a backlog and applied
//! after the new mount, in order; the new frame's mirror does not reflect them
//! until the mount that follows.

use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use tokio::sync::mpsc;

use crate::compiler::{CompiledRoom, RoomCompiler};
use crate::errors::{FrameError, ProtocolError};
use crate::logutil::{escape_log, preview_payload};
use crate::sandbox::{FrameHost, Outbox};
use crate::store::{HostStateStore, Outcome};

/// Surface for blocking, user-visible error alerts.
pub trait AlertSink {
    fn alert(&mut self, message: &str);
}

/// Reports alerts through the `alert` log target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&mut self, message: &str) {
        error!(target: "alert", "{}", escape_log(message));
    }
}

/// Collects alerts in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordedAlerts {
    pub messages: Vec<String>,
}

impl AlertSink for RecordedAlerts {
    fn alert(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// What the controller did with one inbound message.
#[derive(Debug)]
pub enum Dispatch {
    Applied { outcome: Outcome, remounted: bool },
    Ignored(String),
    Rejected(ProtocolError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub received: u64,
    /// Messages that changed canonical state.
    pub applied: u64,
    /// Valid messages that left state as it was.
    pub unchanged: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub mounts: u64,
    /// Messages drained from a torn-down mount into the backlog.
    pub carried_over: u64,
}

struct Mount {
    id: u64,
    room: CompiledRoom,
    inbox: mpsc::UnboundedReceiver<Value>,
}

pub struct TransitionController<H: FrameHost, A: AlertSink = LogAlerts> {
    store: HostStateStore,
    compiler: RoomCompiler,
    host: H,
    alerts: A,
    mount: Option<Mount>,
    backlog: VecDeque<Value>,
    next_mount_id: u64,
    stats: ControllerStats,
}

impl<H: FrameHost, A: AlertSink> TransitionController<H, A> {
    /// Mount the start room and begin accepting actions.
    pub fn start(
        store: HostStateStore,
        compiler: RoomCompiler,
        host: H,
        alerts: A,
    ) -> Result<Self, FrameError> {
        let mut controller = Self {
            store,
            compiler,
            host,
            alerts,
            mount: None,
            backlog: VecDeque::new(),
            next_mount_id: 0,
            stats: ControllerStats::default(),
        };
        controller.remount()?;
        Ok(controller)
    }

    pub fn store(&self) -> &HostStateStore {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Content-side access to the frame host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn alerts(&self) -> &A {
        &self.alerts
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// The document currently mounted.
    pub fn mounted(&self) -> Option<&CompiledRoom> {
        self.mount.as_ref().map(|m| &m.room)
    }

    pub fn mount_id(&self) -> Option<u64> {
        self.mount.as_ref().map(|m| m.id)
    }

    /// Messages carried over from torn-down mounts and not yet applied.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Validate and apply one inbound message, remounting on change.
    ///
    /// Protocol errors are alerted and logged here and never propagate;
    /// the returned error is reserved for failures to remount.
    pub fn handle_message(&mut self, raw: Value) -> Result<Dispatch, FrameError> {
        self.stats.received += 1;
        match self.store.apply_message(&raw) {
            Err(err) => {
                self.stats.rejected += 1;
                warn!("Protocol error: {} payload={}", err, preview_payload(&raw));
                self.alerts.alert(&format!("ERROR: {}", err));
                Ok(Dispatch::Rejected(err))
            }
            Ok(Outcome::Ignored(name)) => {
                self.stats.ignored += 1;
                Ok(Dispatch::Ignored(name))
            }
            Ok(outcome) => {
                let remounted = outcome.is_change();
                if remounted {
                    self.stats.applied += 1;
                    self.remount()?;
                } else {
                    self.stats.unchanged += 1;
                }
                Ok(Dispatch::Applied { outcome, remounted })
            }
        }
    }

    /// Apply every message already queued, returning how many were handled.
    pub fn pump(&mut self) -> Result<usize, FrameError> {
        let mut handled = 0;
        while let Some(raw) = self.next_queued() {
            self.handle_message(raw)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Process messages as they arrive until every sender of the mounted
    /// frame is gone.
    pub async fn run(&mut self) -> Result<(), FrameError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Process messages as they arrive until `shutdown` resolves or the
    /// mounted frame's channel closes.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), FrameError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            if let Some(raw) = self.backlog.pop_front() {
                self.handle_message(raw)?;
                continue;
            }
            let Some(mount) = self.mount.as_mut() else {
                return Ok(());
            };
            let next = tokio::select! {
                _ = &mut shutdown => None,
                msg = mount.inbox.recv() => Some(msg),
            };
            match next {
                None => {
                    info!("Controller shutting down");
                    return Ok(());
                }
                Some(None) => {
                    info!("Frame channel closed; controller stopping");
                    return Ok(());
                }
                Some(Some(raw)) => {
                    self.handle_message(raw)?;
                }
            }
        }
    }

    fn next_queued(&mut self) -> Option<Value> {
        if let Some(raw) = self.backlog.pop_front() {
            return Some(raw);
        }
        self.mount.as_mut().and_then(|m| m.inbox.try_recv().ok())
    }

    /// Tear down the current mount, then compile and mount the active room.
    fn remount(&mut self) -> Result<(), FrameError> {
        if let Some(mut old) = self.mount.take() {
            old.inbox.close();
            while let Ok(raw) = old.inbox.try_recv() {
                self.stats.carried_over += 1;
                self.backlog.push_back(raw);
            }
            self.host.unmount();
            debug!("Unmounted mount {} ('{}')", old.id, old.room.room());
        }

        let room = self.store.current_room().to_string();
        let schema = self
            .store
            .current_schema()
            .ok_or_else(|| FrameError::MissingRoom(room.clone()))?;
        let compiled = self.compiler.compile(
            schema,
            self.store.inventory(),
            &self.store.current_room_state(),
        );

        let (tx, inbox) = mpsc::unbounded_channel();
        self.next_mount_id += 1;
        let id = self.next_mount_id;
        self.host.mount(&compiled, Outbox::new(id, tx))?;
        self.stats.mounts += 1;
        info!(
            "Mounted '{}' (mount {}, revision {}, sha256 {})",
            room,
            id,
            self.store.revision(),
            &compiled.fingerprint()[..12]
        );
        self.mount = Some(Mount {
            id,
            room: compiled,
            inbox,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomSchema;
    use crate::sandbox::NativeFrames;
    use serde_json::json;

    type Controller = TransitionController<NativeFrames, RecordedAlerts>;

    fn controller() -> Controller {
        let store = HostStateStore::initialize(vec![
            RoomSchema::new("A", "<p>a</p>").starting(),
            RoomSchema::new("B", "<p>b</p>"),
        ])
        .unwrap();
        TransitionController::start(
            store,
            RoomCompiler::new("*"),
            NativeFrames::new(),
            RecordedAlerts::default(),
        )
        .unwrap()
    }

    #[test]
    fn start_mounts_the_start_room() {
        let c = controller();
        assert_eq!(c.mounted().map(CompiledRoom::room), Some("A"));
        assert_eq!(c.mount_id(), Some(1));
        assert_eq!(c.stats().mounts, 1);
    }

    #[test]
    fn unchanged_state_does_not_remount() {
        let mut c = controller();
        let dispatch = c
            .handle_message(json!({ "action": "CHANGEROOM", "room": "A" }))
            .unwrap();
        assert!(matches!(dispatch, Dispatch::Applied { remounted: false, .. }));
        assert_eq!(c.mount_id(), Some(1));
        assert_eq!(c.stats().unchanged, 1);
    }

    #[test]
    fn rejected_messages_alert_once() {
        let mut c = controller();
        let dispatch = c.handle_message(json!({})).unwrap();
        assert!(matches!(dispatch, Dispatch::Rejected(ProtocolError::MissingAction)));
        assert_eq!(
            c.alerts().messages,
            vec!["ERROR: got data without any action set".to_string()]
        );
        assert_eq!(c.mount_id(), Some(1));
    }

    #[test]
    fn remount_releases_the_previous_channel() {
        let mut c = controller();
        let frame = c.host_mut().frame_mut().unwrap();
        frame.set_inventory("k", json!(1));
        assert_eq!(c.pump().unwrap(), 1);
        assert_eq!(c.mount_id(), Some(2));
        // exactly one live mount, one delivery per message
        assert_eq!(c.stats().received, 1);
        assert_eq!(c.host().frame().unwrap().mount_id(), 2);
        assert_eq!(c.pump().unwrap(), 0);
    }

    #[test]
    fn queued_messages_survive_the_remount() {
        let mut c = controller();
        let frame = c.host_mut().frame_mut().unwrap();
        frame.increment_inventory("coins");
        frame.increment_inventory("coins");
        assert_eq!(frame.inventory().get("coins"), Some(&json!(2)));

        let first = c.next_queued().unwrap();
        c.handle_message(first).unwrap();
        // the second increment was drained into the backlog; the new mirror
        // only reflects the first
        assert_eq!(c.backlog_len(), 1);
        assert_eq!(
            c.host().frame().unwrap().inventory().get("coins"),
            Some(&json!(1))
        );

        c.pump().unwrap();
        assert_eq!(c.store().inventory().get("coins"), Some(&json!(2)));
        assert_eq!(
            c.host().frame().unwrap().inventory().get("coins"),
            Some(&json!(2))
        );
        assert_eq!(c.stats().carried_over, 1);
    }
}
