//! vspaces-engine: window-arrangement snapshot engine.
//!
//! Captures the set of visible application windows on a display, stores the
//! arrangement under a numbered slot, and restores it later by re-matching
//! the saved records against the live window views. The matcher degrades
//! gracefully and refuses to guess: a window that cannot be located safely is
//! skipped, never tiled or focused wrongly.
//!
//! One actor task owns the store and all per-display live-slot state; the
//! cheap, clonable [`Engine`] handle sends commands over an mpsc channel and
//! exposes a fire-and-forget [`SpaceEvent`] broadcast. Focus notifications,
//! the periodic drift check, and the debounced auto-activation check all feed
//! the same queue, so every mutation of a display's state is serialized.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use mac_winctl::{
    DisplayId, DisplayInfo, FocusEvent, geom::point_in_rect, ops::WinOps, primary_height,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

mod capture;
mod error;
mod events;
mod matcher;
mod model;
mod monitor;
mod restore;
mod store;
mod visibility;

pub use error::{Error, Result};
pub use events::{SpaceAction, SpaceEvent};
pub use model::{MAX_SLOTS, SlotId, Space, WindowRecord};
pub use restore::RestoreReport;

use monitor::ActiveSlot;
use store::SpaceStore;

/// Configuration for the engine actor.
#[derive(Clone, Debug)]
pub struct EngineCfg {
    /// Store file location; `None` keeps arrangements memory-only.
    pub store_path: Option<PathBuf>,
    /// Whether a slot spans all displays (shared mode) or is per-display.
    pub shared: bool,
    /// Interval of the drift check over active slots.
    pub drift_poll_ms: u64,
    /// Pixel tolerance before tracked-window movement deactivates a slot.
    pub drift_eps: f64,
    /// Debounce for auto-activation checks after a focus change.
    pub auto_debounce_ms: u64,
    /// Minimum spacing between two auto-activation checks per display.
    pub auto_min_spacing_ms: u64,
    /// Settle delay after each application activation during restore.
    pub settle_ms: u64,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            store_path: None,
            shared: false,
            drift_poll_ms: 1000,
            drift_eps: monitor::DRIFT_EPS,
            auto_debounce_ms: 150,
            auto_min_spacing_ms: 500,
            settle_ms: 25,
        }
    }
}

/// Cheap, clonable handle to the engine actor.
#[derive(Clone)]
pub struct Engine {
    tx: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SpaceEvent>,
}

impl Engine {
    /// Spawn the engine with its dependencies injected.
    ///
    /// Fails only when an existing store file cannot be read or decoded.
    pub fn spawn(ops: Arc<dyn WinOps>, cfg: EngineCfg) -> Result<Self> {
        let store = SpaceStore::open(cfg.store_path.clone(), cfg.shared)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (evt_tx, _evt_rx) = broadcast::channel(64);
        let state = EngineState {
            ops,
            store,
            cfg: cfg.clone(),
            active: HashMap::new(),
            pending_auto: HashMap::new(),
            last_auto: HashMap::new(),
            self_tx: tx.clone(),
            events: evt_tx.clone(),
        };
        tokio::spawn(run_actor(rx, state));

        // The drift check is an independent timer that posts into the same
        // queue as every other recheck trigger.
        let tick_tx = tx.clone();
        let period = Duration::from_millis(cfg.drift_poll_ms.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick_tx.send(Command::DriftTick).is_err() {
                    break;
                }
            }
        });
        Ok(Self { tx, events: evt_tx })
    }

    /// Forward platform focus notifications into the engine queue.
    ///
    /// The forwarding task never blocks the delivery channel; matching and
    /// restore work happens on the actor.
    pub fn attach_focus_events(&self, mut rx: mpsc::UnboundedReceiver<FocusEvent>) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if tx
                    .send(Command::FocusChanged {
                        app: ev.app,
                        pid: ev.pid,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    /// Subscribe to the fire-and-forget event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SpaceEvent> {
        self.events.subscribe()
    }

    /// Capture and store the arrangement under `slot`.
    ///
    /// `display = None` targets the primary display (the trigger display in
    /// shared mode). Returns the number of windows captured; zero means
    /// nothing was visible and no slot entry was created or overwritten.
    pub async fn save(&self, slot: SlotId, display: Option<DisplayId>) -> Result<usize> {
        self.request(|respond| Command::Save {
            slot,
            display,
            respond,
        })
        .await?
    }

    /// Restore the arrangement stored under `slot`.
    pub async fn restore(&self, slot: SlotId, display: Option<DisplayId>) -> Result<RestoreReport> {
        self.request(|respond| Command::Restore {
            slot,
            display,
            respond,
        })
        .await?
    }

    /// Remove the arrangement stored under `slot`.
    pub async fn clear(&self, slot: SlotId, display: Option<DisplayId>) -> Result<()> {
        self.request(|respond| Command::Clear {
            slot,
            display,
            respond,
        })
        .await?
    }

    /// Rename the arrangement stored under `slot`; returns whether any
    /// payload was renamed. Renaming the live slot updates its label without
    /// deactivating it.
    pub async fn rename(
        &self,
        slot: SlotId,
        display: Option<DisplayId>,
        name: Option<String>,
    ) -> Result<bool> {
        self.request(|respond| Command::Rename {
            slot,
            display,
            name,
            respond,
        })
        .await?
    }

    /// All stored arrangements, ascending (display, slot).
    pub async fn spaces(&self) -> Result<Vec<Space>> {
        self.request(|respond| Command::Spaces { respond }).await
    }

    /// The live slot on `display`, if any.
    pub async fn active_slot(&self, display: DisplayId) -> Result<Option<SlotId>> {
        self.request(|respond| Command::ActiveSlot { display, respond })
            .await
    }

    /// Explicitly drop the live slot on `display`.
    pub async fn deactivate(&self, display: DisplayId) -> Result<()> {
        self.tx
            .send(Command::Deactivate { display })
            .map_err(|_| Error::ChannelClosed)
    }

    /// Switch between shared and per-display slot addressing.
    pub async fn set_shared(&self, on: bool) -> Result<()> {
        self.request(|respond| Command::SetShared { on, respond })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(build(tx)).map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }
}

enum Command {
    Save {
        slot: SlotId,
        display: Option<DisplayId>,
        respond: oneshot::Sender<Result<usize>>,
    },
    Restore {
        slot: SlotId,
        display: Option<DisplayId>,
        respond: oneshot::Sender<Result<RestoreReport>>,
    },
    Clear {
        slot: SlotId,
        display: Option<DisplayId>,
        respond: oneshot::Sender<Result<()>>,
    },
    Rename {
        slot: SlotId,
        display: Option<DisplayId>,
        name: Option<String>,
        respond: oneshot::Sender<Result<bool>>,
    },
    Spaces {
        respond: oneshot::Sender<Vec<Space>>,
    },
    ActiveSlot {
        display: DisplayId,
        respond: oneshot::Sender<Option<SlotId>>,
    },
    SetShared {
        on: bool,
        respond: oneshot::Sender<()>,
    },
    Deactivate {
        display: DisplayId,
    },
    FocusChanged {
        app: String,
        pid: i32,
    },
    DriftTick,
    AutoCheck {
        display: DisplayId,
    },
}

struct EngineState {
    ops: Arc<dyn WinOps>,
    store: SpaceStore,
    cfg: EngineCfg,
    active: HashMap<DisplayId, ActiveSlot>,
    pending_auto: HashMap<DisplayId, JoinHandle<()>>,
    last_auto: HashMap<DisplayId, Instant>,
    self_tx: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SpaceEvent>,
}

async fn run_actor(mut rx: mpsc::UnboundedReceiver<Command>, mut state: EngineState) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Save {
                slot,
                display,
                respond,
            } => {
                let _ = respond.send(state.handle_save(slot, display));
            }
            Command::Restore {
                slot,
                display,
                respond,
            } => {
                let _ = respond.send(state.handle_restore(slot, display).await);
            }
            Command::Clear {
                slot,
                display,
                respond,
            } => {
                let _ = respond.send(state.handle_clear(slot, display));
            }
            Command::Rename {
                slot,
                display,
                name,
                respond,
            } => {
                let _ = respond.send(state.handle_rename(slot, display, name));
            }
            Command::Spaces { respond } => {
                let _ = respond.send(state.store.spaces().cloned().collect());
            }
            Command::ActiveSlot { display, respond } => {
                let _ = respond.send(state.active.get(&display).map(|a| a.slot));
            }
            Command::SetShared { on, respond } => {
                state.store.set_shared(on);
                let _ = respond.send(());
            }
            Command::Deactivate { display } => state.deactivate_display(display),
            Command::FocusChanged { app, pid } => state.handle_focus_changed(&app, pid),
            Command::DriftTick => state.handle_drift_tick(),
            Command::AutoCheck { display } => state.handle_auto_check(display),
        }
    }
}

fn resolve_display(displays: &[DisplayInfo], requested: Option<DisplayId>) -> Option<DisplayInfo> {
    match requested {
        Some(id) => displays.iter().copied().find(|d| d.id == id),
        None => displays
            .iter()
            .copied()
            .find(|d| d.primary)
            .or_else(|| displays.first().copied()),
    }
}

impl EngineState {
    /// Activate `space`'s slot on its display, dropping any other live slot
    /// there first.
    fn set_active(&mut self, space: &Space) {
        if let Some(prev) = self.active.get(&space.display)
            && prev.slot != space.slot
        {
            self.deactivate_display(space.display);
        }
        self.active
            .insert(space.display, ActiveSlot::from_space(space));
    }

    fn deactivate_display(&mut self, display: DisplayId) {
        if let Some(prev) = self.active.remove(&display) {
            let disp = display;
            info!(slot = prev.slot, display = disp, "slot deactivated");
            events::emit(
                &self.events,
                prev.slot,
                display,
                prev.name.clone(),
                prev.apps(),
                SpaceAction::Deactivated,
            );
        }
    }

    fn handle_save(&mut self, slot: SlotId, display: Option<DisplayId>) -> Result<usize> {
        if slot >= MAX_SLOTS {
            return Err(Error::SlotOutOfRange(slot));
        }
        let displays = self.ops.displays();
        let Some(trigger) = resolve_display(&displays, display) else {
            debug!("save: no displays reported, nothing captured");
            return Ok(0);
        };
        let ph = primary_height(&displays);
        let prev_name = if self.store.shared() {
            self.store
                .payloads_for_slot(slot)
                .first()
                .and_then(|s| s.name.clone())
        } else {
            self.store
                .get(trigger.id, slot)
                .and_then(|s| s.name.clone())
        };

        let targets: Vec<DisplayInfo> = if self.store.shared() {
            // Ascending display order, trigger display last.
            let mut ordered: Vec<DisplayInfo> = displays
                .iter()
                .copied()
                .filter(|d| d.id != trigger.id)
                .collect();
            ordered.sort_by_key(|d| d.id);
            ordered.push(trigger);
            ordered
        } else {
            vec![trigger]
        };

        let mut payloads = Vec::new();
        for d in &targets {
            let windows = capture::capture_display(self.ops.as_ref(), d, ph);
            if windows.is_empty() {
                continue;
            }
            payloads.push(Space {
                slot,
                name: prev_name.clone(),
                display: d.id,
                windows,
            });
        }
        if payloads.is_empty() {
            // An empty capture must not create or overwrite a slot entry.
            info!(slot, "save: nothing visible, slot left untouched");
            return Ok(0);
        }
        let total: usize = payloads.iter().map(|s| s.windows.len()).sum();
        self.store.put(slot, payloads.clone())?;
        for space in &payloads {
            self.set_active(space);
            events::emit_for_space(&self.events, space, SpaceAction::Saved);
        }
        info!(slot, windows = total, "save: arrangement stored");
        Ok(total)
    }

    async fn handle_restore(
        &mut self,
        slot: SlotId,
        display: Option<DisplayId>,
    ) -> Result<RestoreReport> {
        if slot >= MAX_SLOTS {
            return Err(Error::SlotOutOfRange(slot));
        }
        let displays = self.ops.displays();
        let ph = primary_height(&displays);
        let settle = Duration::from_millis(self.cfg.settle_ms);

        let payloads: Vec<Space> = if self.store.shared() {
            // Ascending display order with the trigger display last, so the
            // final focus lands where the user acted.
            let trigger_id = resolve_display(&displays, display).map(|d| d.id);
            let mut all = self.store.payloads_for_slot(slot);
            if let Some(tid) = trigger_id
                && let Some(pos) = all.iter().position(|s| s.display == tid)
            {
                let trigger_payload = all.remove(pos);
                all.push(trigger_payload);
            }
            all
        } else {
            let trigger = resolve_display(&displays, display).ok_or(Error::NoSuchSlot(slot))?;
            self.store
                .get(trigger.id, slot)
                .cloned()
                .into_iter()
                .collect()
        };
        if payloads.is_empty() {
            return Err(Error::NoSuchSlot(slot));
        }

        let mut report = RestoreReport::default();
        for space in &payloads {
            if !displays.iter().any(|d| d.id == space.display) {
                warn!(
                    slot,
                    display = space.display,
                    "restore: display not connected, payload skipped"
                );
                continue;
            }
            let r = restore::restore_space(self.ops.as_ref(), space, ph, settle).await;
            report.absorb(r);
            self.set_active(space);
            events::emit_for_space(&self.events, space, SpaceAction::Restored);
        }
        info!(
            slot,
            matched = report.matched,
            skipped = report.skipped,
            "restore complete"
        );
        Ok(report)
    }

    fn handle_clear(&mut self, slot: SlotId, display: Option<DisplayId>) -> Result<()> {
        let displays = self.ops.displays();
        let display_id = display
            .or_else(|| resolve_display(&displays, None).map(|d| d.id))
            .unwrap_or_default();
        let removed = self.store.clear(display_id, slot)?;
        for space in &removed {
            if self.active.get(&space.display).is_some_and(|a| a.slot == slot) {
                self.deactivate_display(space.display);
            }
            events::emit_for_space(&self.events, space, SpaceAction::Cleared);
        }
        Ok(())
    }

    fn handle_rename(
        &mut self,
        slot: SlotId,
        display: Option<DisplayId>,
        name: Option<String>,
    ) -> Result<bool> {
        let displays = self.ops.displays();
        let display_id = display
            .or_else(|| resolve_display(&displays, None).map(|d| d.id))
            .unwrap_or_default();
        let renamed = self.store.rename(display_id, slot, name.clone())?;
        if renamed {
            let shared = self.store.shared();
            // Active → Active: a rename of the live slot only relabels it.
            for (d, active) in self.active.iter_mut() {
                if active.slot == slot && (shared || *d == display_id) {
                    active.name = name.clone();
                }
            }
        }
        Ok(renamed)
    }

    fn handle_focus_changed(&mut self, app: &str, pid: i32) {
        if pid == self.ops.host_pid() {
            return;
        }
        if app.is_empty() {
            debug!("focus event without app identity, ignoring");
            return;
        }
        // Focus moving outside a display's tracked set drops that slot.
        let left: Vec<DisplayId> = self
            .active
            .iter()
            .filter(|(_, a)| !a.tracks_app(app))
            .map(|(d, _)| *d)
            .collect();
        for d in left {
            debug!(display = d, app, "focus left tracked set");
            self.deactivate_display(d);
        }
        // Recognition runs debounced on the display the app surfaced on.
        if let Some(display) = self.display_of_pid(pid) {
            self.schedule_auto_check(display);
        }
    }

    fn display_of_pid(&self, pid: i32) -> Option<DisplayId> {
        let displays = self.ops.displays();
        let front = self
            .ops
            .list_windows()
            .into_iter()
            .find(|w| w.pid == pid && w.frame.is_some());
        front
            .and_then(|w| {
                let f = w.frame.unwrap_or_default();
                displays
                    .iter()
                    .find(|d| point_in_rect(f.cx(), f.cy(), &d.frame))
                    .map(|d| d.id)
            })
            .or_else(|| resolve_display(&displays, None).map(|d| d.id))
    }

    fn schedule_auto_check(&mut self, display: DisplayId) {
        // Last-write-wins coalescing: a fresh request cancels the pending one.
        if let Some(pending) = self.pending_auto.remove(&display) {
            pending.abort();
        }
        let debounce = Duration::from_millis(self.cfg.auto_debounce_ms);
        let spacing = Duration::from_millis(self.cfg.auto_min_spacing_ms);
        let mut delay = debounce;
        if let Some(last) = self.last_auto.get(&display) {
            let since = last.elapsed();
            if since < spacing {
                delay = delay.max(spacing - since);
            }
        }
        let tx = self.self_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::AutoCheck { display });
        });
        self.pending_auto.insert(display, handle);
    }

    fn handle_auto_check(&mut self, display: DisplayId) {
        self.pending_auto.remove(&display);
        self.last_auto.insert(display, Instant::now());
        if self.active.contains_key(&display) {
            return;
        }
        let displays = self.ops.displays();
        let Some(dinfo) = displays.iter().find(|d| d.id == display).copied() else {
            return;
        };
        let ph = primary_height(&displays);
        let live = capture::capture_display(self.ops.as_ref(), &dinfo, ph);
        if live.is_empty() {
            return;
        }
        let candidates: Vec<Space> = self
            .store
            .slots_for_display(display)
            .into_iter()
            .cloned()
            .collect();
        for space in &candidates {
            if monitor::layout_matches(space, &live) {
                let disp = display;
                info!(slot = space.slot, display = disp, "layout recognized, auto-activating");
                self.set_active(space);
                events::emit_for_space(&self.events, space, SpaceAction::Activated);
                break;
            }
        }
    }

    fn handle_drift_tick(&mut self) {
        if self.active.is_empty() {
            return;
        }
        let displays = self.ops.displays();
        let ph = primary_height(&displays);
        let mut drifted: Vec<DisplayId> = Vec::new();
        for (d, active) in &self.active {
            let Some(dinfo) = displays.iter().find(|x| x.id == *d).copied() else {
                continue;
            };
            let live = capture::capture_display(self.ops.as_ref(), &dinfo, ph);
            if live.is_empty() {
                // Enumeration failure reads as "nothing observed".
                continue;
            }
            if active.drifted(&live, self.cfg.drift_eps) {
                drifted.push(*d);
            }
        }
        for d in drifted {
            self.deactivate_display(d);
        }
    }
}
