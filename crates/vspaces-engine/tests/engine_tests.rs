//! Engine integration tests over the mock window platform.

use std::{sync::Arc, time::Duration};

use mac_winctl::{
    CtlWindow, DisplayInfo, FocusEvent, WindowInfo,
    geom::Rect,
    ops::{MockWinOps, WinOps},
};
use tokio::sync::mpsc;
use vspaces_engine::{Engine, EngineCfg, Error, MAX_SLOTS, SpaceAction};

const PRIMARY_H: f64 = 1000.0;
const FRAME_A: Rect = Rect::new(0.0, 0.0, 400.0, 400.0);
const FRAME_B: Rect = Rect::new(600.0, 100.0, 400.0, 400.0);

fn display(id: u32, frame: Rect, primary: bool) -> DisplayInfo {
    DisplayInfo { id, frame, primary }
}

fn cg(pid: i32, id: u32, app: &str, title: &str, frame: Rect, z: u32) -> WindowInfo {
    WindowInfo {
        app: app.into(),
        title: title.into(),
        pid,
        id,
        layer: 0,
        frame: Some(frame),
        z,
    }
}

fn ctl(pid: i32, idx: usize, id: Option<u32>, title: &str, frame: Rect) -> CtlWindow {
    CtlWindow {
        pid,
        idx,
        id,
        title: title.into(),
        frame,
    }
}

/// Two apps on one display: Alpha in front (z 0), Beta behind (z 1), frames
/// fully non-overlapping.
fn two_window_mock() -> Arc<MockWinOps> {
    let mock = Arc::new(MockWinOps::new());
    mock.set_displays(vec![display(1, Rect::new(0.0, 0.0, 1600.0, PRIMARY_H), true)]);
    mock.set_windows(vec![
        cg(10, 1, "Alpha", "a", FRAME_A, 0),
        cg(11, 2, "Beta", "b", FRAME_B, 1),
    ]);
    mock.set_app_windows(10, vec![ctl(10, 0, Some(1), "a", FRAME_A)]);
    mock.set_app_windows(11, vec![ctl(11, 0, Some(2), "b", FRAME_B)]);
    mock
}

/// Timer settings that keep background checks out of the way.
fn quiet_cfg() -> EngineCfg {
    EngineCfg {
        drift_poll_ms: 3_600_000,
        auto_debounce_ms: 3_600_000,
        auto_min_spacing_ms: 0,
        settle_ms: 1,
        ..EngineCfg::default()
    }
}

fn spawn_engine(mock: &Arc<MockWinOps>, cfg: EngineCfg) -> Engine {
    let ops: Arc<dyn WinOps> = mock.clone();
    Engine::spawn(ops, cfg).expect("spawn engine")
}

#[tokio::test(flavor = "multi_thread")]
async fn save_reports_captured_windows() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    assert_eq!(engine.save(1, None).await.expect("save"), 2);
    let spaces = engine.spaces().await.expect("spaces");
    assert_eq!(spaces.len(), 1);
    assert_eq!(spaces[0].slot, 1);
    assert_eq!(spaces[0].windows.len(), 2);
    assert_eq!(spaces[0].windows[0].app, "Alpha");
    assert_eq!(engine.active_slot(1).await.expect("query"), Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_save_leaves_slot_untouched() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    engine.save(3, None).await.expect("save");

    mock.set_windows(Vec::new());
    assert_eq!(engine.save(3, None).await.expect("empty save"), 0);
    let spaces = engine.spaces().await.expect("spaces");
    assert_eq!(spaces.len(), 1);
    assert_eq!(spaces[0].windows.len(), 2, "prior arrangement must survive");
}

#[tokio::test(flavor = "multi_thread")]
async fn restore_activates_groups_back_to_front_and_focuses_frontmost() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    engine.save(1, None).await.expect("save");
    mock.reset_recording();

    let report = engine.restore(1, None).await.expect("restore");
    assert_eq!(report.matched, 2);
    assert_eq!(report.skipped, 0);

    // Phase 2 activates Beta's group first (largest saved z), Alpha's last;
    // phase 3 re-activates Alpha. Final activation belongs to Alpha.
    let activations = mock.activations();
    assert_eq!(activations.first(), Some(&11));
    assert_eq!(activations.last(), Some(&10));
    assert_eq!(mock.focused(), Some((10, 0)));

    // Phase 1 repositioned both windows, in the platform's top-left space.
    let frames = mock.set_frame_calls();
    assert_eq!(frames.len(), 2);
    let alpha = frames.iter().find(|(pid, _, _)| *pid == 10).expect("alpha");
    assert_eq!(alpha.2, FRAME_A);
}

#[tokio::test(flavor = "multi_thread")]
async fn restore_is_idempotent() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    engine.save(1, None).await.expect("save");

    mock.reset_recording();
    engine.restore(1, None).await.expect("first restore");
    let first = mock.calls();

    mock.reset_recording();
    engine.restore(1, None).await.expect("second restore");
    let second = mock.calls();

    assert_eq!(first, second, "same arrangement, same operations");
}

#[tokio::test(flavor = "multi_thread")]
async fn restore_with_no_matches_completes_without_frame_calls() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    engine.save(3, None).await.expect("save");

    // Both apps conceptually closed.
    mock.set_windows(Vec::new());
    mock.set_app_windows(10, Vec::new());
    mock.set_app_windows(11, Vec::new());
    mock.reset_recording();

    let report = engine.restore(3, None).await.expect("restore");
    assert_eq!(report.matched, 0);
    assert_eq!(report.skipped, 2);
    assert!(mock.set_frame_calls().is_empty());
    assert!(mock.activations().is_empty());
    assert_eq!(mock.focused(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn restore_of_missing_slot_errors() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    assert!(matches!(
        engine.restore(4, None).await,
        Err(Error::NoSuchSlot(4))
    ));
    assert!(matches!(
        engine.save(MAX_SLOTS, None).await,
        Err(Error::SlotOutOfRange(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_mode_saves_and_clears_all_displays_atomically() {
    let mock = Arc::new(MockWinOps::new());
    mock.set_displays(vec![
        display(1, Rect::new(0.0, 0.0, 800.0, PRIMARY_H), true),
        display(2, Rect::new(800.0, 0.0, 800.0, PRIMARY_H), false),
    ]);
    mock.set_windows(vec![
        cg(10, 1, "Alpha", "a", FRAME_A, 0),
        cg(11, 2, "Beta", "b", Rect::new(900.0, 100.0, 400.0, 400.0), 1),
    ]);
    mock.set_app_windows(10, vec![ctl(10, 0, Some(1), "a", FRAME_A)]);
    mock.set_app_windows(
        11,
        vec![ctl(11, 0, Some(2), "b", Rect::new(900.0, 100.0, 400.0, 400.0))],
    );
    let cfg = EngineCfg {
        shared: true,
        ..quiet_cfg()
    };
    let engine = spawn_engine(&mock, cfg);

    assert_eq!(engine.save(2, None).await.expect("save"), 2);
    let spaces = engine.spaces().await.expect("spaces");
    assert_eq!(spaces.len(), 2, "one payload per display");
    assert!(spaces.iter().all(|s| s.slot == 2));

    engine.clear(2, None).await.expect("clear");
    let spaces = engine.spaces().await.expect("spaces");
    assert!(
        spaces.is_empty(),
        "no display may still report slot 2 after a shared clear"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn rename_updates_live_slot_without_deactivating() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    engine.save(1, None).await.expect("save");

    assert!(engine.rename(1, None, Some("work".into())).await.expect("rename"));
    assert_eq!(engine.active_slot(1).await.expect("query"), Some(1));
    let spaces = engine.spaces().await.expect("spaces");
    assert_eq!(spaces[0].name.as_deref(), Some("work"));

    // Renaming an unoccupied slot is a no-op.
    assert!(!engine.rename(5, None, Some("x".into())).await.expect("rename"));
}

#[tokio::test(flavor = "multi_thread")]
async fn focus_outside_tracked_set_deactivates() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    engine.save(1, None).await.expect("save");
    assert_eq!(engine.active_slot(1).await.expect("query"), Some(1));

    let (tx, rx) = mpsc::unbounded_channel();
    engine.attach_focus_events(rx);

    // A tracked app keeps the slot live.
    tx.send(FocusEvent {
        app: "Alpha".into(),
        pid: 10,
    })
    .expect("send");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.active_slot(1).await.expect("query"), Some(1));

    // Focus moving to an untracked app drops it.
    tx.send(FocusEvent {
        app: "Finder".into(),
        pid: 99,
    })
    .expect("send");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.active_slot(1).await.expect("query"), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn matching_layout_auto_activates_on_focus_change() {
    let mock = two_window_mock();
    let cfg = EngineCfg {
        auto_debounce_ms: 10,
        ..quiet_cfg()
    };
    let engine = spawn_engine(&mock, cfg);
    engine.save(1, None).await.expect("save");
    engine.deactivate(1).await.expect("deactivate");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(engine.active_slot(1).await.expect("query"), None);

    let mut events = engine.subscribe();
    let (tx, rx) = mpsc::unbounded_channel();
    engine.attach_focus_events(rx);
    tx.send(FocusEvent {
        app: "Alpha".into(),
        pid: 10,
    })
    .expect("send");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.active_slot(1).await.expect("query"), Some(1));
    // Passive recognition: nothing was repositioned.
    assert!(mock.set_frame_calls().is_empty());
    let mut saw_activation = false;
    while let Ok(ev) = events.try_recv() {
        if ev.action == SpaceAction::Activated && ev.slot == 1 {
            saw_activation = true;
        }
    }
    assert!(saw_activation, "activation event expected");
}

#[tokio::test(flavor = "multi_thread")]
async fn drifted_window_deactivates_slot() {
    let mock = two_window_mock();
    let cfg = EngineCfg {
        drift_poll_ms: 25,
        drift_eps: 10.0,
        ..quiet_cfg()
    };
    let engine = spawn_engine(&mock, cfg);
    engine.save(1, None).await.expect("save");
    assert_eq!(engine.active_slot(1).await.expect("query"), Some(1));

    // Alpha's window moves well beyond tolerance.
    mock.set_windows(vec![
        cg(10, 1, "Alpha", "a", Rect::new(80.0, 0.0, 400.0, 400.0), 0),
        cg(11, 2, "Beta", "b", FRAME_B, 1),
    ]);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.active_slot(1).await.expect("query"), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn save_emits_notification_events() {
    let mock = two_window_mock();
    let engine = spawn_engine(&mock, quiet_cfg());
    let mut events = engine.subscribe();

    engine.save(1, None).await.expect("save");
    let ev = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("timely")
        .expect("event");
    assert_eq!(ev.action, SpaceAction::Saved);
    assert_eq!(ev.slot, 1);
    assert_eq!(ev.display, 1);
    assert_eq!(ev.apps, vec!["Alpha".to_string(), "Beta".to_string()]);
}
