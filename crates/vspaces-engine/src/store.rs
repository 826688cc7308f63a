//! Keyed persistence for saved spaces.
//!
//! The store is the single source of truth for arrangements. Mutations build
//! a successor map, persist it, and only then commit it, so a failed write
//! surfaces to the caller with the in-memory state unchanged. In shared mode
//! slot operations span every display's payload atomically.

use std::{collections::BTreeMap, fs, path::PathBuf};

use mac_winctl::DisplayId;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    model::{MAX_SLOTS, SlotId, Space},
};

/// Arrangement store keyed by (display, slot).
pub(crate) struct SpaceStore {
    path: Option<PathBuf>,
    entries: BTreeMap<(DisplayId, SlotId), Space>,
    shared: bool,
}

impl SpaceStore {
    /// Open a store, loading `path` when it exists. `path = None` keeps the
    /// store memory-only (tests, dry runs).
    pub(crate) fn open(path: Option<PathBuf>, shared: bool) -> Result<Self> {
        let entries = match &path {
            Some(p) if p.exists() => Self::load_entries(p)?,
            _ => BTreeMap::new(),
        };
        Ok(Self {
            path,
            entries,
            shared,
        })
    }

    fn load_entries(path: &PathBuf) -> Result<BTreeMap<(DisplayId, SlotId), Space>> {
        let text = fs::read_to_string(path)?;
        let spaces: Vec<Space> = ron::from_str(&text)?;
        let mut entries = BTreeMap::new();
        for space in spaces {
            if space.slot >= MAX_SLOTS {
                warn!(slot = space.slot, "store: skipping out-of-range slot");
                continue;
            }
            if space.is_empty() {
                warn!(slot = space.slot, "store: skipping empty arrangement");
                continue;
            }
            entries.insert((space.display, space.slot), space);
        }
        Ok(entries)
    }

    fn persist(&self, entries: &BTreeMap<(DisplayId, SlotId), Space>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let list: Vec<&Space> = entries.values().collect();
        let text = ron::ser::to_string_pretty(&list, ron::ser::PrettyConfig::default())?;
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        // Write-then-rename keeps a torn write from clobbering the store.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        debug!(entries = entries.len(), "store: persisted");
        Ok(())
    }

    /// Apply `mutate` to a copy of the entries, persist, then commit.
    fn commit(
        &mut self,
        mutate: impl FnOnce(&mut BTreeMap<(DisplayId, SlotId), Space>),
    ) -> Result<()> {
        let mut next = self.entries.clone();
        mutate(&mut next);
        self.persist(&next)?;
        self.entries = next;
        Ok(())
    }

    /// Whether slots span all displays.
    pub(crate) fn shared(&self) -> bool {
        self.shared
    }

    /// Switch sharing mode (affects subsequent operations only).
    pub(crate) fn set_shared(&mut self, on: bool) {
        self.shared = on;
    }

    /// Look up one payload.
    pub(crate) fn get(&self, display: DisplayId, slot: SlotId) -> Option<&Space> {
        self.entries.get(&(display, slot))
    }

    /// All payloads, ascending (display, slot).
    pub(crate) fn spaces(&self) -> impl Iterator<Item = &Space> {
        self.entries.values()
    }

    /// Non-empty payloads for one display, ascending slot order.
    pub(crate) fn slots_for_display(&self, display: DisplayId) -> Vec<&Space> {
        self.entries
            .iter()
            .filter(|((d, _), _)| *d == display)
            .map(|(_, s)| s)
            .collect()
    }

    /// Payloads stored under `slot` on any display, ascending display order.
    pub(crate) fn payloads_for_slot(&self, slot: SlotId) -> Vec<Space> {
        self.entries
            .iter()
            .filter(|((_, s), _)| *s == slot)
            .map(|(_, space)| space.clone())
            .collect()
    }

    /// Store the given non-empty payloads under their slot, replacing that
    /// slot's previous payloads wholesale (all displays in shared mode, just
    /// the payloads' own displays otherwise). One persisted write; all-or-
    /// nothing.
    pub(crate) fn put(&mut self, slot: SlotId, spaces: Vec<Space>) -> Result<()> {
        if slot >= MAX_SLOTS {
            return Err(Error::SlotOutOfRange(slot));
        }
        debug_assert!(spaces.iter().all(|s| s.slot == slot && !s.is_empty()));
        let shared = self.shared;
        self.commit(move |entries| {
            if shared {
                entries.retain(|(_, s), _| *s != slot);
            }
            for space in spaces {
                entries.insert((space.display, space.slot), space);
            }
        })
    }

    /// Remove payloads for `slot`: every display's in shared mode, only
    /// `display`'s otherwise. Returns the removed payloads.
    pub(crate) fn clear(&mut self, display: DisplayId, slot: SlotId) -> Result<Vec<Space>> {
        if slot >= MAX_SLOTS {
            return Err(Error::SlotOutOfRange(slot));
        }
        let shared = self.shared;
        let mut removed = Vec::new();
        for (key, space) in &self.entries {
            if key.1 == slot && (shared || key.0 == display) {
                removed.push(space.clone());
            }
        }
        if removed.is_empty() {
            return Ok(removed);
        }
        self.commit(|entries| {
            entries.retain(|(d, s), _| *s != slot || (!shared && *d != display));
        })?;
        Ok(removed)
    }

    /// Rename `slot` (every display's payload in shared mode). Returns true
    /// when at least one payload was renamed.
    pub(crate) fn rename(
        &mut self,
        display: DisplayId,
        slot: SlotId,
        name: Option<String>,
    ) -> Result<bool> {
        if slot >= MAX_SLOTS {
            return Err(Error::SlotOutOfRange(slot));
        }
        let shared = self.shared;
        let hit = self
            .entries
            .keys()
            .any(|(d, s)| *s == slot && (shared || *d == display));
        if !hit {
            return Ok(false);
        }
        self.commit(move |entries| {
            for ((d, s), space) in entries.iter_mut() {
                if *s == slot && (shared || *d == display) {
                    space.name = name.clone();
                }
            }
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use mac_winctl::geom::Rect;

    use super::*;
    use crate::model::WindowRecord;

    fn space(slot: SlotId, display: DisplayId) -> Space {
        Space {
            slot,
            name: None,
            display,
            windows: vec![WindowRecord {
                app: "Safari".into(),
                title: "t".into(),
                id: Some(1),
                frame: Rect::new(0.0, 0.0, 100.0, 100.0),
                z: 0,
            }],
        }
    }

    fn temp_store_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vspaces-store-{}-{}.ron", tag, std::process::id()))
    }

    #[test]
    fn put_get_roundtrip_in_memory() {
        let mut store = SpaceStore::open(None, false).expect("open");
        store.put(3, vec![space(3, 1)]).expect("put");
        assert!(store.get(1, 3).is_some());
        assert!(store.get(2, 3).is_none());
    }

    #[test]
    fn slot_bound_is_enforced() {
        let mut store = SpaceStore::open(None, false).expect("open");
        assert!(matches!(
            store.put(MAX_SLOTS, vec![space(MAX_SLOTS, 1)]),
            Err(Error::SlotOutOfRange(_))
        ));
    }

    #[test]
    fn shared_clear_removes_every_display_at_once() {
        let mut store = SpaceStore::open(None, true).expect("open");
        store.put(2, vec![space(2, 1), space(2, 2)]).expect("put");
        let removed = store.clear(1, 2).expect("clear");
        assert_eq!(removed.len(), 2);
        assert!(store.get(1, 2).is_none());
        assert!(store.get(2, 2).is_none());
    }

    #[test]
    fn per_display_clear_leaves_other_displays() {
        let mut store = SpaceStore::open(None, false).expect("open");
        store.put(2, vec![space(2, 1)]).expect("put");
        store.put(2, vec![space(2, 2)]).expect("put");
        store.clear(1, 2).expect("clear");
        assert!(store.get(1, 2).is_none());
        assert!(store.get(2, 2).is_some());
    }

    #[test]
    fn shared_rename_applies_to_every_payload() {
        let mut store = SpaceStore::open(None, true).expect("open");
        store.put(4, vec![space(4, 1), space(4, 2)]).expect("put");
        assert!(store.rename(1, 4, Some("work".into())).expect("rename"));
        assert_eq!(store.get(1, 4).unwrap().name.as_deref(), Some("work"));
        assert_eq!(store.get(2, 4).unwrap().name.as_deref(), Some("work"));
    }

    #[test]
    fn rename_of_missing_slot_reports_false() {
        let mut store = SpaceStore::open(None, false).expect("open");
        assert!(!store.rename(1, 5, Some("x".into())).expect("rename"));
    }

    #[test]
    fn persists_and_reloads() {
        let path = temp_store_path("reload");
        let _ = fs::remove_file(&path);
        {
            let mut store = SpaceStore::open(Some(path.clone()), false).expect("open");
            store.put(1, vec![space(1, 7)]).expect("put");
        }
        let store = SpaceStore::open(Some(path.clone()), false).expect("reopen");
        assert!(store.get(7, 1).is_some());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        // A store path whose parent is an existing *file* cannot be created.
        let blocker = temp_store_path("blocker");
        fs::write(&blocker, "x").expect("blocker file");
        let path = blocker.join("store.ron");
        let mut store = SpaceStore::open(Some(path), false).expect("open");
        assert!(store.put(1, vec![space(1, 1)]).is_err());
        assert!(store.get(1, 1).is_none());
        let _ = fs::remove_file(&blocker);
    }

    #[test]
    fn load_skips_empty_and_out_of_range_entries() {
        let path = temp_store_path("skip");
        let text = r#"[
            (slot: 1, display: 1, windows: [(
                app: "Safari", title: "t", id: Some(1),
                frame: (x: 0.0, y: 0.0, w: 10.0, h: 10.0), z: 0,
            )]),
            (slot: 1, display: 2, windows: []),
            (slot: 200, display: 1, windows: [(
                app: "Mail", title: "m", id: Some(2),
                frame: (x: 0.0, y: 0.0, w: 10.0, h: 10.0), z: 0,
            )]),
        ]"#;
        fs::write(&path, text).expect("seed file");
        let store = SpaceStore::open(Some(path.clone()), false).expect("open");
        assert_eq!(store.spaces().count(), 1);
        assert!(store.get(1, 1).is_some());
        let _ = fs::remove_file(&path);
    }
}
