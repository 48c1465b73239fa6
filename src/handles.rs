//! The handle cache: a fixed table mapping 16-bit identifiers to host
//! pathnames.
//!
//! Clients refer to files and directories by 16-bit handles obtained from
//! OPEN/CREATE and FINDFIRST replies. Each slot owns the absolute host
//! pathname it was interned for, a last-use timestamp, and optionally the
//! directory listing snapshot that FINDFIRST/FINDNEXT walk.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fs::FileProps;

/// Reserved identifier meaning "no handle"; never a valid slot.
pub const HANDLE_NONE: u16 = 0xFFFF;

/// Slots older than this are reclaimed while scanning.
const MAX_IDLE: Duration = Duration::from_secs(3600);

#[derive(Clone)]
struct Slot {
    /// Absolute host pathname, or `None` when the slot is free.
    name: Option<PathBuf>,
    last_used: SystemTime,
    /// Directory listing snapshot generated by a FindFirst, if any.
    listing: Option<Vec<FileProps>>,
}

impl Slot {
    const EMPTY: Slot = Slot {
        name: None,
        last_used: UNIX_EPOCH,
        listing: None,
    };

    fn clear(&mut self) {
        *self = Slot::EMPTY;
    }
}

pub struct HandleCache {
    slots: Box<[Slot]>,
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleCache {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::EMPTY; usize::from(HANDLE_NONE) + 1].into_boxed_slice(),
        }
    }

    /// Returns the identifier for `path`, registering it if necessary.
    ///
    /// The whole table is scanned: a slot holding `path` refreshes its
    /// timestamp and wins; any slot idle longer than an hour is reclaimed in
    /// passing. Without a match the first free slot is taken, or the least
    /// recently used one when the table is full (its listing is dropped).
    pub fn intern(&mut self, path: &Path, now: SystemTime) -> u16 {
        let mut first_free = None;
        let mut oldest = 0usize;
        for i in 0..usize::from(HANDLE_NONE) {
            if self.slots[i].name.as_deref() == Some(path) {
                self.slots[i].last_used = now;
                return i as u16;
            }
            let idle = now
                .duration_since(self.slots[i].last_used)
                .unwrap_or(Duration::ZERO);
            if self.slots[i].name.is_some() && idle > MAX_IDLE {
                self.slots[i].clear();
            }
            if first_free.is_none() && self.slots[i].name.is_none() {
                first_free = Some(i);
            } else if self.slots[i].last_used < self.slots[oldest].last_used {
                oldest = i;
            }
        }
        let index = first_free.unwrap_or(oldest);
        let slot = &mut self.slots[index];
        slot.name = Some(path.to_path_buf());
        slot.last_used = now;
        slot.listing = None;
        index as u16
    }

    /// The pathname a handle stands for, if the handle is live.
    pub fn name_of(&self, id: u16) -> Option<&Path> {
        self.slots.get(usize::from(id))?.name.as_deref()
    }

    /// Borrows a live slot's pathname together with its listing cache.
    pub fn entry(&mut self, id: u16) -> Option<(&Path, &mut Option<Vec<FileProps>>)> {
        let slot = self.slots.get_mut(usize::from(id))?;
        Some((slot.name.as_deref()?, &mut slot.listing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dos::{Attributes, Fcb};

    fn props(name: &str) -> FileProps {
        FileProps {
            attr: Attributes::ARCHIVE,
            size: 0,
            time: 0,
            fcb: Fcb::from_name(name.as_bytes()),
        }
    }

    #[test]
    fn intern_is_idempotent() {
        let mut cache = HandleCache::new();
        let now = SystemTime::now();
        let a = cache.intern(Path::new("/srv/a"), now);
        let b = cache.intern(Path::new("/srv/b"), now);
        assert_ne!(a, b);
        assert_eq!(cache.intern(Path::new("/srv/a"), now), a);
        assert_eq!(cache.name_of(a), Some(Path::new("/srv/a")));
        assert_eq!(cache.name_of(HANDLE_NONE), None);
    }

    #[test]
    fn idle_slots_are_reclaimed_during_scans() {
        let mut cache = HandleCache::new();
        let t0 = SystemTime::now();
        let a = cache.intern(Path::new("/srv/a"), t0);
        // Two hours later the old slot is freed mid-scan and reused.
        let later = t0 + Duration::from_secs(7200);
        let b = cache.intern(Path::new("/srv/b"), later);
        assert_eq!(a, b);
        assert_eq!(cache.name_of(b), Some(Path::new("/srv/b")));
    }

    #[test]
    fn refreshing_keeps_a_slot_alive() {
        let mut cache = HandleCache::new();
        let t0 = SystemTime::now();
        let a = cache.intern(Path::new("/srv/a"), t0);
        let t1 = t0 + Duration::from_secs(3000);
        assert_eq!(cache.intern(Path::new("/srv/a"), t1), a);
        // 3000s after the refresh the slot is still within its hour.
        let t2 = t1 + Duration::from_secs(3000);
        assert_eq!(cache.intern(Path::new("/srv/a"), t2), a);
    }

    #[test]
    fn reuse_drops_cached_listing() {
        let mut cache = HandleCache::new();
        let t0 = SystemTime::now();
        let a = cache.intern(Path::new("/srv/dir"), t0);
        let (_, listing) = cache.entry(a).unwrap();
        *listing = Some(vec![props("x.txt")]);
        // Age the slot out and intern a different path into it.
        let b = cache.intern(Path::new("/srv/other"), t0 + Duration::from_secs(7200));
        assert_eq!(a, b);
        let (_, listing) = cache.entry(b).unwrap();
        assert!(listing.is_none());
    }
}
