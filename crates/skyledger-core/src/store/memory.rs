use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use parking_lot::Mutex;

use super::{
    FrameStore, InsertOutcome, NightRegistry, StoreError, StoreResult, TargetStore,
};
use crate::frame::{Coordinates, FrameRecord, FrameType, Night, Target, TargetType, Tile, UnitId};

#[derive(Debug, Default)]
pub(super) struct Inner {
    pub(super) frames: HashMap<String, FrameRecord>,
    pub(super) nights: BTreeMap<NaiveDate, Night>,
    pub(super) targets: HashMap<String, Target>,
    pub(super) tiles: BTreeMap<u32, Tile>,
}

/// In-process store. One lock guards all tables, so every trait call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub(super) inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn target_count(&self) -> usize {
        self.inner.lock().targets.len()
    }

    pub fn tile_count(&self) -> usize {
        self.inner.lock().tiles.len()
    }

    pub fn frame(&self, filename: &str) -> Option<FrameRecord> {
        self.inner.lock().frames.get(filename).cloned()
    }

    pub fn nights(&self) -> Vec<Night> {
        self.inner.lock().nights.values().cloned().collect()
    }
}

impl FrameStore for MemoryStore {
    fn contains_filename(&self, filename: &str) -> StoreResult<bool> {
        Ok(self.inner.lock().frames.contains_key(filename))
    }

    fn registered_filenames(&self) -> StoreResult<HashSet<String>> {
        Ok(self.inner.lock().frames.keys().cloned().collect())
    }

    fn existing_filenames(
        &self,
        night: NaiveDate,
        unit: Option<UnitId>,
    ) -> StoreResult<HashSet<String>> {
        let inner = self.inner.lock();
        Ok(inner
            .frames
            .values()
            .filter(|f| f.night == night && (unit.is_none() || f.unit == unit))
            .map(|f| f.original_filename.clone())
            .collect())
    }

    fn insert_if_absent(&self, record: FrameRecord) -> StoreResult<InsertOutcome> {
        let mut inner = self.inner.lock();
        if inner.frames.contains_key(&record.original_filename) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        inner
            .frames
            .insert(record.original_filename.clone(), record);
        Ok(InsertOutcome::Inserted)
    }

    fn unlinked_science_frames(&self, night: NaiveDate) -> StoreResult<Vec<FrameRecord>> {
        let inner = self.inner.lock();
        let mut frames: Vec<FrameRecord> = inner
            .frames
            .values()
            .filter(|f| f.night == night && f.frame_type == FrameType::Science && !f.is_linked())
            .cloned()
            .collect();
        frames.sort_by(|a, b| {
            (a.obs_date, a.obs_time, a.sequence_number, &a.original_filename).cmp(&(
                b.obs_date,
                b.obs_time,
                b.sequence_number,
                &b.original_filename,
            ))
        });
        Ok(frames)
    }

    fn link_target_if_unlinked(&self, filename: &str, target: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        if !inner.targets.contains_key(target) {
            return Err(StoreError::NotFound(format!("target {target}")));
        }
        let frame = inner
            .frames
            .get_mut(filename)
            .ok_or_else(|| StoreError::NotFound(format!("frame {filename}")))?;
        if frame.is_linked() {
            return Ok(false);
        }
        frame.target = Some(target.to_string());
        Ok(true)
    }

    fn link_tile_if_unlinked(&self, filename: &str, tile: u32) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        if !inner.tiles.contains_key(&tile) {
            return Err(StoreError::NotFound(format!("tile {tile}")));
        }
        let frame = inner
            .frames
            .get_mut(filename)
            .ok_or_else(|| StoreError::NotFound(format!("frame {filename}")))?;
        if frame.is_linked() {
            return Ok(false);
        }
        frame.tile = Some(tile);
        Ok(true)
    }

    fn frames_for_night(&self, night: NaiveDate) -> StoreResult<Vec<FrameRecord>> {
        let inner = self.inner.lock();
        let mut frames: Vec<FrameRecord> = inner
            .frames
            .values()
            .filter(|f| f.night == night)
            .cloned()
            .collect();
        frames.sort_by(|a, b| a.original_filename.cmp(&b.original_filename));
        Ok(frames)
    }

    fn delete_night_frames(&self, night: NaiveDate) -> StoreResult<usize> {
        let mut inner = self.inner.lock();
        let before = inner.frames.len();
        inner.frames.retain(|_, f| f.night != night);
        Ok(before - inner.frames.len())
    }
}

impl NightRegistry for MemoryStore {
    fn get_or_create_night(&self, date: NaiveDate) -> StoreResult<Night> {
        let mut inner = self.inner.lock();
        Ok(inner
            .nights
            .entry(date)
            .or_insert_with(|| Night::new(date))
            .clone())
    }

    fn update_night(&self, night: &Night) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        match inner.nights.get_mut(&night.date) {
            Some(existing) => {
                *existing = night.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("night {}", night.date))),
        }
    }

    fn get_night(&self, date: NaiveDate) -> StoreResult<Option<Night>> {
        Ok(self.inner.lock().nights.get(&date).cloned())
    }

    fn delete_night(&self, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.inner.lock().nights.remove(&date).is_some())
    }
}

impl TargetStore for MemoryStore {
    fn get_or_create_target(
        &self,
        name: &str,
        target_type: TargetType,
        description: &str,
    ) -> StoreResult<(Target, bool)> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.targets.get(name) {
            return Ok((existing.clone(), false));
        }
        let target = Target::with_placeholder(name, target_type, description.to_string());
        inner.targets.insert(name.to_string(), target.clone());
        Ok((target, true))
    }

    fn find_target(&self, name: &str) -> StoreResult<Option<Target>> {
        Ok(self.inner.lock().targets.get(name).cloned())
    }

    fn backfill_if_placeholder(&self, name: &str, coordinates: Coordinates) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let target = inner
            .targets
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(format!("target {name}")))?;
        if !target.has_placeholder_coordinates() {
            return Ok(false);
        }
        target.ra = coordinates.ra;
        target.dec = coordinates.dec;
        Ok(true)
    }

    fn find_tile(&self, id: u32) -> StoreResult<Option<Tile>> {
        Ok(self.inner.lock().tiles.get(&id).cloned())
    }

    fn upsert_tile(&self, tile: Tile) -> StoreResult<bool> {
        Ok(self.inner.lock().tiles.insert(tile.id, tile).is_none())
    }
}
