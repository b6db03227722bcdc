//! Persistence seams.
//!
//! The core never talks to a database directly. Every stage receives a store
//! through these traits; [`MemoryStore`] is the in-process implementation
//! backing the CLI's JSON ledger file.

mod catalog;
mod ledger;
mod memory;

use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;

use crate::frame::{Coordinates, FrameRecord, Night, Target, TargetType, Tile, UnitId};

pub use catalog::{load_tile_catalog, parse_tile_catalog};
pub use ledger::LedgerSnapshot;
pub use memory::MemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backend could not be reached; the call may succeed if repeated.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("uniqueness conflict on {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Outcome of [`FrameStore::insert_if_absent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same filename was already present.
    AlreadyExists,
}

/// Frame records keyed by their unique original filename.
pub trait FrameStore: Send + Sync {
    fn contains_filename(&self, filename: &str) -> StoreResult<bool>;

    /// Every registered filename across all frame types.
    fn registered_filenames(&self) -> StoreResult<HashSet<String>>;

    /// Filenames already stored for a night, optionally restricted to one unit.
    fn existing_filenames(
        &self,
        night: NaiveDate,
        unit: Option<UnitId>,
    ) -> StoreResult<HashSet<String>>;

    /// Insert unless a record with the same filename exists. The check and the
    /// write happen atomically.
    fn insert_if_absent(&self, record: FrameRecord) -> StoreResult<InsertOutcome>;

    /// Science frames of a night carrying neither a target nor a tile link,
    /// ordered by observation date, time, sequence and filename.
    fn unlinked_science_frames(&self, night: NaiveDate) -> StoreResult<Vec<FrameRecord>>;

    /// Set the target link if the frame has no link yet. Returns whether it changed.
    fn link_target_if_unlinked(&self, filename: &str, target: &str) -> StoreResult<bool>;

    /// Set the tile link if the frame has no link yet. Returns whether it changed.
    fn link_tile_if_unlinked(&self, filename: &str, tile: u32) -> StoreResult<bool>;

    fn frames_for_night(&self, night: NaiveDate) -> StoreResult<Vec<FrameRecord>>;

    /// Remove every frame of a night. Returns the number removed.
    fn delete_night_frames(&self, night: NaiveDate) -> StoreResult<usize>;
}

/// Observing nights keyed by date.
pub trait NightRegistry: Send + Sync {
    fn get_or_create_night(&self, date: NaiveDate) -> StoreResult<Night>;

    fn update_night(&self, night: &Night) -> StoreResult<()>;

    fn get_night(&self, date: NaiveDate) -> StoreResult<Option<Night>>;

    /// Returns whether a night was removed.
    fn delete_night(&self, date: NaiveDate) -> StoreResult<bool>;
}

/// Targets keyed by name, plus the read-mostly tile catalog.
pub trait TargetStore: Send + Sync {
    /// Returns the target and whether it was created by this call.
    fn get_or_create_target(
        &self,
        name: &str,
        target_type: TargetType,
        description: &str,
    ) -> StoreResult<(Target, bool)>;

    fn find_target(&self, name: &str) -> StoreResult<Option<Target>>;

    /// Overwrite the target's coordinates only while it still holds the
    /// placeholder. Returns whether the write happened.
    fn backfill_if_placeholder(&self, name: &str, coordinates: Coordinates) -> StoreResult<bool>;

    fn find_tile(&self, id: u32) -> StoreResult<Option<Tile>>;

    /// Returns `true` when the tile was new.
    fn upsert_tile(&self, tile: Tile) -> StoreResult<bool>;
}

/// Everything the import command needs from one backend.
pub trait LedgerStore: FrameStore + NightRegistry + TargetStore {}

impl<T: FrameStore + NightRegistry + TargetStore> LedgerStore for T {}
