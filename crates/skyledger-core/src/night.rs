use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::frame::{FrameType, Night};
use crate::store::{FrameStore, NightRegistry};

/// Recompute a night's counters from the frames stored under it.
///
/// A date with no stored night and no frames is left unregistered; the
/// returned night is empty.
pub fn refresh_night_statistics<S>(store: &S, date: NaiveDate) -> Result<Night>
where
    S: FrameStore + NightRegistry + ?Sized,
{
    let frames = store.frames_for_night(date)?;
    let mut night = match store.get_night(date)? {
        Some(night) => night,
        None if frames.is_empty() => return Ok(Night::new(date)),
        None => store.get_or_create_night(date)?,
    };

    night.science_count = 0;
    night.bias_count = 0;
    night.dark_count = 0;
    night.flat_count = 0;
    night.unknown_count = 0;
    night.unit_counts.clear();

    for frame in &frames {
        match frame.frame_type {
            FrameType::Science => night.science_count += 1,
            FrameType::Bias => night.bias_count += 1,
            FrameType::Dark => night.dark_count += 1,
            FrameType::Flat => night.flat_count += 1,
            FrameType::Unknown => night.unknown_count += 1,
        }
        if let Some(unit) = frame.unit {
            *night.unit_counts.entry(unit).or_insert(0) += 1;
        }
    }
    night.total_frames = frames.len();

    store.update_night(&night)?;
    info!(
        %date,
        total = night.total_frames,
        science = night.science_count,
        units = night.unit_counts.len(),
        "night statistics refreshed"
    );
    Ok(night)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub frames_deleted: usize,
    pub night_deleted: bool,
}

/// Delete every frame of a night and the night itself.
pub fn flush_night<S>(store: &S, date: NaiveDate) -> Result<FlushReport>
where
    S: FrameStore + NightRegistry + ?Sized,
{
    let frames_deleted = store.delete_night_frames(date)?;
    let night_deleted = store.delete_night(date)?;
    info!(%date, frames_deleted, night_deleted, "night flushed");
    Ok(FlushReport {
        frames_deleted,
        night_deleted,
    })
}
