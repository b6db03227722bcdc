/// Batch size at which the import pipeline switches to parallel mode on its own.
pub const AUTO_PARALLEL_THRESHOLD: usize = 100_000;

/// Default number of import workers when parallel mode is active.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Number of files a worker processes between progress publications.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1_000;

/// Number of retries for a store call that failed with a transient error.
pub const DEFAULT_STORE_RETRIES: usize = 3;

/// Upper bound on the number of files the target pre-pass classifies.
pub const DEFAULT_TARGET_SAMPLE_SIZE: usize = 1_000;

/// Placeholder right ascension held by a target until a frame supplies coordinates.
pub const PLACEHOLDER_RA: f64 = 0.0;

/// Placeholder declination held by a target until a frame supplies coordinates.
pub const PLACEHOLDER_DEC: f64 = 0.0;

/// Prefix shared by every telescope unit directory and unit token.
pub const UNIT_PREFIX: &str = "7DT";

/// Highest unit number in the array (`7DT01`..`7DT20`).
pub const MAX_UNIT_NUMBER: u8 = 20;

/// Literal token written in place of the CCD temperature when it was not yet available.
pub const TEMPERATURE_PLACEHOLDER: &str = "$$$$";

/// Date folders before this year predate the array and are flagged by folder validation.
pub const EARLIEST_OBSERVATION_YEAR: i32 = 2023;

/// Bucket label used in reports for missing files without any date signal.
pub const UNDATED_BUCKET_LABEL: &str = "SPECIAL";

/// Number of entries shown in "top N" report sections.
pub const REPORT_TOP_N: usize = 10;
