use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::TEMPERATURE_PLACEHOLDER;
use crate::frame::{FrameType, ParsedFrame, UnitId};

/// Identifier of one filename grammar generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarId {
    /// `7DT01_20250301_034512_M51_m625_1x1_100.0s_0001.fits`
    Current,
    /// `7DT02_LIGHT_NGC1566_2023-10-12_03-01-14_r_60.00s_0021.fits`
    UnitLegacy,
    /// `FlatWizard_m625_2.50s_2023-10-12_05-03-25_0007.fits`
    FlatWizard,
    /// `LIGHT_NGC1566_20_2023-10-12_03-01-14_r_60.00s_0021.fits`
    TypedLegacy,
    /// `NGC253_2023-09-30_01-12-40_g_120.00s_0003.fits`
    ObjectLegacy,
    /// `LTT1020_2023-10-11_02-58-48_u_$$$$_60.00s_0000.fits`
    ObjectTemperature,
    /// `2023-10-11_02-58-48_m625_-10.0_60.00s_0000.fits`
    BareTemperature,
}

impl GrammarId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::UnitLegacy => "unit_legacy",
            Self::FlatWizard => "flat_wizard",
            Self::TypedLegacy => "typed_legacy",
            Self::ObjectLegacy => "object_legacy",
            Self::ObjectTemperature => "object_temperature",
            Self::BareTemperature => "bare_temperature",
        }
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the date and time tokens of a grammar are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateStyle {
    /// `YYYYMMDD` and `HHMMSS`.
    Compact,
    /// `YYYY-MM-DD` and `HH-MM-SS`.
    Hyphenated,
}

impl DateStyle {
    fn date_format(&self) -> &'static str {
        match self {
            Self::Compact => "%Y%m%d",
            Self::Hyphenated => "%Y-%m-%d",
        }
    }

    fn time_format(&self) -> &'static str {
        match self {
            Self::Compact => "%H%M%S",
            Self::Hyphenated => "%H-%M-%S",
        }
    }
}

/// Declarative description of one filename format.
///
/// Patterns use named captures: `unit`, `frametype`, `object`, `date`, `time`,
/// `filter`, `binning`, `temp`, `exposure`, `seq`. Only `date`, `time` and `seq`
/// are mandatory. Supporting a new format means appending one entry to
/// [`GRAMMARS`].
#[derive(Clone, Copy, Debug)]
pub struct GrammarSpec {
    pub id: GrammarId,
    pub pattern: &'static str,
    pub date_style: DateStyle,
    pub implied_frame_type: Option<FrameType>,
}

/// All known grammars, most specific first. The patterns are structurally
/// disjoint so at most one of them matches any filename.
pub const GRAMMARS: &[GrammarSpec] = &[
    GrammarSpec {
        id: GrammarId::Current,
        pattern: r"^(?P<unit>7DT\d{2})_(?P<date>\d{8})_(?P<time>\d{6})_(?P<object>[^_]+)_(?P<filter>[^_]+)_(?P<binning>\d+x\d+)_(?P<exposure>\d+(?:\.\d+)?)s_(?P<seq>\d+)\.fits(?:\.fz)?$",
        date_style: DateStyle::Compact,
        implied_frame_type: None,
    },
    GrammarSpec {
        id: GrammarId::UnitLegacy,
        pattern: r"^(?P<unit>7DT\d{2})_(?P<frametype>LIGHT|BIAS|DARK|FLAT)_(?P<object>[^_]*)_(?P<date>\d{4}-\d{2}-\d{2})_(?P<time>\d{2}-\d{2}-\d{2})_(?P<filter>[^_]+)_(?P<exposure>\d+(?:\.\d+)?)s_(?P<seq>\d+)\.fits(?:\.fz)?$",
        date_style: DateStyle::Hyphenated,
        implied_frame_type: None,
    },
    GrammarSpec {
        id: GrammarId::FlatWizard,
        pattern: r"^FlatWizard_(?P<filter>[^_]+)_(?P<exposure>\d+(?:\.\d+)?)s_(?P<date>\d{4}-\d{2}-\d{2})_(?P<time>\d{2}-\d{2}-\d{2})_(?P<seq>\d+)\.fits(?:\.fz)?$",
        date_style: DateStyle::Hyphenated,
        implied_frame_type: Some(FrameType::Flat),
    },
    GrammarSpec {
        id: GrammarId::TypedLegacy,
        pattern: r"^(?P<frametype>LIGHT|BIAS|DARK|FLAT)_(?P<object>[^_]*(?:_\d+)?)_(?P<date>\d{4}-\d{2}-\d{2})_(?P<time>\d{2}-\d{2}-\d{2})_(?P<filter>[^_]+)_(?P<exposure>\d+(?:\.\d+)?)s_(?P<seq>\d+)\.fits(?:\.fz)?$",
        date_style: DateStyle::Hyphenated,
        implied_frame_type: None,
    },
    GrammarSpec {
        id: GrammarId::ObjectLegacy,
        pattern: r"^(?P<object>[A-Za-z][^_]*)_(?P<date>\d{4}-\d{2}-\d{2})_(?P<time>\d{2}-\d{2}-\d{2})_(?P<filter>[^_]+)_(?P<exposure>\d+(?:\.\d+)?)s_(?P<seq>\d+)\.fits(?:\.fz)?$",
        date_style: DateStyle::Hyphenated,
        implied_frame_type: None,
    },
    GrammarSpec {
        id: GrammarId::ObjectTemperature,
        pattern: r"^(?P<object>[A-Za-z][^_]*)_(?P<date>\d{4}-\d{2}-\d{2})_(?P<time>\d{2}-\d{2}-\d{2})_(?P<filter>[^_]+)_(?P<temp>\$\$\$\$|-?\d+(?:\.\d+)?)_(?P<exposure>\d+(?:\.\d+)?)s_(?P<seq>\d+)\.fits(?:\.fz)?$",
        date_style: DateStyle::Hyphenated,
        implied_frame_type: None,
    },
    GrammarSpec {
        id: GrammarId::BareTemperature,
        pattern: r"^(?P<date>\d{4}-\d{2}-\d{2})_(?P<time>\d{2}-\d{2}-\d{2})_(?P<filter>[^_]+)_(?P<temp>\$\$\$\$|-?\d+(?:\.\d+)?)_(?P<exposure>\d+(?:\.\d+)?)s_(?P<seq>\d+)\.fits(?:\.fz)?$",
        date_style: DateStyle::Hyphenated,
        implied_frame_type: None,
    },
];

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    GRAMMARS
        .iter()
        .map(|g| Regex::new(g.pattern).expect("grammar patterns are valid regexes"))
        .collect()
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("no filename grammar matched: {0}")]
    NoGrammarMatched(String),

    #[error("invalid date '{value}' in {filename}")]
    InvalidDate { filename: String, value: String },

    #[error("invalid time '{value}' in {filename}")]
    InvalidTime { filename: String, value: String },

    #[error("invalid {field} '{value}' in {filename}")]
    InvalidNumber {
        filename: String,
        field: &'static str,
        value: String,
    },
}

/// A classification together with the byte spans of the variable tokens.
#[derive(Clone, Debug, PartialEq)]
pub struct Classified {
    pub frame: ParsedFrame,
    /// Span of the object token; `None` for grammars without one.
    pub object_span: Option<Range<usize>>,
    pub sequence_span: Range<usize>,
}

/// Classify a bare filename (no directory components).
pub fn classify(filename: &str) -> Result<ParsedFrame, ClassificationError> {
    classify_with_spans(filename).map(|c| c.frame)
}

/// Like [`classify`], keeping the positions of the object and sequence tokens.
pub fn classify_with_spans(filename: &str) -> Result<Classified, ClassificationError> {
    for (spec, re) in GRAMMARS.iter().zip(COMPILED.iter()) {
        if let Some(caps) = re.captures(filename) {
            return build(filename, spec, &caps);
        }
    }
    Err(ClassificationError::NoGrammarMatched(filename.to_string()))
}

/// Every grammar whose structure matches `filename`, in priority order.
pub fn matching_grammars(filename: &str) -> Vec<GrammarId> {
    GRAMMARS
        .iter()
        .zip(COMPILED.iter())
        .filter(|(_, re)| re.is_match(filename))
        .map(|(spec, _)| spec.id)
        .collect()
}

fn build(
    filename: &str,
    spec: &GrammarSpec,
    caps: &Captures<'_>,
) -> Result<Classified, ClassificationError> {
    let text = |name: &str| caps.name(name).map(|m| m.as_str());

    let date_raw = text("date").unwrap_or_default();
    let obs_date = NaiveDate::parse_from_str(date_raw, spec.date_style.date_format()).map_err(
        |_| ClassificationError::InvalidDate {
            filename: filename.to_string(),
            value: date_raw.to_string(),
        },
    )?;

    let time_raw = text("time").unwrap_or_default();
    let obs_time = NaiveTime::parse_from_str(time_raw, spec.date_style.time_format()).map_err(
        |_| ClassificationError::InvalidTime {
            filename: filename.to_string(),
            value: time_raw.to_string(),
        },
    )?;

    let number_error = |field: &'static str, value: &str| ClassificationError::InvalidNumber {
        filename: filename.to_string(),
        field,
        value: value.to_string(),
    };

    let seq_match = caps
        .name("seq")
        .ok_or_else(|| ClassificationError::NoGrammarMatched(filename.to_string()))?;
    let sequence_number: u32 = seq_match
        .as_str()
        .parse()
        .map_err(|_| number_error("sequence", seq_match.as_str()))?;

    let exposure_seconds = match text("exposure") {
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| number_error("exposure", raw))?,
        ),
        None => None,
    };

    let ccd_temperature = match text("temp") {
        Some(TEMPERATURE_PLACEHOLDER) | None => None,
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| number_error("temperature", raw))?,
        ),
    };

    // Two-digit unit tokens outside 7DT01..7DT20 are kept as unknown units.
    let unit = text("unit").and_then(|u| u.parse::<UnitId>().ok());

    let object_match = caps.name("object");
    let object_name = object_match
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let frame_type = resolve_frame_type(text("frametype"), spec.implied_frame_type, &object_name);

    Ok(Classified {
        frame: ParsedFrame {
            frame_type,
            object_name,
            obs_date,
            obs_time,
            filter_name: text("filter").map(str::to_string),
            exposure_seconds,
            sequence_number,
            source_pattern: spec.id,
            unit,
            binning: text("binning").map(str::to_string),
            ccd_temperature,
        },
        object_span: object_match.map(|m| m.range()),
        sequence_span: seq_match.range(),
    })
}

fn resolve_frame_type(
    explicit: Option<&str>,
    implied: Option<FrameType>,
    object_name: &str,
) -> FrameType {
    if let Some(token) = explicit {
        return FrameType::from_token(token);
    }
    if let Some(frame_type) = implied {
        return frame_type;
    }
    let upper = object_name.to_ascii_uppercase();
    if upper.contains("BIAS") {
        FrameType::Bias
    } else if upper.contains("DARK") {
        FrameType::Dark
    } else if upper.contains("FLAT") {
        FrameType::Flat
    } else {
        // Ambiguous names default to science.
        FrameType::Science
    }
}
