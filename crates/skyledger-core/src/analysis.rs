use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::classify::{classify, exclusion_reason, ExclusionReason, ExclusionStats, GrammarId};
use crate::frame::{FrameType, ParsedFrame};
use crate::scan::FileDescriptor;

const EXAMPLES_PER_GRAMMAR: usize = 3;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GrammarUsage {
    pub count: usize,
    pub examples: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Distribution of filename grammars over a scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub total: usize,
    pub skipped: usize,
    pub analyzed: usize,
    pub by_grammar: BTreeMap<GrammarId, GrammarUsage>,
    pub by_frame_type: BTreeMap<FrameType, usize>,
    pub skipped_by_reason: ExclusionStats,
    /// Sorted.
    pub unparseable: Vec<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl PatternAnalysis {
    pub fn parsed(&self) -> usize {
        self.analyzed - self.unparseable.len()
    }

    /// Share of analyzed files that matched a grammar, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.analyzed == 0 {
            return 0.0;
        }
        self.parsed() as f64 * 100.0 / self.analyzed as f64
    }
}

enum Outcome<'a> {
    Skipped(ExclusionReason),
    Parsed(&'a str, ParsedFrame),
    Unparseable(&'a str),
}

/// Classify every scanned file. Excluded files are counted and never classified.
pub fn analyze_scan(files: &[FileDescriptor]) -> PatternAnalysis {
    let outcomes: Vec<Outcome<'_>> = files
        .par_iter()
        .map(|f| {
            let name = f.filename.as_str();
            if let Some(reason) = exclusion_reason(name) {
                return Outcome::Skipped(reason);
            }
            match classify(name) {
                Ok(parsed) => Outcome::Parsed(name, parsed),
                Err(_) => Outcome::Unparseable(name),
            }
        })
        .collect();

    let mut analysis = PatternAnalysis {
        total: files.len(),
        ..Default::default()
    };

    for outcome in outcomes {
        match outcome {
            Outcome::Skipped(reason) => {
                analysis.skipped += 1;
                analysis.skipped_by_reason.record(reason);
            }
            Outcome::Unparseable(name) => {
                analysis.analyzed += 1;
                analysis.unparseable.push(name.to_string());
            }
            Outcome::Parsed(name, parsed) => {
                analysis.analyzed += 1;
                *analysis.by_frame_type.entry(parsed.frame_type).or_insert(0) += 1;

                let date = parsed.obs_date;
                let usage = analysis.by_grammar.entry(parsed.source_pattern).or_default();
                usage.count += 1;
                if usage.examples.len() < EXAMPLES_PER_GRAMMAR {
                    usage.examples.push(name.to_string());
                }
                usage.first_date = Some(usage.first_date.map_or(date, |d| d.min(date)));
                usage.last_date = Some(usage.last_date.map_or(date, |d| d.max(date)));

                analysis.date_range = Some(match analysis.date_range {
                    None => (date, date),
                    Some((lo, hi)) => (lo.min(date), hi.max(date)),
                });
            }
        }
    }
    analysis.unparseable.sort();

    info!(
        total = analysis.total,
        skipped = analysis.skipped,
        analyzed = analysis.analyzed,
        unparseable = analysis.unparseable.len(),
        "pattern analysis finished"
    );
    analysis
}
