use std::path::Path;

use chrono::NaiveDate;
use console::Style;
use skyledger_core::analysis::PatternAnalysis;
use skyledger_core::classify::ExclusionStats;
use skyledger_core::frame::{FrameType, Night};
use skyledger_core::ingest::ImportResult;
use skyledger_core::reconcile::{DateBucket, ReconciliationReport};
use skyledger_core::resolve::{DiscoveryReport, LinkReport};
use skyledger_core::scan::{FolderStatus, FolderValidation};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    warn: Style,
    error: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            warn: Style::new().yellow().bold(),
            error: Style::new().red().bold(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }

    fn title(&self, text: &str) {
        println!();
        println!("  {}", self.title.apply_to(text));
        println!("  {}", self.title.apply_to("\u{2550}".repeat(text.chars().count())));
        println!();
    }

    fn row(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<14}{}", self.label.apply_to(label), self.value.apply_to(value));
    }

    fn sub_row(&self, label: &str, value: impl std::fmt::Display) {
        println!("    {:<16}{}", self.label.apply_to(label), self.value.apply_to(value));
    }

    /// Zero shows as good, anything else as a warning.
    fn count(&self, label: &str, value: usize) {
        let styled = if value == 0 {
            self.good.apply_to(value.to_string())
        } else {
            self.warn.apply_to(value.to_string())
        };
        println!("  {:<14}{}", self.label.apply_to(label), styled);
    }
}

pub fn print_import_summary(
    night: &Night,
    exclusions: &ExclusionStats,
    discovery: &DiscoveryReport,
    result: &ImportResult,
    links: Option<&LinkReport>,
    ledger: &Path,
) {
    let s = Styles::new();
    s.title(&format!("Import {}", night.date));

    let mode = if result.parallel {
        format!("parallel, {} workers", result.workers)
    } else {
        "sequential".to_string()
    };
    s.row("Mode", mode);
    s.row("Candidates", result.requested);
    s.row("Excluded", exclusions.total());
    s.row("Imported", result.imported);
    s.row("Existing", result.existing);
    s.count("Failed", result.failed);
    if result.cancelled {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Status"),
            s.warn.apply_to(format!("cancelled after {} files", result.total))
        );
    }
    println!();

    if !result.frame_type_breakdown.is_empty() {
        println!("  {}", s.header.apply_to("New frames by type"));
        for (frame_type, count) in &result.frame_type_breakdown {
            s.sub_row(&frame_type.to_string(), count);
        }
        println!();
    }

    if !result.errors.is_empty() {
        println!("  {}", s.header.apply_to("Failures"));
        for error in result.errors.iter().take(10) {
            println!("    {}  {}", s.value.apply_to(&error.filename), s.label.apply_to(&error.reason));
        }
        if result.errors.len() > 10 {
            println!("    ... and {} more", result.errors.len() - 10);
        }
        println!();
    }

    println!("  {}", s.header.apply_to("Targets"));
    s.sub_row("Sampled", discovery.sampled);
    s.sub_row("Created", discovery.created);
    s.sub_row("Known", discovery.existing);
    match links {
        Some(links) => {
            s.sub_row("Linked targets", links.linked_targets);
            s.sub_row("Linked tiles", links.linked_tiles);
            s.sub_row("Backfilled", links.coordinates_updated);
            if links.tiles_missing > 0 {
                println!(
                    "    {:<16}{}",
                    s.label.apply_to("Unknown tiles"),
                    s.warn.apply_to(links.tiles_missing)
                );
            }
        }
        None => println!("    {}", s.disabled.apply_to("linking skipped")),
    }
    println!();

    println!("  {}", s.header.apply_to("Night"));
    for frame_type in [
        FrameType::Science,
        FrameType::Bias,
        FrameType::Dark,
        FrameType::Flat,
        FrameType::Unknown,
    ] {
        let count = night.count_for(frame_type);
        if count > 0 {
            s.sub_row(&frame_type.to_string(), count);
        }
    }
    s.sub_row("Total", night.total_frames);
    for (unit, count) in &night.unit_counts {
        s.sub_row(&unit.to_string(), count);
    }
    println!();

    println!("  {:<14}{}", s.label.apply_to("Ledger"), s.path.apply_to(ledger.display()));
    println!();
}

pub fn print_reconcile_summary(report: &ReconciliationReport, top_n: usize) {
    let s = Styles::new();
    let summary = &report.summary;
    s.title("Missing Files");

    s.row("Filter", &report.filter);
    s.row("On disk", summary.total);
    if report.filter.is_active() {
        s.row("Filtered", summary.filtered);
    }
    s.row("Excluded", summary.excluded);
    s.row("Science", summary.science);
    s.row("Registered", summary.registered);
    s.count("Missing", summary.missing);
    if summary.date_mismatches > 0 {
        s.count("Mismatches", summary.date_mismatches);
    }
    println!();

    if !report.exclusions.by_reason.is_empty() {
        println!("  {}", s.header.apply_to("Excluded by reason"));
        for (reason, count) in &report.exclusions.by_reason {
            s.sub_row(&reason.to_string(), count);
        }
        println!();
    }

    let top = report.top_dates(top_n);
    if !top.is_empty() {
        println!("  {}", s.header.apply_to(format!("Top missing dates (top {top_n})")));
        for (date, count) in top {
            s.sub_row(&date.to_string(), count);
        }
        println!();
    }
    if let Some(undated) = report.buckets.get(&DateBucket::Undated) {
        s.row("Undated", undated.len());
        println!();
    }
}

/// Per-folder counts. With `only_missing`, folders without missing files are hidden.
pub fn print_folder_breakdown(report: &ReconciliationReport, only_missing: bool) {
    let s = Styles::new();
    println!("  {}", s.header.apply_to("By folder"));
    println!(
        "    {:<36} {:>7} {:>7} {:>7} {:>10} {:>7}",
        "Folder", "Total", "Science", "Excl.", "Registered", "Missing"
    );
    let mut shown = 0;
    for folder in &report.folders {
        if only_missing && folder.missing == 0 {
            continue;
        }
        shown += 1;
        let missing = if folder.missing == 0 {
            s.good.apply_to(folder.missing.to_string())
        } else {
            s.warn.apply_to(folder.missing.to_string())
        };
        println!(
            "    {:<36} {:>7} {:>7} {:>7} {:>10} {:>7}",
            folder.key(),
            folder.total,
            folder.science,
            folder.excluded,
            folder.registered,
            missing
        );
    }
    if shown == 0 {
        println!("    {}", s.disabled.apply_to("no folders with missing files"));
    }
    println!();
}

pub fn print_analysis(analysis: &PatternAnalysis, root: &Path) {
    let s = Styles::new();
    s.title("Filename Patterns");

    println!("  {:<14}{}", s.label.apply_to("Root"), s.path.apply_to(root.display()));
    s.row("Files", analysis.total);
    s.row("Skipped", analysis.skipped);
    s.row("Analyzed", analysis.analyzed);
    s.row("Parsed", format!("{} ({:.1}%)", analysis.parsed(), analysis.success_rate()));
    s.count("Unparseable", analysis.unparseable.len());
    if let Some((first, last)) = analysis.date_range {
        s.row("Dates", format_range(first, last));
    }
    println!();

    println!("  {}", s.header.apply_to("Grammars"));
    for (grammar, usage) in &analysis.by_grammar {
        let range = match (usage.first_date, usage.last_date) {
            (Some(first), Some(last)) => format_range(first, last),
            _ => String::new(),
        };
        println!(
            "    {:<20}{:>8}  {}",
            s.good.apply_to(grammar),
            s.value.apply_to(usage.count),
            s.label.apply_to(range)
        );
        for example in &usage.examples {
            println!("      {}", s.label.apply_to(example));
        }
    }
    println!();

    if !analysis.by_frame_type.is_empty() {
        println!("  {}", s.header.apply_to("Frame types"));
        for (frame_type, count) in &analysis.by_frame_type {
            s.sub_row(&frame_type.to_string(), count);
        }
        println!();
    }

    if !analysis.unparseable.is_empty() {
        println!("  {}", s.header.apply_to("Unparseable"));
        for name in analysis.unparseable.iter().take(20) {
            println!("    {}", s.warn.apply_to(name));
        }
        if analysis.unparseable.len() > 20 {
            println!("    ... and {} more", analysis.unparseable.len() - 20);
        }
        println!();
    }
}

pub fn print_folder_validation(validation: &FolderValidation, detailed: bool) {
    let s = Styles::new();
    s.title("Date Folder Validation");

    s.row("Folders", validation.total());
    s.row("Valid", validation.valid());
    let rate = validation.compliance_rate();
    let style = if rate >= 90.0 {
        &s.good
    } else if rate >= 70.0 {
        &s.warn
    } else {
        &s.error
    };
    println!(
        "  {:<14}{}",
        s.label.apply_to("Compliance"),
        style.apply_to(format!("{rate:.1}%"))
    );
    s.count("Unit errors", validation.unit_errors.len());
    println!();

    println!("  {}", s.header.apply_to("Issues"));
    for status in [
        FolderStatus::InvalidDate,
        FolderStatus::Suspicious,
        FolderStatus::TooOld,
        FolderStatus::FutureDate,
    ] {
        s.sub_row(&status.to_string(), validation.count(status));
    }
    println!();

    if detailed && validation.issues().next().is_some() {
        println!("  {}", s.header.apply_to("Folders with issues"));
        for check in validation.issues() {
            let date = check.date.map(|d| d.to_string()).unwrap_or_default();
            println!(
                "    {:<8}{:<28}{:<14}{}",
                check.unit,
                check.folder_name,
                s.warn.apply_to(check.status),
                s.label.apply_to(date)
            );
        }
        println!();
    }

    for error in &validation.unit_errors {
        println!("  {} {}: {}", s.error.apply_to("unreadable"), error.unit, error.reason);
    }
}

fn format_range(first: NaiveDate, last: NaiveDate) -> String {
    if first == last {
        first.to_string()
    } else {
        format!("{first} to {last}")
    }
}
