use std::collections::BTreeMap;
use std::io::{self, Write};

use super::{DateBucket, DateMismatch, ReconciliationReport};
use crate::consts::REPORT_TOP_N;

const MISMATCH_EXAMPLES: usize = 5;

impl ReconciliationReport {
    /// Write the full text report: summary, mismatch section, per-date
    /// pattern groups with complete file lists, and a final top list.
    pub fn write_detailed_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let s = &self.summary;
        let rule = "=".repeat(100);

        writeln!(out, "{rule}")?;
        writeln!(out, "Missing Files Analysis")?;
        writeln!(out, "Filter: {}", self.filter)?;
        writeln!(out, "{rule}")?;
        writeln!(out)?;

        writeln!(out, "Overall Summary:")?;
        writeln!(out, "   Total FITS files (all):     {}", s.total)?;
        writeln!(out, "   Filtered FITS files:        {}", s.filtered)?;
        writeln!(out, "   Excluded by filtering:      {}", s.excluded)?;
        writeln!(out, "   Science observation files:  {}", s.science)?;
        writeln!(out, "   Registered files:           {}", s.registered)?;
        writeln!(out, "   Missing files:              {}", s.missing)?;
        writeln!(out, "   Missing dates:              {}", self.dated_bucket_count())?;
        if s.date_mismatches > 0 {
            writeln!(out, "   Date mismatches:            {}", s.date_mismatches)?;
        }
        writeln!(out)?;

        if !self.exclusions.by_reason.is_empty() {
            writeln!(out, "Exclusions by reason:")?;
            for (reason, count) in &self.exclusions.by_reason {
                writeln!(out, "   {:<14}{}", reason.to_string(), count)?;
            }
            writeln!(out)?;
        }

        if !self.mismatches.is_empty() {
            self.write_mismatch_section(out)?;
        }

        writeln!(out, "Date-wise Detailed Analysis:")?;
        writeln!(out, "{}", "=".repeat(80))?;
        writeln!(out)?;

        for (bucket, files) in &self.buckets {
            writeln!(out, "{bucket}: {} files", files.len())?;
            writeln!(out, "{}", "-".repeat(50))?;

            writeln!(out, "Pattern Summary:")?;
            for (i, (pattern, group)) in self.pattern_groups(bucket).iter().enumerate() {
                writeln!(out, "   {}. {} ({} files)", i + 1, pattern, group.len())?;
            }

            writeln!(out)?;
            writeln!(out, "Complete File List ({} files):", files.len())?;
            for (i, file) in files.iter().enumerate() {
                let flag = if file.date_mismatch {
                    format!("  [folder {}]", file.folder_name)
                } else {
                    String::new()
                };
                writeln!(out, "   {:4}. {}{}", i + 1, file.filename, flag)?;
            }
            writeln!(out)?;
            writeln!(out, "{}", "=".repeat(80))?;
            writeln!(out)?;
        }

        writeln!(out, "{rule}")?;
        writeln!(out, "Final Summary:")?;
        writeln!(out, "   Analyzed dates:      {}", self.dated_bucket_count())?;
        writeln!(out, "   Total missing files: {}", s.missing)?;
        if let Some(undated) = self.buckets.get(&DateBucket::Undated) {
            writeln!(out, "   Undated files:       {}", undated.len())?;
        }
        let top = self.top_dates(REPORT_TOP_N);
        if !top.is_empty() {
            writeln!(out, "   Top Missing Dates (TOP {REPORT_TOP_N}):")?;
            for (i, (date, count)) in top.iter().enumerate() {
                writeln!(out, "     {:2}. {}: {}", i + 1, date, count)?;
            }
        }
        Ok(())
    }

    fn write_mismatch_section<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Date Mismatch Analysis:")?;
        writeln!(out, "{}", "=".repeat(50))?;
        writeln!(out, "Files where filename date differs from folder date:")?;
        writeln!(out)?;

        let mut groups: BTreeMap<String, Vec<&DateMismatch>> = BTreeMap::new();
        for m in &self.mismatches {
            groups
                .entry(format!("{} -> {}", m.folder_date, m.filename_date))
                .or_default()
                .push(m);
        }

        for (i, (key, files)) in groups.iter().enumerate() {
            writeln!(out, "{}. {} ({} files)", i + 1, key, files.len())?;
            for (j, m) in files.iter().take(MISMATCH_EXAMPLES).enumerate() {
                writeln!(out, "   {}. {} (in {})", j + 1, m.filename, m.folder_name)?;
            }
            if files.len() > MISMATCH_EXAMPLES {
                writeln!(
                    out,
                    "   ... and {} more files",
                    files.len() - MISMATCH_EXAMPLES
                )?;
            }
            writeln!(out)?;
        }
        writeln!(out, "{}", "=".repeat(80))?;
        writeln!(out)?;
        Ok(())
    }
}
