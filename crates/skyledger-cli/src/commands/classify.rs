use anyhow::Result;
use clap::Args;
use skyledger_core::classify::{classify, exclusion_reason};
use skyledger_core::reconcile::fingerprint;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Filenames to classify
    #[arg(required = true)]
    pub filenames: Vec<String>,
}

pub fn run(args: &ClassifyArgs) -> Result<()> {
    for filename in &args.filenames {
        println!("{}", filename);

        match exclusion_reason(filename) {
            Some(reason) => println!("  Candidate:   no ({})", reason),
            None => println!("  Candidate:   yes"),
        }
        println!("  Pattern:     {}", fingerprint(filename));

        match classify(filename) {
            Ok(frame) => {
                println!("  Grammar:     {}", frame.source_pattern);
                println!("  Type:        {}", frame.frame_type);
                if !frame.object_name.is_empty() {
                    println!("  Object:      {}", frame.object_name);
                }
                println!("  Observed:    {} {}", frame.obs_date, frame.obs_time);
                if let Some(ref filter) = frame.filter_name {
                    println!("  Filter:      {}", filter);
                }
                if let Some(exposure) = frame.exposure_seconds {
                    println!("  Exposure:    {:.2}s", exposure);
                }
                println!("  Sequence:    {}", frame.sequence_number);
                if let Some(unit) = frame.unit {
                    println!("  Unit:        {}", unit);
                }
                if let Some(ref binning) = frame.binning {
                    println!("  Binning:     {}", binning);
                }
                if let Some(temp) = frame.ccd_temperature {
                    println!("  CCD temp:    {:.1}", temp);
                }
            }
            Err(e) => println!("  Error:       {}", e),
        }
        println!();
    }

    Ok(())
}
