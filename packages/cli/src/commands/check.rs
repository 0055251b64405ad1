use super::decode_log;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Delta log to validate (JSON array of `{ session, delta }`)
    pub log: PathBuf,
}

/// Decode a log without applying it
pub fn check(args: CheckArgs) -> Result<(), anyhow::Error> {
    let deltas = decode_log(&args.log)?;

    for (index, (session, delta)) in deltas.iter().enumerate() {
        println!(
            "   {} #{} {} ({} ops, base {}, session {})",
            "✓".green(),
            index,
            delta.kind(),
            delta.operations().len(),
            delta.base_version().unwrap_or_default(),
            session
        );
    }

    println!();
    println!("✨ {} {} deltas decoded", "Done".green().bold(), deltas.len());
    Ok(())
}
