//! best-efforts CLI - finish activities and compare best efforts
//!
//! Usage:
//!   best-efforts finish <input.json> <output-dir> [--sensor-only] [--strict]
//!   best-efforts best <dir> [--distance 5k] [--sport Running]
//!   best-efforts show <file>
//!
//! `finish` takes the normalized JSON a parser produced, runs the finishing
//! pass and writes one MessagePack file per activity. `best` scans a directory
//! of those files and reports the fastest one for a distance.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use best_efforts::{
    batch::best_progression,
    best_span::{format_pace, format_span_time},
    codec, database_from_json, AnalysisConfig, FinishedActivity, RaceDistance, Result, Sport,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "best-efforts")]
#[command(about = "Best efforts over race distances for recorded runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Finish a JSON database and persist each activity
    Finish {
        /// Normalized JSON database produced by a parser
        input: PathBuf,

        /// Directory for the persisted activities
        output: PathBuf,

        /// Only search best efforts over samples with a sensor present
        #[arg(long)]
        sensor_only: bool,

        /// Fail on samples whose timestamp does not advance
        #[arg(long)]
        strict: bool,
    },

    /// Find the fastest persisted activity for a distance
    Best {
        /// Folder containing persisted activities
        folder: PathBuf,

        /// Race distance (400m, 1k, 2k, 3k, 5k, 10k, 20k, half, marathon)
        #[arg(short, long, default_value = "5k")]
        distance: RaceDistance,

        /// Sport to compare (Running, Biking, Other)
        #[arg(short, long, default_value = "Running")]
        sport: Sport,
    },

    /// Print the best efforts of one persisted activity
    Show {
        /// Persisted activity file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Finish {
            input,
            output,
            sensor_only,
            strict,
        } => run_finish(&input, &output, sensor_only, strict),
        Commands::Best {
            folder,
            distance,
            sport,
        } => run_best(&folder, distance, sport),
        Commands::Show { file } => run_show(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_finish(input: &Path, output: &Path, sensor_only: bool, strict: bool) -> Result<()> {
    let json = fs::read_to_string(input)?;
    let database = database_from_json(&json)?;
    let config = AnalysisConfig {
        sensor_samples_only: sensor_only,
        strict_time_deltas: strict,
        ..Default::default()
    };

    let finished = database.finish(&config)?;
    fs::create_dir_all(output)?;

    for activity in &finished.activities {
        let path = output.join(codec::activity_file_name(activity));
        codec::write_file(&path, activity)?;
        println!(
            "  [OK] {} - {}, {} samples, {:.2}km",
            path.display(),
            activity.sport(),
            activity.samples().len(),
            activity.activity().total_distance() / 1000.0
        );
        if !activity.degenerate_samples().is_empty() {
            println!(
                "       {} samples with a zero time delta",
                activity.degenerate_samples().len()
            );
        }
    }

    println!("\nFinished {} activities", finished.activities.len());
    Ok(())
}

fn run_best(folder: &Path, distance: RaceDistance, sport: Sport) -> Result<()> {
    println!("\n{}", "=".repeat(60));
    println!("Best {} ({}) in: {}", distance, sport, folder.display());
    println!("{}", "=".repeat(60));

    let loaded = codec::load_dir(folder)?;
    let labelled: Vec<(String, &FinishedActivity)> = loaded
        .iter()
        .map(|(path, activity)| (path.display().to_string(), activity))
        .collect();

    let progression = best_progression(
        labelled.iter().map(|(source, activity)| (source.as_str(), *activity)),
        Some(sport),
        distance,
    );

    for entry in &progression {
        println!(
            "  New best for {}: {} ({}) in {}",
            distance,
            format_span_time(entry.span.seconds),
            format_pace(entry.span.pace_seconds_per_km()),
            entry.source
        );
    }

    match progression.last() {
        Some(best) => println!(
            "\nBest {}: {} from {} ({})",
            distance,
            format_span_time(best.span.seconds),
            best.source,
            best.activity_id
        ),
        None => println!(
            "\nNo {} activity in {} activities covers {}",
            sport,
            loaded.len(),
            distance
        ),
    }
    Ok(())
}

fn run_show(file: &Path) -> Result<()> {
    let activity = codec::read_file(file)?;

    println!(
        "{} activity {} - {} laps, {} samples",
        activity.sport(),
        activity.id(),
        activity.laps().len(),
        activity.samples().len()
    );
    for entry in activity.best_spans().iter() {
        match &entry.best {
            Some(span) => println!(
                "  {:>9}  {:>10}  {:>9}  samples {}..{}",
                entry.distance.to_string(),
                format_span_time(span.seconds),
                format_pace(span.pace_seconds_per_km()),
                span.start_index,
                span.end_index
            ),
            None => println!("  {:>9}  {:>10}", entry.distance.to_string(), "-"),
        }
    }
    Ok(())
}
