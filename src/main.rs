use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use txt_study_rust::anonymize::{ContactTokenMap, Pseudonymizer};
use txt_study_rust::config::AppConfig;
use txt_study_rust::error::TxtStudyError;
use txt_study_rust::file_writer;
use txt_study_rust::ingest::{self, DeviceKind};
use txt_study_rust::logging::{init_logging, OperationTimer};
use txt_study_rust::models::MessageRecord;
use txt_study_rust::nlp::RuleBasedDetector;
use txt_study_rust::pipeline::AnalysisPipeline;
use txt_study_rust::review;
use txt_study_rust::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// De-identify a device text export
    Anonymize {
        /// Participant record ID (up to 4 digits)
        #[arg(short, long)]
        record_id: String,

        /// Path to the export CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Device the export came from (iphone, android, generic)
        #[arg(short, long, default_value = "iphone")]
        device: String,

        /// Month and year of the reference event (MM/YYYY)
        #[arg(long)]
        reference_date: String,

        /// Contact name to exclude entirely (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Output directory (defaults to the input file's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Delete the original export after the anonymized table is written
        #[arg(long)]
        delete_original: bool,
    },
    /// Aggregate an anonymized record set into time buckets
    Analyze {
        /// Participant ID for the output rows
        #[arg(short, long)]
        pid: String,

        /// Path to the anonymized CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (defaults to the input file's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting txt-study-rust application");

    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Anonymize {
            record_id,
            input,
            device,
            reference_date,
            exclude,
            output_dir,
            delete_original,
        } => anonymize_export(
            &config,
            &record_id,
            &input,
            &device,
            &reference_date,
            &exclude,
            output_dir,
            delete_original,
        ),
        Commands::Analyze {
            pid,
            input,
            output_dir,
        } => analyze_records(&config, &pid, &input, output_dir),
    }
}

/// De-identify a device export and write the anonymized table plus the two
/// review side-files.
#[allow(clippy::too_many_arguments)]
fn anonymize_export(
    config: &AppConfig,
    record_id: &str,
    input: &Path,
    device: &str,
    reference_date: &str,
    exclude: &[String],
    output_dir: Option<PathBuf>,
    delete_original: bool,
) -> Result<()> {
    let timer = OperationTimer::new("anonymize");

    let record_id =
        InputValidator::validate_record_id(record_id, config.anonymization.record_id_length)?;
    InputValidator::validate_input_file(input)?;
    InputValidator::validate_language_tag(&config.anonymization.language)?;
    let reference = InputValidator::parse_reference_date(reference_date)?;
    let device = DeviceKind::from_str(device)?;
    let today = Local::now().date_naive();

    // Ingest and normalize
    let mut records = ingest::read_device_export(input, device, reference)?;
    ingest::clear_received_text(&mut records);
    records = ingest::retain_window(
        records,
        reference,
        today,
        config.window.months_before,
        config.window.past_months_retained,
    );
    records = ingest::exclude_contacts(records, exclude);
    info!(records = records.len(), "Records retained for anonymization");

    let contacts = ingest::unique_contacts(&records);
    info!(contacts = contacts.len(), "Distinct conversations found");

    // Contact-name pass
    let mut rng = rand::thread_rng();
    let token_map =
        ContactTokenMap::generate(&records, config.anonymization.token_length, &mut rng)?;
    token_map.apply_records(&mut records);
    info!(names = token_map.len(), "Contact-name pass complete");

    // Entity-counter pass
    let detector = RuleBasedDetector::new()?;
    let mut pseudonymizer = Pseudonymizer::new(&detector, &config.anonymization.language);
    pseudonymizer.anonymize_records(&mut records, &config.anonymization.excluded_columns)?;
    for (entity_type, count) in pseudonymizer.mapping().type_counts() {
        info!(entity_type, count, "Entities replaced");
    }

    log_preview(&records, config.export.preview_rows, config.export.preview_chars);

    // Write artifacts
    let out_dir = resolve_output_dir(config, input, output_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    let data_path = out_dir.join(format!("AnonymizedTexts_{record_id}_{timestamp}.csv"));
    let data_path =
        write_csv_with_fallback(&data_path, |p| file_writer::write_anonymized_csv(&records, p))?;
    info!(path = %data_path.display(), "Anonymized table written");

    let contact_residue = review::contacts_to_check(&records)?;
    let contacts_path = out_dir.join(format!("Contacts_to_check_{record_id}_{timestamp}.csv"));
    let contacts_path = write_csv_with_fallback(&contacts_path, |p| {
        file_writer::write_name_list(&contact_residue, &format!("Contacts_{record_id}"), p)
    })?;
    info!(path = %contacts_path.display(), names = contact_residue.len(), "Contact review list written");

    let words = review::words_to_review(&records)?;
    let words_path = out_dir.join(format!("WordsToReview_{record_id}_{timestamp}.csv"));
    let words_path = write_csv_with_fallback(&words_path, |p| {
        file_writer::write_name_list(&words, &format!("Words_{record_id}"), p)
    })?;
    info!(path = %words_path.display(), words = words.len(), "Word review list written");

    if delete_original {
        std::fs::remove_file(input)?;
        info!(path = %input.display(), "Original export deleted");
    }

    timer.finish();
    Ok(())
}

/// Aggregate an anonymized record set into per-bucket statistics.
fn analyze_records(
    config: &AppConfig,
    pid: &str,
    input: &Path,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let timer = OperationTimer::new("analyze");

    let pid = InputValidator::validate_record_id(pid, config.anonymization.record_id_length)?;
    InputValidator::validate_input_file(input)?;
    let today = Local::now().date_naive();

    let records = ingest::read_records(input)?;
    let pipeline = AnalysisPipeline::with_layout(
        config.window.bucket_count,
        config.window.months_before,
        config.window.months_per_bucket,
    );
    let rows = pipeline.run(&records, &pid, today)?;

    let out_dir = resolve_output_dir(config, input, output_dir)?;
    let path = out_dir.join(format!("Analyzed-{pid}.csv"));
    let path = write_csv_with_fallback(&path, |p| file_writer::write_analysis_csv(&rows, p))?;
    info!(path = %path.display(), buckets = rows.len(), "Analysis written");

    timer.finish();
    Ok(())
}

/// Pick the output directory: CLI flag, then configuration, then the input
/// file's own directory.
fn resolve_output_dir(
    config: &AppConfig,
    input: &Path,
    output_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    let dir = output_dir
        .or_else(|| config.export.output_directory.clone().map(PathBuf::from))
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    InputValidator::validate_output_dir(&dir)?;
    Ok(dir)
}

/// Write a CSV artifact, retrying once under a timestamped alternate name
/// when the target already exists.
fn write_csv_with_fallback<F>(path: &Path, write: F) -> Result<PathBuf>
where
    F: Fn(&Path) -> txt_study_rust::error::Result<()>,
{
    match write(path) {
        Ok(()) => Ok(path.to_path_buf()),
        Err(TxtStudyError::FileExists(_)) => {
            let alternate = alternate_name(path);
            warn!(
                existing = %path.display(),
                fallback = %alternate.display(),
                "Output file already exists, using an alternate name"
            );
            write(&alternate)?;
            Ok(alternate)
        }
        Err(e) => Err(e.into()),
    }
}

fn alternate_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    path.with_file_name(format!("{stem}-{timestamp}.csv"))
}

/// Log the first few anonymized rows so the operator can eyeball them.
fn log_preview(records: &[MessageRecord], rows: usize, chars: usize) {
    for record in records.iter().take(rows) {
        info!(
            date = %record.date,
            message_type = %record.message_type,
            contact = %truncate_for_display(&record.contact, chars),
            text = %truncate_for_display(&record.text, chars),
            "Preview"
        );
    }
}

fn truncate_for_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
