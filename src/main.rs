use clap::Parser;
use placement_match::config::{LoggingSettings, Settings};
use placement_match::core::{export_selections, summarize, write_preferences};
use placement_match::models::{CareLevel, PreferenceRecord};
use placement_match::services::{
    load_catalog_from_path, CatalogError, Gazetteer, GeocodeError, OpenAiClient, ServiceError,
};
use placement_match::session::{Consultation, SessionError};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Match a consultation against a senior-living community catalog
#[derive(Debug, Parser)]
#[command(name = "placement-match", version, about)]
struct Args {
    /// Community catalog CSV
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Consultation recording to transcribe
    #[arg(long, conflicts_with_all = ["transcript", "preferences"])]
    audio: Option<PathBuf>,

    /// Plain-text transcript of the consultation
    #[arg(long, conflicts_with = "preferences")]
    transcript: Option<PathBuf>,

    /// Preference record as JSON, skipping transcription and extraction
    #[arg(long)]
    preferences: Option<PathBuf>,

    /// Override the monthly budget in dollars; 0 removes the budget limit
    #[arg(long)]
    budget: Option<f64>,

    /// Override the care level (independent, assisted, memory care)
    #[arg(long)]
    care_level: Option<CareLevel>,

    /// Place-name gazetteer CSV (place,latitude,longitude)
    #[arg(long)]
    gazetteer: Option<PathBuf>,

    /// Directory for the CSV exports
    #[arg(long)]
    output: Option<PathBuf>,

    /// Size of the top-N export
    #[arg(long)]
    top: Option<usize>,

    /// Skip AI explanations
    #[arg(long)]
    no_explain: bool,

    /// Configuration file, instead of config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("No catalog given; pass --catalog or set catalog.path")]
    MissingCatalog,

    #[error("Pass one of --audio, --transcript or --preferences")]
    MissingInput,

    #[error("No API key configured; set OPENAI_API_KEY")]
    MissingApiKey,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Gazetteer error: {0}")]
    Gazetteer(#[from] GeocodeError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Export(#[from] placement_match::core::ExportError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid preferences file: {0}")]
    Json(#[from] serde_json::Error),
}

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.pretty().init();
    }
}

fn read_file(path: &PathBuf) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })
}

fn openai_client(settings: &Settings) -> Result<OpenAiClient, CliError> {
    if settings.openai.api_key.trim().is_empty() {
        return Err(CliError::MissingApiKey);
    }
    Ok(OpenAiClient::from_settings(&settings.openai)?)
}

async fn run(args: Args, settings: Settings) -> Result<(), CliError> {
    let catalog_path = args
        .catalog
        .or_else(|| settings.catalog.path.clone())
        .ok_or(CliError::MissingCatalog)?;
    let catalog = load_catalog_from_path(&catalog_path)?;
    info!("Loaded {} communities from {}", catalog.len(), catalog_path.display());

    let geocoder = match args.gazetteer.or_else(|| settings.catalog.gazetteer_path.clone()) {
        Some(path) => {
            let gazetteer = Gazetteer::from_path(&path)?;
            info!("Loaded {} gazetteer entries", gazetteer.len());
            gazetteer
        }
        None => {
            warn!("No gazetteer configured; only coordinates in the catalog can be used");
            Gazetteer::new()
        }
    };

    let mut session = Consultation::new();

    if let Some(path) = &args.preferences {
        let record: PreferenceRecord = serde_json::from_str(&read_file(path)?)?;
        session.set_preferences(record)?;
    } else {
        let client = openai_client(&settings)?;
        match (&args.audio, &args.transcript) {
            (Some(audio), _) => {
                session.transcribe(&client, audio).await?;
            }
            (None, Some(path)) => {
                session.load_transcript(read_file(path)?)?;
            }
            (None, None) => return Err(CliError::MissingInput),
        }
        session.extract(&client).await?;
    }

    if args.budget.is_some() || args.care_level.is_some() {
        session.adjust_preferences(args.budget, args.care_level)?;
    }

    let preferences = session.preferences().ok_or(SessionError::MissingPreferences)?;
    println!("Client summary");
    for line in preferences.summary_lines() {
        println!("  {}", line);
    }
    println!();

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| settings.export.output_dir.clone());
    write_preferences(&output_dir, preferences)?;

    let mut ranked = session.rank(&catalog, &geocoder)?;
    for exclusion in ranked.exclusions.iter().filter(|e| e.reason.is_data_issue()) {
        warn!(
            "Catalog row {} ({}): {}",
            exclusion.catalog_index + 1,
            exclusion.name.as_deref().unwrap_or("unnamed"),
            exclusion.reason
        );
    }

    let explain_limit = settings.matching.explain_top_n;
    if args.no_explain || explain_limit == 0 || ranked.is_empty() {
        info!("Skipping explanations");
    } else {
        match openai_client(&settings) {
            Ok(client) => {
                let explained = session.explain(&client, &mut ranked, explain_limit).await?;
                info!("Explained {} of the top {} matches", explained, explain_limit.min(ranked.len()));
            }
            Err(e) => warn!("Skipping explanations: {}", e),
        }
    }

    let summary = summarize(&ranked.matches);
    info!("{}", summary);

    let top_n = args.top.unwrap_or(settings.matching.top_n);
    for m in ranked.top(top_n) {
        let distance = m
            .distance_miles
            .map(|d| format!("{:.1} mi", d))
            .unwrap_or_else(|| "distance unknown".to_string());
        println!("{} #{}  {}  ({})", m.tier, m.rank_within_tier, m.name(), distance);
        for line in m.community.detail_lines() {
            println!("    {}", line);
        }
        if !m.explanation.is_empty() {
            println!("    {}", m.explanation);
        }
    }

    let written = export_selections(&ranked.matches, &output_dir, &preferences.file_stem(), top_n)?;
    info!("Wrote {} export files to {}", written.len(), output_dir.display());

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings.logging);
    info!("Starting placement match...");

    match run(args, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
