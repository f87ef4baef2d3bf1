//! Gait Access Gate - demo binary
//!
//! Wires the verification core to the fixture dataset source and an
//! enrollment file, then runs detection cycles on request from the console.

use anyhow::{Context, Result};
use gaitgate::activity::{ActivityLog, JsonlActivityLog};
use gaitgate::classifier::ModelManager;
use gaitgate::config::GateConfig;
use gaitgate::personnel::{InMemoryDirectory, PersonnelDirectory};
use gaitgate::session::{ProgressObserver, ProgressUpdate, SessionController};
use gaitgate::source::{DatasetImageSource, ImageSource};
use gaitgate::SessionOutcome;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

// ──────────────────────────────────────────────────────────────────────────────
// PROGRESS DISPLAY
// ──────────────────────────────────────────────────────────────────────────────

struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        println!("   [{}] {:>5.1}% {}", update.phase, update.percent, update.message);
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let level = std::env::var("GAITGATE_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    println!("\n{}", "═".repeat(60));
    println!("🚶 Gait Access Gate v0.2.0");
    println!("{}", "═".repeat(60));
    println!("Pipeline: Preprocess | ResNet-18 | Unanimity x3 | Time Policy");
    println!("{}\n", "═".repeat(60));

    let config = GateConfig::load().context("loading configuration")?;

    // Personnel directory (read-only enrollment data)
    let directory: Arc<dyn PersonnelDirectory> = Arc::new(
        InMemoryDirectory::from_file(&config.personnel_file)
            .context("loading personnel records")?,
    );

    // Fixture image source over the step-pattern dataset
    let source: Arc<dyn ImageSource> = Arc::new(
        DatasetImageSource::scan(config.dataset_root.clone())
            .context("scanning dataset directory")?,
    );

    // Activity log sink
    let log: Arc<dyn ActivityLog> = Arc::new(JsonlActivityLog::new(config.activity_log.clone()));

    // Model manager - loads lazily on the first session
    let models = Arc::new(ModelManager::new(
        config.model.source.clone(),
        config.model.labels.clone(),
    ));
    models.add_progress_callback(Arc::new(|p| {
        info!("Model load: {:.0}% {}", p.percent, p.status);
    }));

    let controller = SessionController::new(
        models,
        directory,
        source,
        log,
        config.verifier.clone(),
        config.session.clone(),
    );
    controller.add_observer(Arc::new(ConsoleProgress));

    println!("💡 Commands: 'scan' (or Enter) | 'status' | 'quit'\n");

    // Main interaction loop
    loop {
        print!("🛂 Gate: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let command = input.trim();

        match command.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("\n👋 Gate closed.\n");
                break;
            }
            "status" => {
                println!("\n📡 Controller phase: {}\n", controller.phase());
                continue;
            }
            "" | "scan" => {
                println!("\n🔎 Starting detection cycle...");
                match controller.start().await {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => println!("❌ Session error: {}\n", e),
                }
            }
            other => {
                println!("Unknown command: '{}'\n", other);
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Verified {
            person,
            verification,
            decision,
        } => {
            println!("✅ Identity verified: {} ({})", person.name, person.id);
            println!("   Role: {}", person.role);
            println!("   Confidence: {:.1}%", verification.confidence * 100.0);
            if decision.allowed {
                println!("   🟢 Passage permitted - {}\n", decision.reason);
            } else {
                println!("   🔴 Passage denied - {}\n", decision.reason);
            }
        }
        SessionOutcome::Rejected {
            verification,
            reason,
        } => {
            println!("❌ Verification failed: {}", reason);
            println!(
                "   Observations: [{}]",
                verification
                    .predictions
                    .iter()
                    .map(|p| format!("{} {:.0}%", p.label, p.confidence * 100.0))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("   Mean confidence: {:.1}%\n", verification.confidence * 100.0);
        }
        SessionOutcome::UnknownPerson {
            label,
            verification,
        } => {
            println!("⚠️  Identity {} verified but not enrolled", label);
            println!(
                "   Confidence: {:.1}% - contact administration\n",
                verification.confidence * 100.0
            );
        }
    }
}
