use clap::Parser;
use profile_harvest::adapters::prompt::StdinPrompt;
use profile_harvest::utils::{logger, validation::Validate};
use profile_harvest::{build_pipeline, CliArgs, HarvestError, RunFlags, Settings};
use std::sync::Arc;

fn exit_with(error: &HarvestError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 Suggestion: {}", error.recovery_suggestion());
    std::process::exit(error.exit_code());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting profile-harvest");
    tracing::info!("📁 Loading settings from: {}", args.config);

    // 載入並驗證設定；任何網路呼叫之前就失敗
    let settings = match Settings::from_file(&args.config) {
        Ok(settings) => args.apply_overrides(settings),
        Err(e) => exit_with(&e.into()),
    };
    if let Err(e) = settings.validate() {
        exit_with(&e.into());
    }
    let interval = match settings.poll_interval() {
        Ok(interval) => interval,
        Err(e) => exit_with(&e.into()),
    };

    let flags = RunFlags {
        dry_run: args.dry_run,
        monitor: args.monitor,
    };
    if flags.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written to the sheet");
    }

    let mut pipeline = match build_pipeline(&settings, Arc::new(StdinPrompt::new()), flags) {
        Ok(pipeline) => pipeline,
        Err(e) => exit_with(&e),
    };

    match interval {
        Some(interval) => {
            tracing::info!("⏱️ Running every {:?} (Ctrl-C to stop)", interval);
            let summary = pipeline.run_scheduled(interval, None).await;
            println!(
                "Stopped after {} cycles: {} succeeded, {} failed",
                summary.cycles, summary.succeeded, summary.failed
            );
        }
        None => match pipeline.run_once().await {
            Ok(report) => {
                println!("✅ Run completed successfully!");
                println!(
                    "📊 fetched {} | matched {} | written {} | duplicates skipped {}",
                    report.fetched, report.matched, report.written, report.skipped_duplicates
                );
                if report.truncated {
                    println!("⚠️ Search stopped early on a malformed page; some profiles were not checked");
                }
            }
            Err(failure) => {
                eprintln!("❌ Failed while {}", failure.stage);
                exit_with(&failure.error);
            }
        },
    }

    Ok(())
}
