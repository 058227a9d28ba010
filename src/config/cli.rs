use crate::config::Settings;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "profile-harvest")]
#[command(about = "Collect hashtag-matching profiles, filter by title and tenure, append them to a sheet")]
pub struct CliArgs {
    /// Path to the TOML settings file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Run a single cycle even if poll_interval is configured
    #[arg(long)]
    pub once: bool,

    /// Search and filter but do not write to the sheet
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit JSON log lines instead of the compact format
    #[arg(long)]
    pub json_logs: bool,

    /// Log per-stage timing and memory usage
    #[arg(long)]
    pub monitor: bool,

    #[arg(long)]
    pub hashtag: Option<String>,

    #[arg(long)]
    pub job_title: Option<String>,

    #[arg(long)]
    pub experience_years: Option<u32>,
}

impl CliArgs {
    /// 命令列參數覆寫設定檔
    pub fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(hashtag) = &self.hashtag {
            settings.hashtag = hashtag.clone();
        }
        if let Some(job_title) = &self.job_title {
            settings.job_title = job_title.clone();
        }
        if let Some(years) = self.experience_years {
            settings.experience_years = years;
        }
        if self.once {
            settings.poll_interval = None;
        }
        settings
    }
}
