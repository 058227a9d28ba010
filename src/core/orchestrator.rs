use crate::core::collect::{collect_profiles, SearchQuery};
use crate::core::filter::TenureFilter;
use crate::domain::model::{AppendReceipt, Credential, FilterCriteria, Profile, SheetRow, YearMonth};
use crate::domain::ports::{CredentialProvider, ProfileSearch, SheetDestination, SheetSink};
use crate::utils::error::{HarvestError, RunFailure, Stage};
use crate::utils::monitor::RunMonitor;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// 單次執行的狀態機
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Authenticating,
    Searching,
    Filtering,
    Writing,
    Done,
    Failed { stage: Stage, cause: String },
}

impl From<Stage> for RunState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Authenticating => RunState::Authenticating,
            Stage::Searching => RunState::Searching,
            Stage::Filtering => RunState::Filtering,
            Stage::Writing => RunState::Writing,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Authenticating => f.write_str("authenticating"),
            RunState::Searching => f.write_str("searching"),
            RunState::Filtering => f.write_str("filtering"),
            RunState::Writing => f.write_str("writing"),
            RunState::Done => f.write_str("done"),
            RunState::Failed { stage, .. } => write!(f, "failed({})", stage),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub query: SearchQuery,
    pub criteria: FilterCriteria,
    pub destination: SheetDestination,
    pub write_batch_size: usize,
    pub dedupe_against_sheet: bool,
    pub dry_run: bool,
    pub monitor: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub pages: usize,
    pub fetched: usize,
    pub matched: usize,
    pub skipped_duplicates: usize,
    pub written: usize,
    /// A malformed page ended the search early; later results were not seen.
    pub truncated: bool,
    pub receipts: Vec<AppendReceipt>,
    /// Rows that would have been written in dry-run mode.
    pub pending_rows: Vec<SheetRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub cycles: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// 串接驗證、搜尋、過濾、寫入；可單次執行或依固定間隔重複執行
///
/// The only state carried between cycles is the set of identifiers already
/// written to the destination.
pub struct PipelineOrchestrator<A, S, W> {
    auth: A,
    search: S,
    sink: W,
    options: OrchestratorOptions,
    written_ids: HashSet<String>,
    seeded: bool,
    reference_month: Option<YearMonth>,
    history: Vec<RunState>,
    monitor: RunMonitor,
}

impl<A, S, W> PipelineOrchestrator<A, S, W>
where
    A: CredentialProvider,
    S: ProfileSearch,
    W: SheetSink,
{
    pub fn new(auth: A, search: S, sink: W, options: OrchestratorOptions) -> Self {
        let monitor = RunMonitor::new(options.monitor);
        Self {
            auth,
            search,
            sink,
            options,
            written_ids: HashSet::new(),
            seeded: false,
            reference_month: None,
            history: vec![RunState::Idle],
            monitor,
        }
    }

    /// Pins "now" for tenure computation instead of reading the clock each run.
    pub fn with_reference_month(mut self, today: YearMonth) -> Self {
        self.reference_month = Some(today);
        self
    }

    pub fn state(&self) -> &RunState {
        static IDLE: RunState = RunState::Idle;
        self.history.last().unwrap_or(&IDLE)
    }

    /// States visited by the most recent run, starting at `Idle`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn written_ids(&self) -> &HashSet<String> {
        &self.written_ids
    }

    fn enter(&mut self, state: RunState) {
        tracing::debug!("Pipeline state: {} -> {}", self.state(), state);
        self.history.push(state);
    }

    fn begin(&mut self, stage: Stage) {
        self.enter(stage.into());
        self.monitor.start_stage();
    }

    fn end(&mut self, stage: Stage) {
        self.monitor.finish_stage(stage);
    }

    fn fail(&mut self, stage: Stage, error: impl Into<HarvestError>) -> RunFailure {
        let failure = RunFailure::new(stage, error);
        tracing::error!("❌ Run failed while {}: {}", stage, failure.error);
        tracing::error!("💡 Suggestion: {}", failure.error.recovery_suggestion());
        self.enter(RunState::Failed {
            stage,
            cause: failure.error.to_string(),
        });
        failure
    }

    pub async fn run_once(&mut self) -> Result<RunReport, RunFailure> {
        self.history = vec![RunState::Idle];
        self.monitor.start_run();
        let mut report = RunReport::default();

        tracing::info!("🔑 Authenticating");
        self.begin(Stage::Authenticating);
        let mut credential = match self.auth.acquire().await {
            Ok(credential) => credential,
            Err(e) => return Err(self.fail(Stage::Authenticating, e)),
        };
        self.end(Stage::Authenticating);

        tracing::info!("📡 Searching profiles tagged #{}", self.options.query.hashtag);
        self.begin(Stage::Searching);
        let collected = match collect_profiles(
            &self.auth,
            &self.search,
            &mut credential,
            &self.options.query,
        )
        .await
        {
            Ok(collected) => collected,
            Err(e) => return Err(self.fail(Stage::Searching, e)),
        };
        self.end(Stage::Searching);
        report.pages = collected.pages;
        report.fetched = collected.profiles.len();
        report.truncated = collected.truncated;
        tracing::info!(
            "📡 Fetched {} profiles across {} pages",
            report.fetched,
            report.pages
        );
        if report.truncated {
            tracing::warn!("⚠️ Search ended early on a malformed page; results are incomplete");
        }

        self.begin(Stage::Filtering);
        let filter = match self.reference_month {
            Some(today) => TenureFilter::with_reference(self.options.criteria.clone(), today),
            None => TenureFilter::new(self.options.criteria.clone()),
        };
        let matched = filter.apply(collected.profiles);
        self.end(Stage::Filtering);
        report.matched = matched.len();
        tracing::info!(
            "🔍 {} of {} profiles match '{}' with at least {} years",
            report.matched,
            report.fetched,
            self.options.criteria.job_title,
            self.options.criteria.min_years
        );

        self.begin(Stage::Writing);
        let written = self.write(&credential, matched, &mut report).await;
        if let Err(e) = written {
            return Err(self.fail(Stage::Writing, e));
        }
        self.end(Stage::Writing);

        self.enter(RunState::Done);
        self.monitor.log_final_stats();
        tracing::info!(
            "✅ Run complete: {} rows written, {} duplicates skipped{}",
            report.written,
            report.skipped_duplicates,
            if report.truncated { " (search truncated)" } else { "" }
        );
        Ok(report)
    }

    async fn seed_from_destination(&mut self, credential: &Credential) {
        if self.seeded || !self.options.dedupe_against_sheet {
            return;
        }
        match self
            .sink
            .existing_ids(credential, &self.options.destination)
            .await
        {
            Ok(ids) => {
                tracing::debug!("Seeded {} existing ids from the destination", ids.len());
                self.written_ids.extend(ids);
                self.seeded = true;
            }
            Err(e) => {
                tracing::warn!("⚠️ Could not read existing ids, deduplicating in-process only: {}", e);
            }
        }
    }

    /// Drops profiles already written (this process or the destination) and
    /// repeats within the current result set.
    fn new_rows(&self, matched: Vec<Profile>, report: &mut RunReport) -> Vec<SheetRow> {
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(matched.len());
        for profile in matched {
            if profile.id.is_empty() {
                tracing::warn!(
                    "Skipping profile without identifier: {} {}",
                    profile.first_name,
                    profile.last_name
                );
                continue;
            }
            if self.written_ids.contains(&profile.id) || !seen.insert(profile.id.clone()) {
                report.skipped_duplicates += 1;
                continue;
            }
            rows.push(profile.to_row());
        }
        rows
    }

    async fn write(
        &mut self,
        credential: &Credential,
        matched: Vec<Profile>,
        report: &mut RunReport,
    ) -> Result<(), HarvestError> {
        self.seed_from_destination(credential).await;
        let rows = self.new_rows(matched, report);

        if self.options.dry_run {
            for row in &rows {
                tracing::info!(
                    "📝 [dry-run] {} | {} {} | {} | {}",
                    row.id,
                    row.first_name,
                    row.last_name,
                    row.headline,
                    row.url
                );
            }
            report.pending_rows = rows;
            return Ok(());
        }

        if rows.is_empty() {
            tracing::info!("📝 No new rows to append");
            return Ok(());
        }

        let batch_size = self.options.write_batch_size.max(1);
        for batch in rows.chunks(batch_size) {
            let receipt = match self
                .sink
                .append(credential, &self.options.destination, batch)
                .await
            {
                Ok(receipt) => receipt,
                Err(source) if report.written > 0 => {
                    return Err(HarvestError::PartialWrite {
                        written: report.written,
                        source,
                    })
                }
                Err(e) => return Err(e.into()),
            };

            self.written_ids
                .extend(batch.iter().map(|row| row.id.clone()));
            report.written += batch.len();
            tracing::info!(
                "📝 Appended {} rows to {}",
                batch.len(),
                receipt
                    .updated_range
                    .as_deref()
                    .unwrap_or(&self.options.destination.sheet_name)
            );
            report.receipts.push(receipt);
        }
        Ok(())
    }

    /// 依固定間隔重複執行；單次失敗不會中止排程。`max_cycles` 為 None 時持續到 Ctrl-C。
    pub async fn run_scheduled(
        &mut self,
        interval: Duration,
        max_cycles: Option<u64>,
    ) -> ScheduleSummary {
        let mut summary = ScheduleSummary::default();

        loop {
            summary.cycles += 1;
            tracing::info!("⏱️ Starting cycle {}", summary.cycles);

            match self.run_once().await {
                Ok(_) => summary.succeeded += 1,
                Err(failure) => {
                    summary.failed += 1;
                    tracing::warn!(
                        "Cycle {} failed ({}); retrying after {:?}",
                        summary.cycles,
                        failure,
                        interval
                    );
                }
            }

            if max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl-C, stopping schedule");
                    break;
                }
            }
        }

        tracing::info!(
            "⏱️ Schedule stopped after {} cycles ({} succeeded, {} failed)",
            summary.cycles,
            summary.succeeded,
            summary.failed
        );
        summary
    }
}
