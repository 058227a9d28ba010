// Application wiring: turns validated settings into a ready-to-run orchestrator.

use crate::adapters::auth::CredentialStrategy;
use crate::adapters::build_http_client;
use crate::adapters::search::HttpProfileSearch;
use crate::adapters::sheets::HttpSheetWriter;
use crate::config::Settings;
use crate::core::collect::SearchQuery;
use crate::core::orchestrator::{OrchestratorOptions, PipelineOrchestrator};
use crate::domain::ports::AuthPrompt;
use crate::utils::error::Result;
use std::sync::Arc;

pub type HarvestPipeline = PipelineOrchestrator<CredentialStrategy, HttpProfileSearch, HttpSheetWriter>;

/// 執行期旗標（來自命令列）
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    pub dry_run: bool,
    pub monitor: bool,
}

pub fn build_pipeline(
    settings: &Settings,
    prompt: Arc<dyn AuthPrompt>,
    flags: RunFlags,
) -> Result<HarvestPipeline> {
    let client = build_http_client(settings.request_timeout())?;

    let auth = CredentialStrategy::from_settings(settings, client.clone(), prompt)?;
    let mut search = HttpProfileSearch::new(
        client.clone(),
        settings.endpoints.search_url.clone(),
        settings.retry,
    );
    if let Some(fields) = &settings.search_fields {
        search = search.with_fields(fields.clone());
    }
    let sink = HttpSheetWriter::new(
        client,
        &settings.endpoints.sheets_base_url,
        settings.value_input_option,
        settings.retry,
    )?
    .with_static_token(settings.sheet_access_token.clone());

    let options = OrchestratorOptions {
        query: SearchQuery::new(
            settings.hashtag.clone(),
            settings.page_size,
            settings.max_results,
        ),
        criteria: settings.criteria(),
        destination: settings.destination(),
        write_batch_size: settings.write_batch_size,
        dedupe_against_sheet: settings.dedupe_against_sheet,
        dry_run: flags.dry_run,
        monitor: flags.monitor,
    };

    tracing::debug!(
        "Pipeline configured: strategy={:?}, hashtag=#{}, destination={}",
        settings.auth_strategy,
        settings.hashtag,
        options.destination.append_range()
    );
    Ok(PipelineOrchestrator::new(auth, search, sink, options))
}
