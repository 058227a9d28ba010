use crate::utils::error::Stage;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// 每個階段的耗時與（可選）記憶體用量
#[derive(Debug, Clone)]
pub struct StageStats {
    pub stage: Stage,
    pub elapsed: Duration,
    pub memory_mb: Option<u64>,
}

pub struct RunMonitor {
    enabled: bool,
    run_started: Instant,
    stage_started: Instant,
    stages: Vec<StageStats>,
    #[cfg(feature = "cli")]
    system: Option<(System, Pid)>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        let system = if enabled {
            sysinfo::get_current_pid()
                .ok()
                .map(|pid| (System::new(), pid))
        } else {
            None
        };

        Self {
            enabled,
            run_started: Instant::now(),
            stage_started: Instant::now(),
            stages: Vec::new(),
            #[cfg(feature = "cli")]
            system,
        }
    }

    pub fn start_run(&mut self) {
        self.run_started = Instant::now();
        self.stage_started = self.run_started;
        self.stages.clear();
    }

    pub fn start_stage(&mut self) {
        self.stage_started = Instant::now();
    }

    pub fn finish_stage(&mut self, stage: Stage) {
        let stats = StageStats {
            stage,
            elapsed: self.stage_started.elapsed(),
            memory_mb: self.memory_mb(),
        };

        if self.enabled {
            match stats.memory_mb {
                Some(mb) => tracing::info!(
                    "📊 {} - Memory: {}MB, Time: {:?}",
                    stats.stage,
                    mb,
                    stats.elapsed
                ),
                None => tracing::info!("📊 {} - Time: {:?}", stats.stage, stats.elapsed),
            }
        }
        self.stages.push(stats);
    }

    pub fn log_final_stats(&self) {
        if self.enabled {
            tracing::info!(
                "📊 Run finished in {:?} across {} stages",
                self.run_started.elapsed(),
                self.stages.len()
            );
        }
    }

    pub fn stages(&self) -> &[StageStats] {
        &self.stages
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(feature = "cli")]
    fn memory_mb(&mut self) -> Option<u64> {
        let (system, pid) = self.system.as_mut()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[*pid]), true);
        system.process(*pid).map(|p| p.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn memory_mb(&mut self) -> Option<u64> {
        None
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
