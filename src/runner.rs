//! Periodic runner for `watch` mode.
//!
//! Cycles are blocking (ureq, filesystem, retry sleeps), so each one runs on
//! the blocking pool via `spawn_blocking`. A cycle always completes before the
//! next tick is taken. The shutdown signal is subscribed once and observed
//! both while waiting for a tick and while a cycle is running; in the latter
//! case the loop stops as soon as that cycle returns.

use crate::error::CycleError;
use crate::fetcher::{ConfigFetcher, CycleReport};
use siterm_fetcher_http::{HttpClient, ReloadNotifier};
use std::future::Future;
use std::time::Duration;

/// Log a one-line summary of a finished cycle.
pub fn log_cycle_result(result: &Result<CycleReport, CycleError>) {
    match result {
        Ok(report) => {
            let fetched: Vec<&str> = report.fetched().map(|a| a.name.as_str()).collect();
            log::info!(
                "Cycle done: role={} fetched=[{}] refresh_needed={} notification={:?}",
                report.role,
                fetched.join(", "),
                report.refresh_needed,
                report.notification
            );
        }
        Err(e) => log::error!("Cycle failed: {}", e),
    }
}

/// Run a cycle every `interval` until Ctrl-C.
///
/// Cycle errors are logged and the loop continues with the next tick.
pub async fn watch<C, N>(fetcher: ConfigFetcher<C, N>, interval: Duration) -> anyhow::Result<()>
where
    C: HttpClient + 'static,
    N: ReloadNotifier + 'static,
{
    watch_until(fetcher, interval, tokio::signal::ctrl_c()).await?;
    Ok(())
}

/// Run a cycle every `interval` until `shutdown` resolves.
///
/// Returns the number of cycles that ran to completion, including one that
/// was in flight when `shutdown` resolved.
pub async fn watch_until<C, N, S>(
    fetcher: ConfigFetcher<C, N>,
    interval: Duration,
    shutdown: S,
) -> anyhow::Result<usize>
where
    C: HttpClient + 'static,
    N: ReloadNotifier + 'static,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(shutdown);
    let mut fetcher = fetcher;
    let mut completed = 0;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    log::info!("Watching for configuration changes every {:?}", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = &mut shutdown => {
                signal?;
                log::info!("Interrupted; stopping watch loop");
                return Ok(completed);
            }
        }

        let mut cycle = tokio::task::spawn_blocking(move || {
            let result = fetcher.run_cycle();
            (fetcher, result)
        });

        let (returned, result) = tokio::select! {
            joined = &mut cycle => joined?,
            signal = &mut shutdown => {
                signal?;
                log::info!("Interrupted; stopping after the running cycle");
                let (_, result) = cycle.await?;
                log_cycle_result(&result);
                return Ok(completed + 1);
            }
        };
        fetcher = returned;
        completed += 1;
        log_cycle_result(&result);
    }
}
