use crate::session::ServerProbe;
use crate::types::{Edition, ExecuteConfig, ExecuteDetails, ExecuteOptions, McQueryError, ServerStatus};
use crate::utils::{build_host, normalize_endings, normalize_subdomains};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Workers per available CPU when no concurrency is configured.
const WORKERS_PER_CPU: usize = 8;
const MIN_DEFAULT_WORKERS: usize = 32;

pub type ProgressCallback = Arc<dyn Fn(&LookupProgress) + Send + Sync>;

#[derive(Clone)]
pub struct LookupConfig {
    pub edition: Edition,
    /// `0` selects the edition's default port.
    pub port: u16,
    pub base_host: String,
    pub subdomains: Vec<String>,
    pub domain_endings: Vec<String>,
    /// `0` picks a worker count from the available parallelism.
    pub concurrency: usize,
    /// Candidate starts per second, `0` for unlimited.
    pub rate_limit: u32,
    /// Cancels the lookup once elapsed.
    pub max_duration: Option<Duration>,
    pub options: ExecuteOptions,
    /// Called from worker tasks after every finished candidate. Must not block.
    pub progress: Option<ProgressCallback>,
}

impl fmt::Debug for LookupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupConfig")
            .field("edition", &self.edition)
            .field("port", &self.port)
            .field("base_host", &self.base_host)
            .field("subdomains", &self.subdomains.len())
            .field("domain_endings", &self.domain_endings.len())
            .field("concurrency", &self.concurrency)
            .field("rate_limit", &self.rate_limit)
            .field("max_duration", &self.max_duration)
            .field("options", &self.options)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupMatch {
    pub host: String,
    pub status: ServerStatus,
    pub details: ExecuteDetails,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LookupResult {
    /// In worker completion order.
    pub matches: Vec<LookupMatch>,
    pub attempts: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupProgress {
    pub subdomain: String,
    pub ending: String,
    pub host: String,
    /// 1-based position in generation order.
    pub attempt: usize,
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    subdomain: String,
    ending: String,
    host: String,
    attempt: usize,
}

/// Probes every `subdomain.base.ending` combination and collects the hosts
/// that answered.
///
/// Per-candidate failures only mean "no match". Configuration errors fail
/// before any probe; cancellation (of `cancel` or through `max_duration`)
/// returns `LookupCancelled` carrying the partial result.
pub async fn lookup_domains(
    probe: Arc<dyn ServerProbe>,
    config: LookupConfig,
    cancel: &CancellationToken,
) -> Result<LookupResult, McQueryError> {
    let base_host = config.base_host.trim().to_string();
    if base_host.is_empty() {
        return Err(McQueryError::ConfigError("base host cannot be empty".to_string()));
    }

    let mut subdomains = normalize_subdomains(&config.subdomains);
    if subdomains.is_empty() {
        subdomains.push(String::new());
    }
    let endings = normalize_endings(&config.domain_endings);
    if endings.is_empty() {
        return Err(McQueryError::ConfigError("no domain endings provided".to_string()));
    }

    let total = subdomains.len() * endings.len();
    let workers = worker_count(config.concurrency, total);
    let port = if config.port == 0 {
        config.edition.default_port()
    } else {
        config.port
    };

    info!(
        "Looking up {} candidates for {} ({} workers, rate limit {})",
        total,
        base_host,
        workers,
        if config.rate_limit > 0 { config.rate_limit.to_string() } else { "off".to_string() }
    );
    let started = Instant::now();

    let scope = cancel.child_token();
    let _scope_guard = scope.clone().drop_guard();
    if let Some(limit) = config.max_duration.filter(|d| !d.is_zero()) {
        let deadline = scope.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = deadline.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    debug!("lookup deadline of {:?} reached", limit);
                    deadline.cancel();
                }
            }
        });
    }

    let limiter = NonZeroU32::new(config.rate_limit)
        .map(|rate| RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN)));

    let (candidate_tx, candidate_rx) = mpsc::channel::<Candidate>(workers);
    let (match_tx, mut match_rx) = mpsc::channel::<LookupMatch>(workers);
    let candidate_rx = Arc::new(Mutex::new(candidate_rx));
    let completed = Arc::new(AtomicUsize::new(0));

    let generator = tokio::spawn(generate_candidates(
        subdomains,
        endings,
        base_host.clone(),
        limiter,
        candidate_tx,
        scope.clone(),
    ));

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let worker = Worker {
            probe: Arc::clone(&probe),
            edition: config.edition,
            port,
            options: config.options.clone(),
            progress: config.progress.clone(),
            total,
            completed: Arc::clone(&completed),
            cancel: scope.clone(),
        };
        handles.push(tokio::spawn(worker.run(Arc::clone(&candidate_rx), match_tx.clone())));
    }
    drop(match_tx);

    let mut matches = Vec::new();
    while let Some(found) = match_rx.recv().await {
        info!("{} answered", found.host);
        matches.push(found);
    }

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            warn!("lookup worker ended abnormally: {}", e);
        }
    }
    if let Err(e) = generator.await {
        warn!("candidate generator ended abnormally: {}", e);
    }

    let result = LookupResult {
        matches,
        attempts: total,
        completed: completed.load(Ordering::SeqCst),
    };
    info!(
        "Lookup for {} finished: {} matches, {}/{} probes in {:.2}s",
        base_host,
        result.matches.len(),
        result.completed,
        result.attempts,
        started.elapsed().as_secs_f64()
    );

    if scope.is_cancelled() {
        return Err(McQueryError::LookupCancelled {
            partial: Box::new(result),
        });
    }
    Ok(result)
}

fn worker_count(configured: usize, total: usize) -> usize {
    let workers = if configured > 0 {
        configured
    } else {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        (cpus * WORKERS_PER_CPU).max(MIN_DEFAULT_WORKERS)
    };
    workers.min(total).max(1)
}

async fn generate_candidates(
    subdomains: Vec<String>,
    endings: Vec<String>,
    base_host: String,
    limiter: Option<DefaultDirectRateLimiter>,
    tx: mpsc::Sender<Candidate>,
    cancel: CancellationToken,
) {
    let mut attempt = 0;
    for subdomain in &subdomains {
        for ending in &endings {
            attempt += 1;
            if let Some(limiter) = &limiter {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = limiter.until_ready() => {}
                }
            }

            let candidate = Candidate {
                subdomain: subdomain.clone(),
                ending: ending.clone(),
                host: build_host(subdomain, &base_host, ending),
                attempt,
            };
            tokio::select! {
                _ = cancel.cancelled() => return,
                sent = tx.send(candidate) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

struct Worker {
    probe: Arc<dyn ServerProbe>,
    edition: Edition,
    port: u16,
    options: ExecuteOptions,
    progress: Option<ProgressCallback>,
    total: usize,
    completed: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self, candidates: Arc<Mutex<mpsc::Receiver<Candidate>>>, matches: mpsc::Sender<LookupMatch>) {
        loop {
            let next = {
                let mut rx = candidates.lock().await;
                tokio::select! {
                    _ = self.cancel.cancelled() => None,
                    candidate = rx.recv() => candidate,
                }
            };
            let Some(candidate) = next else {
                return;
            };
            if self.cancel.is_cancelled() {
                return;
            }

            let config = ExecuteConfig::new(self.edition, candidate.host.clone(), self.port, &self.options);
            let (outcome, details) = self.probe.execute(config, &self.cancel).await;
            let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;

            if let Some(progress) = &self.progress {
                progress(&LookupProgress {
                    subdomain: candidate.subdomain.clone(),
                    ending: candidate.ending.clone(),
                    host: candidate.host.clone(),
                    attempt: candidate.attempt,
                    total: self.total,
                    completed: done,
                });
            }

            let status = match outcome {
                Ok(status) => status,
                Err(e) => {
                    debug!("{}: no match ({})", candidate.host, e);
                    continue;
                }
            };

            let found = LookupMatch {
                host: candidate.host,
                status,
                details,
            };
            tokio::select! {
                biased;
                sent = matches.send(found) => {
                    if sent.is_err() {
                        return;
                    }
                }
                _ = self.cancel.cancelled() => return,
            }
        }
    }
}
