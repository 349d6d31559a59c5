//! Bounded-concurrency worker pool: `worker_concurrency` tasks each
//! cycle through the three reliable queues with `BRPOPLPUSH`, dispatch
//! to the matching handler under a per-job timeout, and ack/fail the
//! result. Shaped after the crawler's `JobManager` — a `JoinSet` of
//! spawned tasks coordinated through a shared [`CancellationToken`]
//! rather than a channel, since jobs are sourced from Redis lists
//! instead of an in-process queue.

use std::sync::Arc;
use std::time::Duration;

use autoguard_blacklist::SourceSync;
use autoguard_config::Config;
use autoguard_fast::FastStore;
use autoguard_store::Database;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::collaborators::{DnsResolver, HttpScraper, HttpVerifier, LlmClient};
use crate::error::JobError;
use crate::filesystem::PageWriter;
use crate::handlers;
use crate::job::{Action, DomainVerifyJob, PageGenerationJob, SourceSyncJob};
use crate::queue::{FailOutcome, ReliableQueue};

/// Per-queue poll timeout. Short enough that a worker notices a
/// cancellation within a second even while every queue is empty.
const POLL_TIMEOUT_SECS: f64 = 1.0;

pub struct WorkerPool {
    store: Arc<Database>,
    fast: Arc<FastStore>,
    config: Arc<Config>,
    scraper: Arc<dyn HttpScraper>,
    llm: Arc<dyn LlmClient>,
    dns: Arc<dyn DnsResolver>,
    verifier: Arc<dyn HttpVerifier>,
    writer: PageWriter,
    source_sync: SourceSync,
    page_queue: ReliableQueue,
    source_queue: ReliableQueue,
    domain_queue: ReliableQueue,
}

impl WorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Database>,
        fast: Arc<FastStore>,
        config: Arc<Config>,
        scraper: Arc<dyn HttpScraper>,
        llm: Arc<dyn LlmClient>,
        dns: Arc<dyn DnsResolver>,
        verifier: Arc<dyn HttpVerifier>,
        source_sync: SourceSync,
    ) -> Self {
        let page_queue = ReliableQueue::new(
            fast.clone(),
            autoguard_fast::keys::QUEUE_PAGE_GENERATION,
            config.max_job_attempts,
        );
        let source_queue = ReliableQueue::new(
            fast.clone(),
            autoguard_fast::keys::QUEUE_BLACKLIST_SYNC,
            config.max_job_attempts,
        );
        // Domain verification rides the page-generation family's queue
        // naming convention but under its own main key.
        let domain_queue = ReliableQueue::new(fast.clone(), "queue:domainVerify", config.max_job_attempts);
        let writer = PageWriter::new(config.pages_dir.clone());

        Self {
            store,
            fast,
            config,
            scraper,
            llm,
            dns,
            verifier,
            writer,
            source_sync,
            page_queue,
            source_queue,
            domain_queue,
        }
    }

    /// Exposed so the scheduler can enqueue a domain-verification job
    /// under the same queue naming the worker pool consumes from.
    pub fn domain_queue(&self) -> &ReliableQueue {
        &self.domain_queue
    }

    pub fn page_queue(&self) -> &ReliableQueue {
        &self.page_queue
    }

    pub fn source_queue(&self) -> &ReliableQueue {
        &self.source_queue
    }

    /// Recovers jobs stranded in any `:processing` list (from a prior
    /// crash) and runs `worker_concurrency` poll loops until `shutdown`
    /// fires, then waits up to `shutdown_grace_period` for in-flight
    /// jobs before aborting whatever remains.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        for (name, queue) in [
            ("pageGeneration", &self.page_queue),
            ("blacklistSync", &self.source_queue),
            ("domainVerify", &self.domain_queue),
        ] {
            match queue.recover_stuck().await {
                Ok(recovered) if recovered > 0 => {
                    info!(queue = name, recovered, "recovered stuck jobs on startup")
                }
                Ok(_) => {}
                Err(error) => error!(queue = name, %error, "failed to recover stuck jobs"),
            }
        }

        let mut tasks = JoinSet::new();
        for worker_id in 0..self.config.worker_concurrency.max(1) {
            let pool = self.clone();
            let token = shutdown.clone();
            tasks.spawn(async move { pool.worker_loop(worker_id, token).await });
        }

        shutdown.cancelled().await;
        info!("shutdown signal received, draining in-flight jobs");

        let grace = self.config.shutdown_grace_period;
        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!("graceful shutdown window elapsed, aborting remaining workers");
            tasks.abort_all();
        }
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(worker_id, "worker loop exiting");
                    return;
                }
                () = self.poll_once(worker_id) => {}
            }
        }
    }

    /// One round: try each queue once with a short blocking pop. A hit
    /// on any queue processes that single job before the next round.
    async fn poll_once(&self, worker_id: usize) {
        if let Some(payload) = self.try_consume(&self.page_queue).await {
            self.process_page_job(worker_id, payload).await;
            return;
        }
        if let Some(payload) = self.try_consume(&self.source_queue).await {
            self.process_source_job(worker_id, payload).await;
            return;
        }
        if let Some(payload) = self.try_consume(&self.domain_queue).await {
            self.process_domain_job(worker_id, payload).await;
        }
    }

    async fn try_consume(&self, queue: &ReliableQueue) -> Option<String> {
        match queue.consume(POLL_TIMEOUT_SECS).await {
            Ok(payload) => payload,
            Err(error) => {
                error!(queue = queue.main_key(), %error, "queue consume failed");
                tokio::time::sleep(Duration::from_millis(250)).await;
                None
            }
        }
    }

    async fn process_page_job(&self, worker_id: usize, payload: String) {
        let job: PageGenerationJob = match serde_json::from_str(&payload) {
            Ok(job) => job,
            Err(error) => {
                warn!(worker_id, %error, "dropping unparseable page-generation payload");
                let _ = self.page_queue.ack(&payload).await;
                return;
            }
        };

        let span = info_span!("job", worker_id, queue = "pageGeneration", job_id = job.page_id, attempt = job.attempt);
        async {
            if let Err(error) = job.validate() {
                self.fail_job(&self.page_queue, &payload, job, JobError::Validation(error)).await;
                return;
            }

            let timeout = match job.action {
                Action::Scrape => self.config.scrape_job_timeout,
                Action::AiGenerate => self.config.llm_job_timeout,
            };

            let result = tokio::time::timeout(timeout, async {
                match job.action {
                    Action::Scrape => {
                        handlers::scrape::handle(&job, &self.store, &self.scraper, &self.writer).await
                    }
                    Action::AiGenerate => {
                        handlers::ai_generate::handle(&job, &self.store, &self.fast, &self.llm, &self.writer).await
                    }
                }
            })
            .await;

            match result {
                Ok(Ok(())) => {
                    let _ = self.page_queue.ack(&payload).await;
                    info!("page-generation job completed");
                }
                Ok(Err(error)) => self.fail_job(&self.page_queue, &payload, job, error).await,
                Err(_) => self.fail_job(&self.page_queue, &payload, job, JobError::Timeout).await,
            }
        }
        .instrument(span)
        .await;
    }

    async fn process_source_job(&self, worker_id: usize, payload: String) {
        let job: SourceSyncJob = match serde_json::from_str(&payload) {
            Ok(job) => job,
            Err(error) => {
                warn!(worker_id, %error, "dropping unparseable source-sync payload");
                let _ = self.source_queue.ack(&payload).await;
                return;
            }
        };

        let span = info_span!("job", worker_id, queue = "blacklistSync", source_id = job.source_id, attempt = job.attempt);
        async {
            let result = tokio::time::timeout(
                self.config.scrape_job_timeout,
                handlers::source_sync::handle(&job, &self.store, &self.source_sync, &self.scraper),
            )
            .await;

            match result {
                Ok(Ok(())) => {
                    let _ = self.source_queue.ack(&payload).await;
                    info!("source-sync job completed");
                }
                Ok(Err(error)) => self.fail_job(&self.source_queue, &payload, job, error).await,
                Err(_) => self.fail_job(&self.source_queue, &payload, job, JobError::Timeout).await,
            }
        }
        .instrument(span)
        .await;
    }

    async fn process_domain_job(&self, worker_id: usize, payload: String) {
        let job: DomainVerifyJob = match serde_json::from_str(&payload) {
            Ok(job) => job,
            Err(error) => {
                warn!(worker_id, %error, "dropping unparseable domain-verify payload");
                let _ = self.domain_queue.ack(&payload).await;
                return;
            }
        };

        let span = info_span!("job", worker_id, queue = "domainVerify", offer_id = job.offer_id, attempt = job.attempt);
        let timeout = self.config.dns_lookup_timeout + self.config.http_verify_timeout;
        async {
            let result = tokio::time::timeout(
                timeout,
                handlers::domain_verify::handle(&job, &self.store, &self.fast, &self.dns, &self.verifier),
            )
            .await;

            match result {
                Ok(Ok(())) => {
                    let _ = self.domain_queue.ack(&payload).await;
                    info!("domain-verify job completed");
                }
                Ok(Err(error)) => self.fail_job(&self.domain_queue, &payload, job, error).await,
                Err(_) => self.fail_job(&self.domain_queue, &payload, job, JobError::Timeout).await,
            }
        }
        .instrument(span)
        .await;
    }

    async fn fail_job<T>(&self, queue: &ReliableQueue, old_payload: &str, job: T, error: JobError)
    where
        T: crate::queue::JobAttempt + serde::Serialize,
    {
        warn!(%error, "job handler returned an error");
        match queue.fail(old_payload, job, &error).await {
            Ok(FailOutcome::Retried { delay }) => {
                info!(delay_secs = delay.as_secs(), "job scheduled for retry");
            }
            Ok(FailOutcome::DeadLettered) => {
                warn!("job moved to dead-letter queue");
            }
            Err(requeue_error) => {
                error!(%requeue_error, "failed to record job failure in the queue");
            }
        }
    }
}
