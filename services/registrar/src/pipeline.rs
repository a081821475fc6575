//! Drain cycle orchestration
//!
//! One cycle: receive → validate → resolve/price (fan-out per message) → gas check →
//! submit one batch → acknowledge. Messages whose outcome is already final (invalid,
//! already registered, conflicting) are deleted while the submission runs; messages that
//! needed a registration are deleted only after that registration was submitted.

use std::sync::Arc;
use std::time::Duration;

use adapter_service::{FeeProvider, NameLedger, PriceProvider, QueueTransport};
use config::service::gas::SAFE_LOW_UNITS_PER_GWEI;
use config::RegistrarConfig;
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use types::{parse_registration_request, Decimal, PendingRegistration, RawMessage, RegistrationRequest, ValidationPolicy};

use crate::acknowledger::{AcknowledgeSummary, Acknowledger};
use crate::aggregator::{BatchAggregator, SubmittedBatch};
use crate::dedup::{check_registration, DedupOutcome};
use crate::error::{PipelineError, Result};
use crate::gas_guard::GasPriceGuard;
use crate::price_cache::PriceCache;

/// External systems the pipeline drives
#[derive(Clone)]
pub struct Collaborators {
    pub queue: Arc<dyn QueueTransport>,
    pub ledger: Arc<dyn NameLedger>,
    pub prices: Arc<dyn PriceProvider>,
    pub fees: Arc<dyn FeeProvider>,
}

/// Policy values of one pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub validation: ValidationPolicy,
    pub chain_id: u64,
    pub price_freshness: Duration,
    pub max_gas_price_gwei: Decimal,
    pub safe_low_units_per_gwei: Decimal,
    pub registration_disabled: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let defaults = RegistrarConfig::default();
        Self {
            validation: ValidationPolicy::default(),
            chain_id: defaults.ledger.chain_id,
            price_freshness: Duration::from_secs(defaults.pricing.freshness_secs),
            max_gas_price_gwei: defaults.gas.max_gas_price_gwei,
            safe_low_units_per_gwei: Decimal::from(SAFE_LOW_UNITS_PER_GWEI),
            registration_disabled: false,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &RegistrarConfig) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            validation: ValidationPolicy::new(
                &config.validation.domain_suffix,
                config.validation.max_dollars,
            )?,
            chain_id: config.ledger.chain_id,
            price_freshness: Duration::from_secs(config.pricing.freshness_secs),
            max_gas_price_gwei: config.gas.max_gas_price_gwei,
            safe_low_units_per_gwei: Decimal::from(SAFE_LOW_UNITS_PER_GWEI),
            registration_disabled: config.features.registration_disabled,
        })
    }
}

/// What happened to the registration-needing messages of a cycle
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// No message needed a registration
    NothingToRegister,
    /// Registration is switched off; those messages stay queued
    Disabled,
    Submitted(SubmittedBatch),
    /// Price, fee or submission failure; those messages stay queued
    Aborted(PipelineError),
}

impl SubmissionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SubmissionOutcome::Aborted(_))
    }
}

/// Per-cycle accounting
#[derive(Debug)]
pub struct CycleReport {
    pub received: usize,
    pub invalid: usize,
    pub already_satisfied: usize,
    pub conflicts: usize,
    /// Left on the queue: transient lookups, unsubmitted registrations, failed deletes
    pub retained: usize,
    pub acknowledged: usize,
    pub delete_failures: usize,
    pub submission: SubmissionOutcome,
    pub acknowledge_errors: Vec<PipelineError>,
}

impl CycleReport {
    fn empty() -> Self {
        Self {
            received: 0,
            invalid: 0,
            already_satisfied: 0,
            conflicts: 0,
            retained: 0,
            acknowledged: 0,
            delete_failures: 0,
            submission: SubmissionOutcome::NothingToRegister,
            acknowledge_errors: Vec::new(),
        }
    }

    /// The receive returned nothing
    pub fn is_idle(&self) -> bool {
        self.received == 0
    }

    /// One summary line for a cycle that received messages
    pub fn log_summary(&self) {
        if self.is_idle() {
            return;
        }

        let submission = match &self.submission {
            SubmissionOutcome::NothingToRegister => "nothing to register".to_string(),
            SubmissionOutcome::Disabled => "registration disabled".to_string(),
            SubmissionOutcome::Submitted(batch) => format!("submitted {:?}", batch.tx_hash),
            SubmissionOutcome::Aborted(e) => format!("aborted: {e}"),
        };

        info!(
            received = self.received,
            invalid = self.invalid,
            already_satisfied = self.already_satisfied,
            conflicts = self.conflicts,
            retained = self.retained,
            acknowledged = self.acknowledged,
            delete_failures = self.delete_failures,
            %submission,
            "📊 Drain cycle complete"
        );
    }

    fn record_acknowledgment(&mut self, summary: AcknowledgeSummary) {
        self.acknowledged += summary.acknowledged;
        self.delete_failures += summary.failed;
        self.retained += summary.failed;
        self.acknowledge_errors.extend(summary.errors);
    }
}

/// Per-message result of the resolve/price stage
enum Triage<'a> {
    Satisfied(&'a RawMessage),
    Conflict(&'a RawMessage),
    Register(&'a RawMessage, PendingRegistration),
    /// Disabled mode: needs registration but none will be attempted
    Deferred,
    Retained,
    PriceFailed(PipelineError),
}

pub struct RegistrarPipeline {
    queue: Arc<dyn QueueTransport>,
    ledger: Arc<dyn NameLedger>,
    prices: PriceCache,
    gas_guard: GasPriceGuard,
    aggregator: BatchAggregator,
    acknowledger: Acknowledger,
    settings: PipelineSettings,
}

impl RegistrarPipeline {
    pub fn new(collaborators: Collaborators, settings: PipelineSettings) -> Self {
        let Collaborators {
            queue,
            ledger,
            prices,
            fees,
        } = collaborators;

        Self {
            prices: PriceCache::new(prices, settings.price_freshness),
            gas_guard: GasPriceGuard::new(
                fees,
                settings.max_gas_price_gwei,
                settings.safe_low_units_per_gwei,
            ),
            aggregator: BatchAggregator::new(ledger.clone(), settings.chain_id),
            acknowledger: Acknowledger::new(queue.clone()),
            queue,
            ledger,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Receive one batch and process it to completion
    ///
    /// Only a failed receive is returned as `Err`; every later failure is recorded in the
    /// report so partial progress (deleted messages) is never lost.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let messages = self
            .queue
            .receive_batch()
            .await
            .map_err(PipelineError::Receive)?;
        Ok(self.process_batch(&messages).await)
    }

    /// Run cycles until `shutdown` turns true or its sender is dropped
    ///
    /// Shutdown is observed between cycles only. A cycle that has submitted a transaction
    /// always goes on to delete the messages it paid for. Returns the number of cycles run.
    pub async fn drain(
        &self,
        mut shutdown: watch::Receiver<bool>,
        idle_delay: Duration,
        error_delay: Duration,
    ) -> usize {
        let mut cycles = 0;
        while !*shutdown.borrow() {
            let delay = match self.run_cycle().await {
                Ok(report) => {
                    report.log_summary();
                    report.is_idle().then_some(idle_delay)
                }
                Err(e) => {
                    error!(error = %e, "Drain cycle failed");
                    Some(error_delay)
                }
            };
            cycles += 1;

            if let Some(delay) = delay {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        cycles
    }

    /// Process an already received batch
    pub async fn process_batch(&self, messages: &[RawMessage]) -> CycleReport {
        let mut report = CycleReport::empty();
        report.received = messages.len();
        if messages.is_empty() {
            return report;
        }
        debug!(count = messages.len(), "processing batch");

        let mut settled: Vec<&RawMessage> = Vec::new();
        let mut valid: Vec<(&RawMessage, RegistrationRequest)> = Vec::new();

        for message in messages {
            match parse_registration_request(&message.body, &self.settings.validation) {
                Ok(request) => valid.push((message, request)),
                Err(e) => {
                    warn!(message_id = %message.message_id, kind = e.kind(), error = %e, "🚫 Discarding invalid message");
                    report.invalid += 1;
                    settled.push(message);
                }
            }
        }

        let triaged = join_all(
            valid
                .iter()
                .map(|(message, request)| self.triage(message, request)),
        )
        .await;

        let mut to_register: Vec<(&RawMessage, PendingRegistration)> = Vec::new();
        let mut price_failure: Option<PipelineError> = None;
        let mut deferred = 0usize;

        for triage in triaged {
            match triage {
                Triage::Satisfied(message) => {
                    report.already_satisfied += 1;
                    settled.push(message);
                }
                Triage::Conflict(message) => {
                    report.conflicts += 1;
                    settled.push(message);
                }
                Triage::Register(message, pending) => to_register.push((message, pending)),
                Triage::Deferred => deferred += 1,
                Triage::Retained => report.retained += 1,
                Triage::PriceFailed(e) => {
                    price_failure.get_or_insert(e);
                    report.retained += 1;
                }
            }
        }

        let (terminal_ack, submission) = tokio::join!(
            self.acknowledger.acknowledge(&settled),
            self.submission_stage(&to_register, price_failure, deferred),
        );
        report.record_acknowledgment(terminal_ack);

        match &submission {
            SubmissionOutcome::Submitted(_) => {
                let registered: Vec<&RawMessage> =
                    to_register.iter().map(|(message, _)| *message).collect();
                let summary = self.acknowledger.acknowledge(&registered).await;
                report.record_acknowledgment(summary);
            }
            SubmissionOutcome::Aborted(_) | SubmissionOutcome::Disabled => {
                report.retained += to_register.len() + deferred;
            }
            SubmissionOutcome::NothingToRegister => {}
        }
        report.submission = submission;
        report
    }

    async fn triage<'a>(&self, message: &'a RawMessage, request: &RegistrationRequest) -> Triage<'a> {
        let outcome = match check_registration(self.ledger.as_ref(), request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(message_id = %message.message_id, name = %request.name, error = %e, "Lookup failed, leaving message for next cycle");
                return Triage::Retained;
            }
        };

        match outcome {
            DedupOutcome::AlreadySatisfied => {
                info!(message_id = %message.message_id, name = %request.name, "✅ Name already registered to requested address");
                Triage::Satisfied(message)
            }
            DedupOutcome::Conflict { current } => {
                error!(
                    message_id = %message.message_id,
                    name = %request.name,
                    requested = ?request.target_address,
                    current = ?current,
                    "⚠️ Name registered to a different address, discarding request"
                );
                Triage::Conflict(message)
            }
            DedupOutcome::NeedsRegistration if self.settings.registration_disabled => {
                info!(message_id = %message.message_id, name = %request.name, "Registration disabled, leaving message queued");
                Triage::Deferred
            }
            DedupOutcome::NeedsRegistration => {
                match self.prices.dollars_to_wei(request.dollar_amount).await {
                    Ok(wei) => Triage::Register(
                        message,
                        PendingRegistration::new(message.message_id.clone(), request, wei),
                    ),
                    Err(e) => {
                        debug!(message_id = %message.message_id, name = %request.name, error = %e, "price conversion failed");
                        Triage::PriceFailed(e)
                    }
                }
            }
        }
    }

    async fn submission_stage(
        &self,
        to_register: &[(&RawMessage, PendingRegistration)],
        price_failure: Option<PipelineError>,
        deferred: usize,
    ) -> SubmissionOutcome {
        if deferred > 0 {
            return SubmissionOutcome::Disabled;
        }
        if let Some(e) = price_failure {
            error!(error = %e, "💥 Spot price unavailable, skipping registration this cycle");
            return SubmissionOutcome::Aborted(e);
        }
        if to_register.is_empty() {
            return SubmissionOutcome::NothingToRegister;
        }

        let gas_price = match self.gas_guard.safe_gas_price().await {
            Ok(price) => price,
            Err(e) => {
                error!(error = %e, "💥 Fee check failed, skipping registration this cycle");
                return SubmissionOutcome::Aborted(e);
            }
        };

        let pending: Vec<PendingRegistration> =
            to_register.iter().map(|(_, pending)| pending.clone()).collect();
        match self.aggregator.submit(&pending, gas_price.wei).await {
            Ok(Some(batch)) => SubmissionOutcome::Submitted(batch),
            Ok(None) => SubmissionOutcome::NothingToRegister,
            Err(e) => SubmissionOutcome::Aborted(e),
        }
    }
}
