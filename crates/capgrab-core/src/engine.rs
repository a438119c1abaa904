//! Acquisition engine
//!
//! Drives the attempt loop of one launch plan: pick a zone, issue a create
//! call, classify failures, back off, and hand every created instance to
//! the readiness waiter. All mutable state lives in the run itself, so any
//! number of engines can share one gateway and one notifier.
//!
//! ```text
//! AttemptPending ─┬─ Success ─► readiness ─► next target ─► TargetReached
//!                 └─ Failure ─┬─ RetrySameCycle ─► AttemptPending
//!                             └─ CycleExhausted ─┬─► AttemptPending
//!                                                └─► RunExhausted
//! ```

use crate::backoff::{Backoff, DelaySource, RandomDelay};
use crate::classify::{AttemptClass, ClassifierRules};
use crate::error::{EngineError, Result};
use crate::readiness::{ReadinessError, ReadinessWaiter};
use crate::report::{self, Progress, RunFacts};
use crate::retry::PollPolicy;
use crate::rotation::{CycleStep, RotationMode, ZoneRotation};
use capgrab_cloud::{LaunchPlan, LaunchedInstance, ProviderGateway, RetryBudget};
use capgrab_notify::{MessageHandle, Notifier};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Knobs shared by every run of a batch
#[derive(Clone)]
pub struct EngineSettings {
    pub classifier: ClassifierRules,
    pub readiness: PollPolicy,
    pub delay: Arc<dyn DelaySource>,
    /// Send per-target progress messages
    pub notify_each: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            classifier: ClassifierRules::default(),
            readiness: PollPolicy::default(),
            delay: Arc::new(RandomDelay),
            notify_each: true,
        }
    }
}

impl EngineSettings {
    pub fn with_classifier(mut self, classifier: ClassifierRules) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_readiness(mut self, readiness: PollPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn DelaySource>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_notify_each(mut self, notify_each: bool) -> Self {
        self.notify_each = notify_each;
        self
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    TargetReached,
    RunExhausted,
    Cancelled,
}

/// A created instance and what became of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredInstance {
    pub instance: LaunchedInstance,
    pub addresses: Vec<String>,
    /// Why the instance never became ready, if it did not
    pub readiness_error: Option<ReadinessError>,
    /// Terminated again because it never became ready
    pub terminated: bool,
}

impl AcquiredInstance {
    pub fn is_ready(&self) -> bool {
        self.readiness_error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub requested: u32,
    pub succeeded: u32,
    pub attempts: u32,
    pub outcome: RunOutcome,
    pub instances: Vec<AcquiredInstance>,
}

impl RunReport {
    fn new(requested: u32) -> Self {
        Self {
            requested,
            succeeded: 0,
            attempts: 0,
            outcome: RunOutcome::TargetReached,
            instances: Vec::new(),
        }
    }
}

/// Mutable state of one run
struct RunState {
    /// 0-based index of the target being acquired
    pos: u32,
    /// Failures counted against the retry budget for this target
    target_failures: u32,
    target_attempts: u32,
    target_started: Instant,
    successes: u32,
    attempts: u32,
}

impl RunState {
    fn new() -> Self {
        Self {
            pos: 0,
            target_failures: 0,
            target_attempts: 0,
            target_started: Instant::now(),
            successes: 0,
            attempts: 0,
        }
    }

    fn begin_attempt(&mut self) {
        self.attempts += 1;
        self.target_attempts += 1;
    }

    fn advance(&mut self) {
        self.pos += 1;
        self.target_failures = 0;
        self.target_attempts = 0;
        self.target_started = Instant::now();
    }

    fn progress(&self) -> Progress {
        Progress {
            target: self.pos + 1,
            attempts: self.target_attempts,
            elapsed: self.target_started.elapsed(),
        }
    }
}

pub struct AcquisitionEngine {
    gateway: Arc<dyn ProviderGateway>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
    cancel: CancellationToken,
    context: String,
}

impl AcquisitionEngine {
    pub fn new(
        gateway: Arc<dyn ProviderGateway>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            notifier,
            settings,
            cancel,
            context: String::new(),
        }
    }

    /// Label for logs and messages, e.g. `[tokyo/arm]`
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Acquire `plan`'s target count of instances over `zones`
    pub async fn run(&self, plan: &LaunchPlan, zones: Vec<String>) -> Result<RunReport> {
        let sum = plan.effective_sum(zones.len());
        let mut report = RunReport::new(sum);
        if sum == 0 {
            info!("{} Nothing to launch", self.context);
            return Ok(report);
        }

        let mut rotation = ZoneRotation::new(RotationMode::for_plan(plan), zones)?;
        let request = self
            .gateway
            .prepare_launch(plan)
            .await
            .map_err(EngineError::from_prepare)?;

        let facts = RunFacts::new(&request, sum);
        let base_name = if plan.display_name.is_empty() {
            chrono::Local::now()
                .format("instance-%Y%m%d-%H%M")
                .to_string()
        } else {
            plan.display_name.clone()
        };
        let backoff = Backoff::new(plan.min_delay, plan.max_delay, self.settings.delay.clone());

        info!(
            "{} Launching {} x {} ({:?}, image {})",
            self.context,
            sum,
            request.shape.name,
            rotation.mode(),
            request.image_name
        );
        self.notify(&report::attempting(&facts, 1)).await;

        let mut state = RunState::new();
        report.outcome = loop {
            if state.pos >= sum {
                break RunOutcome::TargetReached;
            }
            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            let zone = rotation.select(state.pos, state.target_failures == 0);
            state.begin_attempt();
            let display_name = LaunchPlan::numbered_name(&base_name, state.pos + 1, sum);
            debug!(
                "{} Creating instance {}/{} in {} (attempt {})",
                self.context,
                state.pos + 1,
                sum,
                zone,
                state.target_attempts
            );

            match self
                .gateway
                .create_instance(&request, &zone, &display_name)
                .await
            {
                Ok(instance) => {
                    rotation.record_success();
                    state.successes += 1;
                    let progress = state.progress();
                    info!(
                        "{} Instance {}/{} created in {}: {}",
                        self.context, progress.target, sum, instance.zone, instance.id
                    );

                    let acquired = self.settle(plan, &facts, &progress, instance).await;
                    report.instances.push(acquired);

                    let cancelled = backoff.wait(&self.cancel).await.is_err();
                    state.advance();
                    rotation.reset_for_next_target();
                    if cancelled {
                        break RunOutcome::Cancelled;
                    }
                    if state.pos < sum {
                        self.notify(&report::attempting(&facts, state.pos + 1)).await;
                    }
                }
                Err(error) => {
                    let class = self.settings.classifier.classify(&error);
                    let message = error.summary();
                    let progress = state.progress();
                    warn!(
                        "{} Instance {}/{} attempt {} in {} failed ({:?}): {}",
                        self.context, progress.target, sum, progress.attempts, zone, class, message
                    );
                    self.notify(&report::failed(&facts, &progress, &zone, &message))
                        .await;

                    let cancelled = backoff.wait(&self.cancel).await.is_err();
                    let keep_going = after_failure(&mut rotation, &mut state, plan.retry, class);
                    if cancelled {
                        break RunOutcome::Cancelled;
                    }
                    if !keep_going {
                        warn!(
                            "{} Giving up on instance {}/{} after {} attempts",
                            self.context, progress.target, sum, progress.attempts
                        );
                        break RunOutcome::RunExhausted;
                    }
                }
            }
        };

        report.succeeded = state.successes;
        report.attempts = state.attempts;
        info!(
            "{} Run finished: {:?}, {}/{} acquired in {} attempts",
            self.context, report.outcome, report.succeeded, report.requested, report.attempts
        );
        Ok(report)
    }

    /// Wait for a created instance to become ready and report the result
    async fn settle(
        &self,
        plan: &LaunchPlan,
        facts: &RunFacts,
        progress: &Progress,
        instance: LaunchedInstance,
    ) -> AcquiredInstance {
        let handle = self
            .notify(&report::acquired(facts, progress, &instance))
            .await;

        let waiter = ReadinessWaiter::new(self.settings.readiness);
        let readiness = waiter
            .wait(self.gateway.as_ref(), &instance.id, &self.cancel)
            .await;

        let mut acquired = AcquiredInstance {
            instance,
            addresses: Vec::new(),
            readiness_error: None,
            terminated: false,
        };

        let text = match readiness {
            Ok(addresses) => {
                info!(
                    "{} Instance {} is ready: {}",
                    self.context,
                    acquired.instance.display_name,
                    addresses.join(", ")
                );
                acquired.addresses = addresses;
                report::ready(facts, progress, &acquired.instance, &acquired.addresses)
            }
            Err(error) => {
                warn!(
                    "{} Instance {} not ready: {}",
                    self.context, acquired.instance.display_name, error
                );
                if plan.terminate_unready && matches!(error, ReadinessError::Timeout { .. }) {
                    acquired.terminated = self.terminate(&acquired.instance).await;
                }
                let text =
                    report::not_ready(facts, progress, &acquired.instance, &error.to_string());
                acquired.readiness_error = Some(error);
                text
            }
        };

        self.update(handle, &text).await;
        acquired
    }

    async fn terminate(&self, instance: &LaunchedInstance) -> bool {
        match self.gateway.terminate_instance(&instance.id).await {
            Ok(()) => {
                info!("{} Terminated unready instance {}", self.context, instance.id);
                true
            }
            Err(e) => {
                warn!(
                    "{} Failed to terminate {}: {}",
                    self.context, instance.id, e
                );
                false
            }
        }
    }

    async fn notify(&self, text: &str) -> Option<MessageHandle> {
        if !self.settings.notify_each {
            return None;
        }
        match self.notifier.send(&self.context, text).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("{} Failed to send notification: {}", self.context, e);
                None
            }
        }
    }

    /// Edit the message behind `handle`, or send a new one if it was never sent
    async fn update(&self, handle: Option<MessageHandle>, text: &str) {
        if !self.settings.notify_each {
            return;
        }
        match handle {
            Some(handle) => {
                if let Err(e) = self.notifier.edit(&handle, &self.context, text).await {
                    warn!("{} Failed to edit notification: {}", self.context, e);
                }
            }
            None => {
                self.notify(text).await;
            }
        }
    }
}

/// Apply a failed attempt to the rotation and decide whether to go on
fn after_failure(
    rotation: &mut ZoneRotation,
    state: &mut RunState,
    budget: RetryBudget,
    class: AttemptClass,
) -> bool {
    let round_robin = matches!(rotation.mode(), RotationMode::RoundRobin);
    let step = rotation.record_failure(class);

    if round_robin {
        match step {
            CycleStep::SameCycle => true,
            CycleStep::CycleExhausted => {
                state.target_failures += 1;
                let remaining = rotation.start_new_cycle();
                budget.allows(state.target_failures) && remaining > 0
            }
        }
    } else {
        // The fixed or quota zone is the only candidate
        state.target_failures += 1;
        budget.allows(state.target_failures) && class == AttemptClass::Retryable
    }
}
