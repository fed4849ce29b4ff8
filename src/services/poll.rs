use std::ops::ControlFlow;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, instrument};

use crate::adapters::ntp_client::QueryEngine;
use crate::adapters::reverse::ReverseResolver;
use crate::domain::ntp::{PollReport, Target};

/// Pacing of a [`PollLoop`].
#[derive(Clone, Debug, PartialEq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub delay: Duration,
    /// `None` polls until the reporter stops the loop.
    pub passes: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            delay: Duration::from_secs(1),
            passes: None,
        }
    }
}

/// Consumer of poll reports. Returning `Break` ends the loop.
pub trait Reporter {
    fn report(&mut self, report: PollReport) -> ControlFlow<()>;
}

impl Reporter for Vec<PollReport> {
    fn report(&mut self, report: PollReport) -> ControlFlow<()> {
        self.push(report);
        ControlFlow::Continue(())
    }
}

impl Reporter for UnboundedSender<PollReport> {
    fn report(&mut self, report: PollReport) -> ControlFlow<()> {
        match self.send(report) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

/// Queries every target in configuration order, one at a time.
pub struct PollLoop {
    engine: QueryEngine,
    targets: Vec<Target>,
    settings: PollSettings,
    reverse: Option<ReverseResolver>,
}

impl PollLoop {
    pub fn new(engine: QueryEngine, targets: Vec<Target>, settings: PollSettings) -> Self {
        Self {
            engine,
            targets,
            settings,
            reverse: None,
        }
    }

    /// Look up responder names after each successful exchange.
    pub fn with_reverse_resolver(mut self, reverse: ReverseResolver) -> Self {
        self.reverse = Some(reverse);
        self
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Poll until the configured number of passes is done or `reporter`
    /// breaks. Returns the number of completed passes.
    ///
    /// A failed target is reported like any other outcome; the next target is
    /// still polled. The delay is slept after every target except the very
    /// last one of a finite run.
    #[instrument(skip_all, fields(targets = self.targets.len()))]
    pub async fn run<R: Reporter + ?Sized>(&mut self, reporter: &mut R) -> u32 {
        if self.targets.is_empty() {
            return 0;
        }

        let mut pass = 0u32;
        while self.settings.passes.is_none_or(|limit| pass < limit) {
            for index in 0..self.targets.len() {
                let report = self.poll_target(pass, index).await;
                if reporter.report(report).is_break() {
                    debug!(pass, index, "reporter stopped the loop");
                    return pass;
                }

                let finished = index + 1 == self.targets.len()
                    && self.settings.passes == Some(pass + 1);
                if !finished && !self.settings.delay.is_zero() {
                    tokio::time::sleep(self.settings.delay).await;
                }
            }
            pass += 1;
        }
        pass
    }

    async fn poll_target(&mut self, pass: u32, index: usize) -> PollReport {
        let timeout = self.settings.timeout;
        self.targets[index].begin_exchange(Utc::now());
        let outcome = self.engine.query(&self.targets[index], timeout).await;

        let target = &mut self.targets[index];
        let mut names = Vec::new();
        match &outcome {
            Ok(result) => {
                target.record(result);
                if let Some(reverse) = &self.reverse {
                    names = reverse.lookup(result.responder.ip(), timeout).await;
                }
                target.names = names.clone();
            }
            Err(e) => debug!(target = %target.name, error = %e, "query failed"),
        }

        PollReport {
            pass,
            index,
            target: target.name.clone(),
            responder: outcome.as_ref().ok().map(|r| r.responder),
            names,
            outcome,
        }
    }
}
