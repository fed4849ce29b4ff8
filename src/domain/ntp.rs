use chrono::{DateTime, TimeDelta, Utc};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::NtpmanError;
use crate::ntp::{NtpHeader, from_ntp_timestamp};

/// One configured server and what was learned about it on the last poll.
#[derive(Clone, Debug)]
pub struct Target {
    /// Target as written in the configuration.
    pub name: String,
    /// Endpoint the requests are sent to.
    pub addr: SocketAddr,
    pub send_time: Option<DateTime<Utc>>,
    pub recv_time: Option<DateTime<Utc>>,
    /// Address the last reply came from.
    pub responder: Option<SocketAddr>,
    /// Reverse DNS names of the responder.
    pub names: Vec<String>,
}

impl Target {
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            addr,
            send_time: None,
            recv_time: None,
            responder: None,
            names: Vec::new(),
        }
    }

    /// Stamp the send time of a new exchange and forget the previous reply.
    pub(crate) fn begin_exchange(&mut self, now: DateTime<Utc>) {
        self.send_time = Some(now);
        self.recv_time = None;
    }

    pub(crate) fn record(&mut self, result: &QueryResult) {
        self.send_time = Some(result.sent_at);
        self.recv_time = Some(result.received_at);
        self.responder = Some(result.responder);
    }
}

/// Decoded reply of one exchange with locally measured timing.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub header: NtpHeader,
    pub responder: SocketAddr,
    /// Monotonic receive instant minus send instant.
    pub rtt: Duration,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn rtt_ms(&self) -> f64 {
        self.rtt.as_secs_f64() * 1000.0
    }

    /// Clock offset of this single exchange, `((T2-T1)+(T3-T4))/2`.
    ///
    /// Positive means the local clock is behind the server.
    pub fn offset_ms(&self) -> f64 {
        let (t1, t2, t3, t4) = self.timestamps();
        delta_ms((t2 - t1) + (t3 - t4)) / 2.0
    }

    /// Network delay of this exchange, `(T4-T1)-(T3-T2)`.
    pub fn delay_ms(&self) -> f64 {
        let (t1, t2, t3, t4) = self.timestamps();
        delta_ms((t4 - t1) - (t3 - t2))
    }

    fn timestamps(&self) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
        (
            self.sent_at,
            from_ntp_timestamp(self.header.receive_timestamp),
            from_ntp_timestamp(self.header.transmit_timestamp),
            self.received_at,
        )
    }
}

fn delta_ms(d: TimeDelta) -> f64 {
    match d.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e6,
        None => d.num_milliseconds() as f64,
    }
}

/// Outcome of polling one target, as handed to a reporter.
#[derive(Debug)]
pub struct PollReport {
    /// Zero-based pass over the target list.
    pub pass: u32,
    /// Position of the target in the configuration.
    pub index: usize,
    pub target: String,
    /// Address the reply came from, `None` on failure.
    pub responder: Option<SocketAddr>,
    /// Reverse DNS names of the responder, empty when unknown.
    pub names: Vec<String>,
    pub outcome: Result<QueryResult, NtpmanError>,
}

impl PollReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
