use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

use crate::domain::ntp::{QueryResult, Target};
use crate::error::NtpmanError;
use crate::ntp::{NtpHeader, to_ntp_timestamp};

/// Large enough for jumbo frames; anything past the header is ignored.
const RECV_BUFFER_SIZE: usize = 9000;

/// Runs request/response exchanges over one UDP socket per address family.
///
/// [`QueryEngine::query`] borrows the engine mutably, so only one exchange can
/// be in flight at a time.
pub struct QueryEngine {
    v4: Option<UdpSocket>,
    v6: Option<UdpSocket>,
}

impl QueryEngine {
    /// Bind the wildcard addresses. `port` of `None` picks an ephemeral port.
    ///
    /// With `ipv6_only` only an IPv6 socket is bound. Otherwise the IPv4
    /// socket is required and the IPv6 one is bound when the host supports it.
    pub async fn bind(port: Option<u16>, ipv6_only: bool) -> Result<Self, NtpmanError> {
        let port = port.unwrap_or(0);
        let v6_addr = SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), port);
        if ipv6_only {
            let v6 = bind_udp(v6_addr)?;
            debug!(local = ?v6.local_addr().ok(), "socket bound");
            return Ok(Self {
                v4: None,
                v6: Some(v6),
            });
        }

        let v4 = bind_udp(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port))?;
        debug!(local = ?v4.local_addr().ok(), "socket bound");
        let v6 = match bind_udp(v6_addr) {
            Ok(v6) => {
                debug!(local = ?v6.local_addr().ok(), "socket bound");
                Some(v6)
            }
            Err(e) => {
                warn!(error = %e, "IPv6 unavailable, IPv6 targets will fail");
                None
            }
        };
        Ok(Self { v4: Some(v4), v6 })
    }

    /// Address of the IPv4 socket, or of the IPv6 one when IPv4 is not bound.
    pub fn local_addr(&self) -> Result<SocketAddr, NtpmanError> {
        let socket = self.v4.as_ref().or(self.v6.as_ref()).ok_or_else(|| {
            NtpmanError::Other("no socket bound".into())
        })?;
        Ok(socket.local_addr()?)
    }

    fn socket_for(&self, addr: SocketAddr) -> Result<&UdpSocket, NtpmanError> {
        let (socket, family) = match addr.ip() {
            IpAddr::V4(_) => (self.v4.as_ref(), "IPv4"),
            IpAddr::V6(_) => (self.v6.as_ref(), "IPv6"),
        };
        socket.ok_or_else(|| NtpmanError::Network(format!("send to {addr}: no {family} socket")))
    }

    /// Send one client request to `target` and wait up to `timeout` for its
    /// reply.
    ///
    /// Datagrams from other sources, or replies whose originate timestamp does
    /// not echo this request, are dropped and the wait continues. A late reply
    /// to an earlier exchange is therefore never mistaken for this one. No
    /// retry is attempted on timeout.
    #[instrument(skip(self, target, timeout), fields(target = %target.name, addr = %target.addr))]
    pub async fn query(
        &mut self,
        target: &Target,
        timeout: Duration,
    ) -> Result<QueryResult, NtpmanError> {
        let sent_at = Utc::now();
        let started = Instant::now();
        let transmit = to_ntp_timestamp(sent_at)?;
        let request = NtpHeader::request(transmit).encode();

        let (header, responder, rtt, received_at) = tokio::time::timeout(
            timeout,
            self.exchange(&request, target.addr, transmit, started),
        )
        .await
        .map_err(|_| NtpmanError::QueryTimeout(timeout))??;

        debug!(%responder, ?rtt, stratum = header.stratum, "reply accepted");
        Ok(QueryResult {
            header,
            responder,
            rtt,
            sent_at,
            received_at,
        })
    }

    async fn exchange(
        &self,
        request: &[u8],
        addr: SocketAddr,
        transmit: u64,
        started: Instant,
    ) -> Result<(NtpHeader, SocketAddr, Duration, DateTime<Utc>), NtpmanError> {
        let socket = self.socket_for(addr)?;
        let sent = socket
            .send_to(request, addr)
            .await
            .map_err(|e| NtpmanError::Network(format!("send to {addr}: {e}")))?;
        debug!(bytes = sent, "request sent");

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, from) = socket
                .recv_from(&mut buf)
                .await
                .map_err(|e| NtpmanError::Network(format!("receive: {e}")))?;
            let rtt = started.elapsed();
            let received_at = Utc::now();
            debug!(bytes = len, %from, "datagram received");

            if from.ip().to_canonical() != addr.ip().to_canonical() {
                debug!(%from, "discarding datagram from unexpected source");
                continue;
            }

            let header = NtpHeader::decode(&buf[..len])?;
            if header.originate_timestamp != transmit {
                debug!(
                    originate = header.originate_timestamp,
                    expected = transmit,
                    "discarding reply to another request"
                );
                continue;
            }

            return Ok((header, from, rtt, received_at));
        }
    }
}

/// Non-blocking UDP socket on `addr`. IPv6 sockets are IPv6-only so both
/// families can share one port.
fn bind_udp(addr: SocketAddr) -> Result<UdpSocket, NtpmanError> {
    let bind_err = |e: std::io::Error| NtpmanError::SocketBindFailed(format!("{addr}: {e}"));
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_err)?;
    if addr.is_ipv6() {
        socket.set_only_v6(true).map_err(bind_err)?;
    }
    socket.set_nonblocking(true).map_err(bind_err)?;
    socket.bind(&addr.into()).map_err(bind_err)?;
    UdpSocket::from_std(socket.into()).map_err(bind_err)
}
