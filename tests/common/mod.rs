#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use ntpman::ntp::{LeapIndicator, Mode, NtpHeader};
use ntpman::to_ntp_timestamp;
use tokio::net::UdpSocket;

/// How a fake server answers requests.
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    Respond,
    /// Answer after the given pause.
    Late(Duration),
    /// Swallow every request.
    Silent,
    /// Answer with a truncated datagram.
    Short(usize),
}

pub fn reply_to(request: &NtpHeader) -> NtpHeader {
    let now = to_ntp_timestamp(Utc::now()).unwrap();
    NtpHeader {
        leap: LeapIndicator::NoWarning,
        version: request.version,
        mode: Mode::Server,
        stratum: 2,
        poll: request.poll,
        precision: -20,
        root_delay: 0x0000_0800,
        root_dispersion: 0x0000_1000,
        reference_id: u32::from_be_bytes([192, 0, 2, 10]),
        reference_timestamp: now,
        originate_timestamp: request.transmit_timestamp,
        receive_timestamp: now,
        transmit_timestamp: now,
    }
}

/// Spawn a fake NTP server on an ephemeral loopback port.
pub async fn fake_server(behavior: Behavior) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    serve(socket, behavior)
}

/// Same as [`fake_server`] on `[::1]`, or `None` without IPv6 loopback.
pub async fn fake_server_v6(behavior: Behavior) -> Option<SocketAddr> {
    let socket = UdpSocket::bind("[::1]:0").await.ok()?;
    Some(serve(socket, behavior))
}

fn serve(socket: UdpSocket, behavior: Behavior) -> SocketAddr {
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let Ok(request) = NtpHeader::decode(&buf[..len]) else {
                continue;
            };
            match behavior {
                Behavior::Respond => {
                    let _ = socket.send_to(&reply_to(&request).encode(), from).await;
                }
                Behavior::Late(pause) => {
                    tokio::time::sleep(pause).await;
                    let _ = socket.send_to(&reply_to(&request).encode(), from).await;
                }
                Behavior::Silent => {}
                Behavior::Short(n) => {
                    let _ = socket.send_to(&reply_to(&request).encode()[..n], from).await;
                }
            }
        }
    });
    addr
}
