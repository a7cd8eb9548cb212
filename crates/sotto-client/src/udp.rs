//! UDP voice transport.
//!
//! One socket lives for the whole client: voice continuity across control
//! reconnects only requires the server to see the same source port. The
//! socket gets enlarged kernel buffers so voice bursts survive scheduling
//! hiccups without drops.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use sotto_proto::voice::MAX_DATAGRAM;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Kernel buffer size for both directions.
const SOCKET_BUFFER: usize = 2 * 1024 * 1024;

/// Bind an ephemeral dual-purpose voice socket.
pub(crate) fn bind_voice_socket() -> io::Result<Arc<UdpSocket>> {
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    let _ = socket.set_recv_buffer_size(SOCKET_BUFFER);
    let _ = socket.set_send_buffer_size(SOCKET_BUFFER);

    let bind_addr: SocketAddr = "0.0.0.0:0".parse().expect("literal socket address");
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;

    let socket = UdpSocket::from_std(socket.into())?;
    Ok(Arc::new(socket))
}

/// Spawn the receive task: forwards every datagram within the size budget
/// to the connection task.
pub(crate) fn spawn_receiver(
    socket: Arc<UdpSocket>,
    datagrams: mpsc::Sender<Vec<u8>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // One spare byte so oversized datagrams are detectable.
        let mut buf = vec![0u8; MAX_DATAGRAM + 1];

        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, _from)) => {
                    if len > MAX_DATAGRAM {
                        trace!(len, "dropping oversized datagram");
                        continue;
                    }
                    if datagrams.send(buf[..len].to_vec()).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    debug!(%e, "udp receive failed");
                }
            }
        }
    })
}

/// Best-effort datagram send; voice is lossy, so a full socket buffer drops
/// the packet rather than blocking the connection task.
pub(crate) fn send_datagram(socket: &UdpSocket, target: SocketAddr, data: &[u8]) {
    if data.len() > MAX_DATAGRAM {
        trace!(len = data.len(), "refusing oversized datagram");
        return;
    }

    if let Err(e) = socket.try_send_to(data, target) {
        trace!(%e, "udp send dropped");
    }
}
