//! TCP+TLS control transport.
//!
//! Dialing produces a TLS stream over a TCP socket tuned for real-time
//! audio (Nagle off, keepalive on). The stream is then split into a reader
//! task that reassembles control frames and a writer task that drains an
//! outgoing queue; both report back to the connection task over channels.
//!
//! # TLS Modes
//!
//! - Secure (default): verifies the server certificate against the webpki
//!   roots. Use for deployments with CA-signed certificates.
//! - Insecure: accepts any certificate. Voice servers are routinely run
//!   with self-signed certificates; this mode is the hook point where a
//!   credentials manager with certificate pinning would plug in.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::BytesMut;
use sotto_proto::{Framer, RawFrame};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, error, info};

use crate::error::TransportError;

/// TLS verification mode for the control channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Verify the server certificate against the webpki roots.
    #[default]
    Secure,
    /// Accept any certificate without verification.
    Insecure,
}

/// Events a link's reader task reports to the connection task.
#[derive(Debug)]
pub(crate) enum LinkEvent {
    /// A complete control frame arrived.
    Frame(RawFrame),
    /// The stream ended; carries the reason for logging.
    Closed(String),
}

/// Dial the server and complete the TLS handshake.
pub(crate) async fn connect_tls(
    host: &str,
    addr: SocketAddr,
    mode: TlsMode,
    server_name: Option<&str>,
) -> Result<TlsStream<TcpStream>, TransportError> {
    let tcp = TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::Connection(format!("tcp connect to {addr}: {e}")))?;

    // Real-time audio: no nagling, and keepalive so half-dead NAT paths
    // surface as errors instead of stalls.
    tcp.set_nodelay(true)
        .map_err(|e| TransportError::Connection(format!("set nodelay: {e}")))?;
    socket2::SockRef::from(&tcp)
        .set_tcp_keepalive(&socket2::TcpKeepalive::new())
        .map_err(|e| TransportError::Connection(format!("set keepalive: {e}")))?;

    let connector = TlsConnector::from(Arc::new(tls_config(mode)));
    let sni = server_name.unwrap_or(host);
    let name = if let Ok(ip) = sni.parse::<IpAddr>() {
        rustls::pki_types::ServerName::IpAddress(ip.into())
    } else {
        rustls::pki_types::ServerName::try_from(sni.to_string())
            .map_err(|e| TransportError::Tls(format!("invalid server name {sni:?}: {e}")))?
    };

    let tls = connector
        .connect(name, tcp)
        .await
        .map_err(|e| TransportError::Tls(format!("handshake with {addr}: {e}")))?;

    info!(%addr, "tls session active");
    Ok(tls)
}

fn tls_config(mode: TlsMode) -> rustls::ClientConfig {
    match mode {
        TlsMode::Secure => {
            let roots = rustls::RootCertStore::from_iter(
                webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
            );
            rustls::ClientConfig::builder().with_root_certificates(roots).with_no_client_auth()
        }
        TlsMode::Insecure => rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(InsecureCertVerifier))
            .with_no_client_auth(),
    }
}

/// Split a stream into reader/writer tasks.
///
/// Returns the outgoing-frame queue and the task handles. The reader
/// reassembles control frames and forwards them as [`LinkEvent::Frame`];
/// stream end, read errors, and framing violations all surface as a single
/// [`LinkEvent::Closed`]. The writer drains its queue and sends a TLS
/// close-notify when the queue is dropped.
///
/// Generic over the stream so tests can drive it with an in-memory duplex.
pub(crate) fn spawn_link<S>(
    stream: S,
    generation: u64,
    events: mpsc::Sender<(u64, LinkEvent)>,
) -> (mpsc::Sender<Vec<u8>>, Vec<JoinHandle<()>>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (outgoing_tx, outgoing_rx) = mpsc::channel::<Vec<u8>>(64);

    let reader = tokio::spawn(read_loop(read_half, generation, events));
    let writer = tokio::spawn(write_loop(write_half, outgoing_rx));

    (outgoing_tx, vec![reader, writer])
}

async fn read_loop<R: AsyncRead + Send + Unpin>(
    mut read_half: R,
    generation: u64,
    events: mpsc::Sender<(u64, LinkEvent)>,
) {
    let mut framer = Framer::new();
    let mut buf = BytesMut::with_capacity(8192);

    let reason = loop {
        match read_half.read_buf(&mut buf).await {
            Ok(0) => break "server closed the connection".to_string(),
            Ok(_) => {}
            Err(e) => break format!("read error: {e}"),
        }

        framer.extend(&buf.split().freeze());

        loop {
            match framer.next_frame() {
                Ok(Some(frame)) => {
                    if events.send((generation, LinkEvent::Frame(frame))).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    // No resync point exists in the stream; drop the link.
                    error!(%e, "control stream violated framing");
                    let _ = events.send((generation, LinkEvent::Closed(e.to_string()))).await;
                    return;
                }
            }
        }
    };

    debug!(%reason, "control link ended");
    let _ = events.send((generation, LinkEvent::Closed(reason))).await;
}

async fn write_loop<W: AsyncWrite + Send + Unpin>(
    mut write_half: W,
    mut outgoing: mpsc::Receiver<Vec<u8>>,
) {
    while let Some(data) = outgoing.recv().await {
        if let Err(e) = write_half.write_all(&data).await {
            error!(%e, "control write failed");
            break;
        }
    }

    // Queue dropped or write failed: close the stream gracefully so the
    // server sees a clean disconnect.
    let _ = write_half.shutdown().await;
}

/// Certificate verifier that accepts anything. The pinning hook point; do
/// not use against untrusted networks.
#[derive(Debug)]
struct InsecureCertVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
