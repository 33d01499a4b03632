use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::model::{ResolverConfig, TimingBreakdown, Transport};

const DNS_PORT: u16 = 53;
const DOT_PORT: u16 = 853;

/// Errors raised by a single transport attempt.
///
/// Timeout is distinguished from other I/O failures so the query engine can
/// classify a terminal result as TIMEOUT rather than ERROR.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("attempt timed out after {0:?}")]
	Timeout(Duration),
	#[error("connection failed: {0}")]
	Connect(String),
	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),
	#[error("tls error: {0}")]
	Tls(String),
	#[error("http error: {0}")]
	Http(String),
	#[error("response decode failure: {0}")]
	Decode(String),
	#[error("resolver '{resolver}' does not support transport '{transport}'")]
	Unsupported { resolver: String, transport: Transport },
}

impl TransportError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, TransportError::Timeout(_))
	}
}

/// Raw outcome of one request/response round trip
#[derive(Debug)]
pub struct Exchange {
	/// Undecoded response bytes
	pub wire: Vec<u8>,
	pub timing: TimingBreakdown,
	/// Identity of the endpoint that answered
	pub responder: String,
}

/// One DNS request/response round trip over a specific protocol.
///
/// Implementations enforce the given timeout themselves and report timing
/// split into connection and query phases where the protocol allows it.
#[async_trait]
pub trait DnsTransport: Send + Sync {
	fn transport_type(&self) -> Transport;

	async fn exchange(
		&self,
		query: &[u8],
		timeout: Duration,
	) -> Result<Exchange, TransportError>;
}

/// Build a transport for the given type and resolver.
///
/// Fails fast with Unsupported when the resolver's configuration lacks the
/// data the transport needs; no network I/O happens here.
pub fn build_transport(
	transport: Transport,
	resolver: &ResolverConfig,
) -> Result<Arc<dyn DnsTransport>, TransportError> {
	let unsupported = || TransportError::Unsupported {
		resolver: resolver.name.clone(),
		transport,
	};
	match transport {
		Transport::Udp => {
			let target = SocketAddr::new(IpAddr::V4(resolver.ipv4), DNS_PORT);
			Ok(Arc::new(UdpTransport::new(target)))
		}
		Transport::Tcp => {
			let target = SocketAddr::new(IpAddr::V4(resolver.ipv4), DNS_PORT);
			Ok(Arc::new(TcpTransport::new(target)))
		}
		Transport::Dot => {
			let hostname = resolver.tls_hostname.as_deref().ok_or_else(unsupported)?;
			let target = SocketAddr::new(IpAddr::V4(resolver.ipv4), DOT_PORT);
			Ok(Arc::new(TlsTransport::new(target, hostname)?))
		}
		Transport::Doh => {
			let url = resolver.doh_url.as_deref().ok_or_else(unsupported)?;
			Ok(Arc::new(HttpsTransport::new(url)?))
		}
	}
}

fn elapsed_ms(start: Instant) -> f64 {
	start.elapsed().as_secs_f64() * 1000.0
}

/// Standard DNS over UDP.
///
/// Connectionless: the whole round trip is the query phase and one timeout
/// bounds the entire exchange.
pub struct UdpTransport {
	target: SocketAddr,
}

impl UdpTransport {
	pub fn new(target: SocketAddr) -> Self {
		Self { target }
	}
}

#[async_trait]
impl DnsTransport for UdpTransport {
	fn transport_type(&self) -> Transport {
		Transport::Udp
	}

	async fn exchange(
		&self,
		query: &[u8],
		timeout: Duration,
	) -> Result<Exchange, TransportError> {
		// Dedicated socket per exchange to avoid response stealing between
		// concurrent queries against the same resolver
		let bind_addr = if self.target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
		let socket = UdpSocket::bind(bind_addr).await?;

		let start = Instant::now();
		socket.send_to(query, self.target).await?;

		// Re-receive on txid mismatch until the deadline; stray datagrams
		// from earlier exchanges must not be taken as this query's answer.
		// 4096-byte buffer to handle EDNS-extended responses.
		let mut buf = vec![0u8; 4096];
		loop {
			let elapsed = start.elapsed();
			if elapsed >= timeout {
				return Err(TransportError::Timeout(timeout));
			}
			let remaining = timeout - elapsed;

			let (len, src) = match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
				Ok(Ok(received)) => received,
				Ok(Err(e)) => return Err(TransportError::Io(e)),
				Err(_) => return Err(TransportError::Timeout(timeout)),
			};

			if len >= 2 && query.len() >= 2 && buf[..2] != query[..2] {
				continue;
			}

			let total_ms = elapsed_ms(start);
			return Ok(Exchange {
				wire: buf[..len].to_vec(),
				timing: TimingBreakdown {
					total_ms,
					connection_ms: 0.0,
					query_ms: total_ms,
				},
				responder: src.to_string(),
			});
		}
	}
}

/// Write a length-prefixed request and read one length-prefixed response.
///
/// DNS over stream transports frames both directions with a 2-byte
/// big-endian length prefix.
async fn exchange_framed<S>(
	stream: &mut S,
	query: &[u8],
	timeout: Duration,
) -> Result<Vec<u8>, TransportError>
where
	S: AsyncRead + AsyncWrite + Unpin + Send,
{
	let mut framed = Vec::with_capacity(query.len() + 2);
	framed.extend_from_slice(&(query.len() as u16).to_be_bytes());
	framed.extend_from_slice(query);

	match tokio::time::timeout(timeout, stream.write_all(&framed)).await {
		Ok(Ok(())) => {}
		Ok(Err(e)) => return Err(TransportError::Io(e)),
		Err(_) => return Err(TransportError::Timeout(timeout)),
	}
	match tokio::time::timeout(timeout, stream.flush()).await {
		Ok(Ok(())) => {}
		Ok(Err(e)) => return Err(TransportError::Io(e)),
		Err(_) => return Err(TransportError::Timeout(timeout)),
	}

	let mut length_buf = [0u8; 2];
	match tokio::time::timeout(timeout, stream.read_exact(&mut length_buf)).await {
		Ok(Ok(_)) => {}
		Ok(Err(e)) => return Err(TransportError::Io(e)),
		Err(_) => return Err(TransportError::Timeout(timeout)),
	}
	let length = u16::from_be_bytes(length_buf) as usize;
	if length == 0 {
		return Err(TransportError::Decode("zero-length response frame".to_string()));
	}

	let mut response = vec![0u8; length];
	match tokio::time::timeout(timeout, stream.read_exact(&mut response)).await {
		Ok(Ok(_)) => {}
		Ok(Err(e)) => return Err(TransportError::Io(e)),
		Err(_) => return Err(TransportError::Timeout(timeout)),
	}
	Ok(response)
}

/// DNS over TCP.
///
/// Measures the connect phase separately from the write+read phase.
pub struct TcpTransport {
	target: SocketAddr,
}

impl TcpTransport {
	pub fn new(target: SocketAddr) -> Self {
		Self { target }
	}
}

#[async_trait]
impl DnsTransport for TcpTransport {
	fn transport_type(&self) -> Transport {
		Transport::Tcp
	}

	async fn exchange(
		&self,
		query: &[u8],
		timeout: Duration,
	) -> Result<Exchange, TransportError> {
		let connect_start = Instant::now();
		let mut stream = match tokio::time::timeout(timeout, TcpStream::connect(self.target)).await {
			Ok(Ok(stream)) => stream,
			Ok(Err(e)) => return Err(TransportError::Connect(e.to_string())),
			Err(_) => return Err(TransportError::Timeout(timeout)),
		};
		let connection_ms = elapsed_ms(connect_start);

		let query_start = Instant::now();
		let wire = exchange_framed(&mut stream, query, timeout).await?;
		let query_ms = elapsed_ms(query_start);

		Ok(Exchange {
			wire,
			timing: TimingBreakdown {
				total_ms: connection_ms + query_ms,
				connection_ms,
				query_ms,
			},
			responder: self.target.to_string(),
		})
	}
}

/// DNS over TLS (DoT).
///
/// Stream framing identical to TCP; the connect phase additionally performs
/// a TLS handshake with mandatory hostname verification, and handshake time
/// counts toward connection_ms.
pub struct TlsTransport {
	target: SocketAddr,
	server_name: ServerName<'static>,
	connector: TlsConnector,
}

impl TlsTransport {
	pub fn new(target: SocketAddr, hostname: &str) -> Result<Self, TransportError> {
		let root_store = RootCertStore {
			roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
		};
		let config = ClientConfig::builder()
			.with_root_certificates(root_store)
			.with_no_client_auth();
		let server_name = ServerName::try_from(hostname.to_string())
			.map_err(|e| TransportError::Tls(format!("invalid TLS hostname '{}': {}", hostname, e)))?;
		Ok(Self {
			target,
			server_name,
			connector: TlsConnector::from(Arc::new(config)),
		})
	}
}

#[async_trait]
impl DnsTransport for TlsTransport {
	fn transport_type(&self) -> Transport {
		Transport::Dot
	}

	async fn exchange(
		&self,
		query: &[u8],
		timeout: Duration,
	) -> Result<Exchange, TransportError> {
		let connect_start = Instant::now();
		let tcp = match tokio::time::timeout(timeout, TcpStream::connect(self.target)).await {
			Ok(Ok(stream)) => stream,
			Ok(Err(e)) => return Err(TransportError::Connect(e.to_string())),
			Err(_) => return Err(TransportError::Timeout(timeout)),
		};
		let handshake = self.connector.connect(self.server_name.clone(), tcp);
		let mut stream = match tokio::time::timeout(timeout, handshake).await {
			Ok(Ok(stream)) => stream,
			Ok(Err(e)) => return Err(TransportError::Tls(format!("handshake failed: {}", e))),
			Err(_) => return Err(TransportError::Timeout(timeout)),
		};
		let connection_ms = elapsed_ms(connect_start);

		let query_start = Instant::now();
		let wire = exchange_framed(&mut stream, query, timeout).await?;
		let query_ms = elapsed_ms(query_start);

		Ok(Exchange {
			wire,
			timing: TimingBreakdown {
				total_ms: connection_ms + query_ms,
				connection_ms,
				query_ms,
			},
			responder: self.target.to_string(),
		})
	}
}

/// DNS over HTTPS (DoH).
///
/// Connection and query phases cannot be separated without HTTP/2 stream
/// introspection, so the whole POST round trip is reported as query_ms.
/// The responder identity is the endpoint URL: DoH routes through
/// anycast/CDN infrastructure whose literal IP is not meaningful.
pub struct HttpsTransport {
	url: String,
	client: reqwest::Client,
}

impl HttpsTransport {
	pub fn new(url: &str) -> Result<Self, TransportError> {
		// One pooled client per transport instance; reused connections keep
		// later queries on an established HTTP/2 session
		let client = reqwest::Client::builder()
			.tcp_nodelay(true)
			.build()
			.map_err(|e| TransportError::Http(format!("failed to build client: {}", e)))?;
		Ok(Self {
			url: url.to_string(),
			client,
		})
	}
}

#[async_trait]
impl DnsTransport for HttpsTransport {
	fn transport_type(&self) -> Transport {
		Transport::Doh
	}

	async fn exchange(
		&self,
		query: &[u8],
		timeout: Duration,
	) -> Result<Exchange, TransportError> {
		let start = Instant::now();
		let response = self.client
			.post(&self.url)
			.header("Content-Type", "application/dns-message")
			.header("Accept", "application/dns-message")
			.body(query.to_vec())
			.timeout(timeout)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					TransportError::Timeout(timeout)
				} else {
					TransportError::Http(e.to_string())
				}
			})?;

		if !response.status().is_success() {
			return Err(TransportError::Http(format!("status {}", response.status())));
		}

		let body = response.bytes().await.map_err(|e| {
			if e.is_timeout() {
				TransportError::Timeout(timeout)
			} else {
				TransportError::Http(e.to_string())
			}
		})?;
		let total_ms = elapsed_ms(start);

		Ok(Exchange {
			wire: body.to_vec(),
			timing: TimingBreakdown {
				total_ms,
				connection_ms: 0.0,
				query_ms: total_ms,
			},
			responder: self.url.clone(),
		})
	}
}
