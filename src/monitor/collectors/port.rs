use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::{TcpStream, UdpSocket};
use tokio::time;

use crate::monitor::collectors::resolve;
use crate::monitor::errors::PortError;
use crate::monitor::models::{Monitor, Transport};

pub struct Port;

impl Port {
  /// Tries to open a connection to the monitor's destination within its
  /// timeout. The connection is dropped as soon as it is established,
  /// nothing is sent over it.
  ///
  /// Stream transports connect over TCP. Datagram transports bind an
  /// ephemeral socket and connect it, which only proves the destination
  /// resolves and is routable.
  pub async fn measure(monitor: &Monitor) -> Result<(), PortError> {
    let transport = monitor
      .transport()
      .map_err(|protocol| PortError::UnsupportedProtocol { protocol })?;

    time::timeout(monitor.timeout, Self::connect(monitor, transport))
      .await
      .map_err(|_| PortError::Timeout {
        addr: monitor.address(),
        timeout_ms: monitor.timeout.as_millis(),
      })?
  }

  async fn connect(monitor: &Monitor, transport: Transport) -> Result<(), PortError> {
    let addresses = resolve::lookup(&monitor.destination, transport).await?;
    let mut last_error = None;

    for address in addresses {
      let target = SocketAddr::new(address, monitor.port);
      let attempt = if transport.is_datagram() {
        Self::connect_datagram(target).await
      } else {
        TcpStream::connect(target).await.map(drop)
      };

      match attempt {
        Ok(()) => return Ok(()),
        Err(error) => last_error = Some(error),
      }
    }

    Err(match last_error {
      Some(error) => error.into(),
      None => PortError::NoAddress {
        host: monitor.destination.clone(),
      },
    })
  }

  async fn connect_datagram(target: SocketAddr) -> std::io::Result<()> {
    let local = match target.ip() {
      IpAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
      IpAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(target).await
  }
}
