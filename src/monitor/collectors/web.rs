use std::time::{Duration, Instant};

use curl::easy::{Easy2, Handler, HttpVersion, List, WriteError};
use tokio::task;

use crate::monitor::errors::WebError;
use crate::monitor::models::Monitor;

/// Tracks the response head. The body is never read: the end of the final
/// header block aborts the transfer, so a slow body cannot hold the probe.
struct ResponseHead {
  status: Option<u16>,
  complete_at: Option<Instant>,
}

impl Handler for ResponseHead {
  fn header(&mut self, data: &[u8]) -> bool {
    let line = String::from_utf8_lossy(data);
    let line = line.trim_end();

    if line.starts_with("HTTP/") {
      self.status = line.split_whitespace().nth(1).and_then(|code| code.parse().ok());
      self.complete_at = None;
    } else if line.is_empty() && self.complete_at.is_none() && self.status.is_some_and(|code| code >= 200) {
      self.complete_at = Some(Instant::now());
      return false;
    }

    true
  }

  fn write(&mut self, _data: &[u8]) -> Result<usize, WriteError> {
    Ok(0)
  }
}

/// A received response head.
#[derive(Debug)]
pub struct WebResponse {
  pub status_code: u16,

  /// Time from probe start until the header block was complete.
  pub elapsed: Duration,
}

pub struct Web;

impl Web {
  /// Sends one `GET` to `protocol://destination:port`.
  ///
  /// Certificate and host name verification are switched off: the probe
  /// checks liveness, the SSL probe checks trust. Any received status,
  /// including 4xx and 5xx, counts as a response.
  pub async fn measure(monitor: &Monitor, started: Instant) -> Result<WebResponse, WebError> {
    let url = format!("{}://{}", monitor.protocol.to_lowercase(), monitor.address());

    let mut headers = List::new();
    headers.append("Cache-Control: no-cache")?;

    let mut request = Easy2::new(ResponseHead {
      status: None,
      complete_at: None,
    });
    request.url(url.as_str())?;
    request.get(true)?;
    request.http_headers(headers)?;
    request.timeout(monitor.timeout)?;
    request.connect_timeout(monitor.timeout)?;
    request.follow_location(false)?;
    request.ssl_verify_peer(false)?;
    request.ssl_verify_host(false)?;
    request.http_version(HttpVersion::V2TLS)?;

    let response = task::spawn_blocking(move || match request.perform() {
      Ok(()) => Ok(request),
      // The handler stops the transfer once the head is complete.
      Err(error) if error.is_write_error() && request.get_ref().complete_at.is_some() => Ok(request),
      Err(error) => Err(WebError::Transport(error)),
    })
    .await??;

    let head = response.get_ref();
    let status_code = head.status.ok_or(WebError::NoResponse)?;
    let complete_at = head.complete_at.unwrap_or_else(Instant::now);

    Ok(WebResponse {
      status_code,
      elapsed: complete_at.saturating_duration_since(started),
    })
  }
}

#[cfg(test)]
mod tests {
  use std::io::{Read, Write};

  use httpmock::prelude::*;

  use super::*;
  use crate::monitor::collectors::fixtures;
  use crate::monitor::models::Kind;

  fn monitor(protocol: &str, destination: &str, port: u16) -> Monitor {
    Monitor {
      name: String::from("web"),
      interval: Duration::from_secs(1),
      timeout: Duration::from_secs(3),
      kind: Kind::Web,
      protocol: String::from(protocol),
      destination: String::from(destination),
      port,
    }
  }

  #[test]
  fn head_tracking() {
    let mut head = ResponseHead {
      status: None,
      complete_at: None,
    };

    assert!(head.header(b"HTTP/1.1 100 Continue\r\n"));
    assert!(head.header(b"\r\n"));
    assert_eq!(head.status, Some(100));
    assert!(head.complete_at.is_none(), "interim response doesn't complete the head");

    assert!(head.header(b"HTTP/1.1 503 Service Unavailable\r\n"));
    assert!(head.header(b"Content-Length: 10\r\n"));
    assert!(!head.header(b"\r\n"), "end of the final head stops the transfer");
    assert_eq!(head.status, Some(503));
    assert!(head.complete_at.is_some(), "final response completes the head");

    assert_eq!(head.write(b"body").unwrap(), 0, "body is refused");
  }

  #[tokio::test]
  async fn sends_cache_busting_get() {
    let server = MockServer::start_async().await;

    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/").header("Cache-Control", "no-cache");
        then.status(200).body("ok");
      })
      .await;

    let result = Web::measure(&monitor("http", &server.host(), server.port()), Instant::now()).await;

    mock.assert();

    assert_eq!(result.unwrap().status_code, 200, "status is recorded");
  }

  #[tokio::test]
  async fn error_status_is_a_response() {
    let server = MockServer::start_async().await;

    server
      .mock_async(|when, then| {
        when.method(GET);
        then.status(503).body("maintenance");
      })
      .await;

    let result = Web::measure(&monitor("HTTP", &server.host(), server.port()), Instant::now()).await;

    assert_eq!(result.unwrap().status_code, 503, "503 still counts as online");
  }

  #[tokio::test]
  async fn redirects_are_not_followed() {
    let server = MockServer::start_async().await;

    server
      .mock_async(|when, then| {
        when.method(GET).path("/");
        then.status(302).header("Location", "/elsewhere");
      })
      .await;

    let result = Web::measure(&monitor("http", &server.host(), server.port()), Instant::now()).await;

    assert_eq!(result.unwrap().status_code, 302, "redirect status is recorded as is");
  }

  #[tokio::test]
  async fn unreachable_host() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = Web::measure(&monitor("http", "127.0.0.1", port), Instant::now()).await;

    assert!(
      matches!(result, Err(WebError::Transport(_))),
      "refused connection is a transport error"
    );
  }

  #[tokio::test]
  async fn stalled_body_does_not_hold_the_probe() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    std::thread::spawn(move || {
      let Ok((mut stream, _)) = listener.accept() else {
        return;
      };

      let mut request = Vec::new();
      let mut buffer = [0; 1024];
      while !request.ends_with(b"\r\n\r\n") {
        match stream.read(&mut buffer) {
          Ok(0) | Err(_) => return,
          Ok(read) => request.extend_from_slice(&buffer[..read]),
        }
      }

      let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n");
      std::thread::sleep(Duration::from_secs(3));
      let _ = stream.write_all(b"late");
    });

    let mut target = monitor("http", "127.0.0.1", port);
    target.timeout = Duration::from_secs(1);

    let started = Instant::now();
    let response = Web::measure(&target, started).await.unwrap();

    assert_eq!(response.status_code, 200, "head alone is a response");
    assert!(response.elapsed < Duration::from_secs(1), "timed at the end of the head");
    assert!(
      started.elapsed() < Duration::from_secs(1),
      "probe returns without waiting for the body"
    );
  }

  #[tokio::test]
  async fn accepts_self_signed_certificate() {
    let port = fixtures::https_server("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");

    let result = Web::measure(&monitor("https", "127.0.0.1", port), Instant::now()).await;

    assert_eq!(
      result.unwrap().status_code,
      200,
      "self-signed certificate is accepted"
    );
  }
}
