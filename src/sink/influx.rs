use std::time::Duration;

use curl::easy::{Easy, Easy2, Handler, List, WriteError};

use crate::sink::{Point, SinkError, Writer};

#[derive(Default)]
struct ResponseBody(Vec<u8>);

impl Handler for ResponseBody {
  fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
    self.0.extend_from_slice(data);

    Ok(data.len())
  }
}

impl ResponseBody {
  pub fn get_body(&self) -> String {
    String::from_utf8_lossy(&self.0).into()
  }
}

/// Writes batches to the InfluxDB v2 `/api/v2/write` endpoint with
/// nanosecond precision.
pub struct InfluxWriter {
  url: String,
  token: String,
  timeout: Duration,
}

impl InfluxWriter {
  /// `base_url` is `protocol://host:port`. `token` goes into the
  /// `Authorization: Token` header, InfluxDB 1.8 accepts `username:password`
  /// there.
  pub fn new(base_url: &str, token: &str, organisation: &str, bucket: &str) -> Self {
    let mut encoder = Easy::new();
    let organisation = encoder.url_encode(organisation.as_bytes());
    let bucket = encoder.url_encode(bucket.as_bytes());
    let url = format!(
      "{}/api/v2/write?org={}&bucket={}&precision=ns",
      base_url.trim_end_matches('/'),
      organisation,
      bucket,
    );

    Self {
      url,
      token: token.to_owned(),
      timeout: Duration::from_secs(10),
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn url(&self) -> &str {
    &self.url
  }
}

impl Writer for InfluxWriter {
  fn write(&self, points: &[Point]) -> Result<(), SinkError> {
    let body = points.iter().map(Point::to_line).collect::<Vec<_>>().join("\n");

    let mut headers = List::new();
    headers.append(&format!("Authorization: Token {}", self.token))?;
    headers.append("Content-Type: text/plain; charset=utf-8")?;

    let mut request = Easy2::new(ResponseBody::default());
    request.url(&self.url)?;
    request.post(true)?;
    request.post_fields_copy(body.as_bytes())?;
    request.http_headers(headers)?;
    request.timeout(self.timeout)?;
    request.perform()?;

    let status = request.response_code()?;

    if !(200..300).contains(&status) {
      return Err(SinkError::Status {
        status,
        body: request.get_ref().get_body(),
      });
    }

    Ok(())
  }
}
