use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveError;

use crate::monitor::models::Transport;

// Every probe resolves afresh, a cached answer would hide DNS changes.
static RESOLVER: Lazy<Arc<TokioAsyncResolver>> = Lazy::new(|| {
  let mut opts = ResolverOpts::default();
  opts.cache_size = 0;
  opts.positive_min_ttl = Some(Duration::ZERO);
  opts.positive_max_ttl = Some(Duration::ZERO);
  opts.negative_min_ttl = Some(Duration::ZERO);
  opts.negative_max_ttl = Some(Duration::ZERO);

  let config = trust_dns_resolver::system_conf::read_system_conf()
    .map(|(config, _)| config)
    .unwrap_or_else(|_| ResolverConfig::default());

  Arc::new(TokioAsyncResolver::tokio(config, opts))
});

/// Resolves `host` to the addresses `transport` may connect to, in resolver
/// order. Address literals are returned as is.
pub async fn lookup(host: &str, transport: Transport) -> Result<Vec<IpAddr>, ResolveError> {
  if let Ok(address) = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
    return Ok(vec![address].into_iter().filter(|a| transport.accepts(a)).collect());
  }

  let lookup = Arc::clone(&RESOLVER).lookup_ip(host).await?;

  Ok(lookup.iter().filter(|a| transport.accepts(a)).collect())
}
