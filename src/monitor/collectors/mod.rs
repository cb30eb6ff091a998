mod port;
mod resolve;
mod ssl;
mod web;

#[cfg(test)]
pub(crate) mod fixtures;

pub use port::Port;
pub use ssl::{Certificate, Ssl};
pub use web::Web;
