//! Self-signed certificates and a throwaway HTTPS server for collector tests.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509, X509NameBuilder};

/// Self-signed certificate for `common_name`, also valid for `127.0.0.1`.
pub fn certificate(common_name: &str, not_before: &Asn1TimeRef, not_after: &Asn1TimeRef) -> (X509, PKey<Private>) {
  let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
  let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

  let mut name = X509NameBuilder::new().unwrap();
  name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
  let name = name.build();

  let mut builder = X509::builder().unwrap();
  builder.set_version(2).unwrap();
  builder
    .set_serial_number(&BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap())
    .unwrap();
  builder.set_subject_name(&name).unwrap();
  builder.set_issuer_name(&name).unwrap();
  builder.set_pubkey(&key).unwrap();
  builder.set_not_before(not_before).unwrap();
  builder.set_not_after(not_after).unwrap();
  let names = SubjectAlternativeName::new()
    .dns(common_name)
    .ip("127.0.0.1")
    .build(&builder.x509v3_context(None, None))
    .unwrap();
  builder.append_extension(names).unwrap();
  builder.sign(&key, MessageDigest::sha256()).unwrap();

  (builder.build(), key)
}

/// Serves `response` over TLS with a fresh self-signed certificate for
/// `localhost`, on a background thread, and returns the bound port.
pub fn https_server(response: &'static str) -> u16 {
  let (certificate, key) = certificate(
    "localhost",
    &Asn1Time::days_from_now(0).unwrap(),
    &Asn1Time::days_from_now(30).unwrap(),
  );

  https_server_with(certificate, key, response)
}

/// Like [`https_server`], presenting `certificate`.
pub fn https_server_with(certificate: X509, key: PKey<Private>, response: &'static str) -> u16 {
  let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
  acceptor.set_private_key(&key).unwrap();
  acceptor.set_certificate(&certificate).unwrap();
  let acceptor = acceptor.build();

  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let port = listener.local_addr().unwrap().port();

  thread::spawn(move || {
    for stream in listener.incoming().flatten() {
      let Ok(mut stream) = acceptor.accept(stream) else {
        continue;
      };

      let mut request = Vec::new();
      let mut buffer = [0; 1024];
      while !request.ends_with(b"\r\n\r\n") {
        match stream.read(&mut buffer) {
          Ok(0) | Err(_) => break,
          Ok(read) => request.extend_from_slice(&buffer[..read]),
        }
      }

      let _ = stream.write_all(response.as_bytes());
      let _ = stream.shutdown();
    }
  });

  port
}
