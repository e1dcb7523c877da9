//! `SDK-HMAC-SHA256` request signing used by Huawei Cloud API gateways.
//!
//! The canonical request is
//!
//! ```text
//! METHOD \n CANONICAL_URI \n CANONICAL_QUERY \n CANONICAL_HEADERS \n SIGNED_HEADERS \n HEX(SHA256(body))
//! ```
//!
//! and the signature is `HEX(HMAC-SHA256(secret_key, "SDK-HMAC-SHA256\n" + date + "\n" +
//! HEX(SHA256(canonical_request))))`.

use std::collections::BTreeMap;
use std::fmt;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

use crate::error::{SolverError, SolverResult};

pub const ALGORITHM: &str = "SDK-HMAC-SHA256";
pub const DATE_HEADER: &str = "X-Sdk-Date";

const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Everything that goes into a signature. Header names may be given in any case.
pub struct RequestParts<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    pub headers: &'a BTreeMap<String, String>,
    pub body: &'a [u8],
}

pub fn format_date(now: OffsetDateTime) -> SolverResult<String> {
    now.format(DATE_FORMAT)
        .map_err(|e| SolverError::Precondition(format!("Failed to format request date: {e}")))
}

/// RFC 3986 escaping: everything except unreserved characters is percent-encoded.
pub fn escape(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Sorted `key=value` pairs, both sides escaped. The same string is used on the wire so the
/// server reconstructs exactly what was signed.
pub fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs = query
        .iter()
        .map(|(k, v)| (escape(k), escape(v)))
        .collect::<Vec<_>>();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_uri(path: &str) -> String {
    let mut uri = path
        .split('/')
        .map(escape)
        .collect::<Vec<_>>()
        .join("/");
    if !uri.ends_with('/') {
        uri.push('/');
    }
    uri
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> Vec<String> {
    let mut names = headers
        .keys()
        .map(|k| k.to_ascii_lowercase())
        .collect::<Vec<_>>();
    names.sort();
    names
}

pub fn canonical_request(parts: &RequestParts) -> String {
    let lowered = parts
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
        .collect::<BTreeMap<_, _>>();
    let canonical_headers = lowered
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect::<String>();
    let signed_headers = signed_header_names(parts.headers).join(";");

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        parts.method.to_ascii_uppercase(),
        canonical_uri(parts.path),
        canonical_query(parts.query),
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(parts.body)),
    )
}

/// Build the `Authorization` header value. `parts.headers` must already contain the
/// `X-Sdk-Date` header whose value is `date`.
pub fn authorization(
    credentials: &Credentials,
    parts: &RequestParts,
    date: &str,
) -> SolverResult<String> {
    let string_to_sign = format!(
        "{ALGORITHM}\n{date}\n{}",
        hex::encode(Sha256::digest(canonical_request(parts).as_bytes()))
    );

    let mut mac = HmacSha256::new_from_slice(credentials.secret_key.as_bytes())
        .map_err(|e| SolverError::Config(format!("Unusable secret key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!(
        "{ALGORITHM} Access={}, SignedHeaders={}, Signature={}",
        credentials.access_key,
        signed_header_names(parts.headers).join(";"),
        signature
    ))
}
