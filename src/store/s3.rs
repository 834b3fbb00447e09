//! S3-compatible object store over blocking HTTP.
//!
//! Uses `ListObjectsV2` (paginated) and `GetObject` with path-style addressing.
//! Requests are signed with AWS Signature Version 4 when credentials are
//! configured and sent anonymously otherwise (public buckets, presigned
//! gateways).

use crate::config::StoreSettings;
use crate::error::{DashboardError, Result};
use crate::store::{KeyFilter, ObjectStore};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of an empty body; every request we send is a bodiless GET.
const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Reads objects from an S3 bucket.
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
    /// Scheme + authority, no trailing slash.
    origin: String,
    host: String,
    base_path: String,
    credentials: Option<Credentials>,
}

#[derive(Clone)]
struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl S3Store {
    /// Create a store from explicit settings.
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        if settings.bucket.is_empty() {
            return Err(DashboardError::InvalidArgument(
                "bucket must be set for the S3 store".into(),
            ));
        }

        let endpoint = settings.endpoint_url();
        let url = Url::parse(&endpoint).map_err(|e| {
            DashboardError::InvalidArgument(format!("Invalid endpoint '{}': {}", endpoint, e))
        })?;
        let host_name = url.host_str().ok_or_else(|| {
            DashboardError::InvalidArgument(format!("Endpoint '{}' has no host", endpoint))
        })?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };
        let origin = format!("{}://{}", url.scheme(), host);
        let base_path = url.path().trim_end_matches('/').to_string();

        let credentials = match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
                session_token: settings.session_token.clone(),
            }),
            _ => None,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            origin,
            host,
            base_path,
            credentials,
        })
    }

    fn bucket_path(&self) -> String {
        format!("{}/{}", self.base_path, uri_encode(&self.bucket, false))
    }

    /// Issue a signed (or anonymous) GET and return the successful response.
    fn get(
        &self,
        canonical_uri: &str,
        query: &[(&str, &str)],
        missing: impl FnOnce() -> String,
    ) -> Result<reqwest::blocking::Response> {
        let canonical_query = canonical_query_string(query);
        let url = if canonical_query.is_empty() {
            format!("{}{}", self.origin, canonical_uri)
        } else {
            format!("{}{}?{}", self.origin, canonical_uri, canonical_query)
        };

        let mut request = self.client.get(&url);
        if let Some(creds) = &self.credentials {
            let headers = sign_request(
                creds,
                &self.region,
                &self.host,
                canonical_uri,
                &canonical_query,
                Utc::now(),
            );
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }

        debug!(%url, "GET");
        let resp = request.send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(DashboardError::NotFound(missing()));
        }
        Ok(resp.error_for_status()?)
    }
}

impl ObjectStore for S3Store {
    fn list(&self, prefix: &str, filter: &KeyFilter) -> Result<Vec<String>> {
        let uri = self.bucket_path();
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![("list-type", "2"), ("prefix", prefix)];
            if let Some(t) = token.as_deref() {
                query.push(("continuation-token", t));
            }

            let body = self
                .get(&uri, &query, || format!("bucket {}", self.bucket))?
                .text()?;
            let page = parse_list_response(&body)?;
            keys.extend(
                page.contents
                    .into_iter()
                    .map(|o| o.key)
                    .filter(|k| filter.matches(k)),
            );

            match page.next_continuation_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }

        keys.sort();
        debug!(bucket = %self.bucket, prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let uri = format!("{}/{}", self.bucket_path(), uri_encode(key, false));
        let resp = self.get(&uri, &[], || format!("object {}", key))?;
        Ok(resp.bytes()?.to_vec())
    }

    fn location(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

// ---------------------------------------------------------------------------
// ListObjectsV2 response
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListedObject>,
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
}

fn parse_list_response(body: &str) -> Result<ListBucketResult> {
    Ok(quick_xml::de::from_str(body)?)
}

// ---------------------------------------------------------------------------
// Signature Version 4
// ---------------------------------------------------------------------------

/// Percent-encode per the SigV4 rules: everything but unreserved characters,
/// and `/` only when `encode_slash` is set.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn canonical_query_string(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k, true), uri_encode(v, true)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Derive the per-day signing key: `kSecret -> kDate -> kRegion -> kService -> kSigning`.
fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date);
    let k_region = hmac_sha256(&k_date, region);
    let k_service = hmac_sha256(&k_region, service);
    hmac_sha256(&k_service, "aws4_request")
}

/// Headers to attach to a GET so S3 accepts it.
fn sign_request(
    creds: &Credentials,
    region: &str,
    host: &str,
    canonical_uri: &str,
    canonical_query: &str,
    now: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    // Must stay sorted by header name.
    let mut headers: Vec<(&'static str, String)> = vec![
        ("host", host.to_string()),
        ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256.to_string()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &creds.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "GET\n{}\n{}\n{}\n{}\n{}",
        canonical_uri, canonical_query, canonical_headers, signed_headers, EMPTY_PAYLOAD_SHA256
    );

    let scope = format!("{}/{}/s3/aws4_request", date, region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        sha256_hex(&canonical_request)
    );

    let key = signing_key(&creds.secret_access_key, &date, region, "s3");
    let signature = hex::encode(hmac_sha256(&key, &string_to_sign));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key_id, scope, signed_headers, signature
    );

    // reqwest sets Host itself.
    headers.retain(|(k, _)| *k != "host");
    headers.push(("authorization", authorization));
    headers
}
