//! WildFire verdict lookups.
//!
//! One form-encoded POST per hash against the public report endpoint; the
//! single `<malware>` field of the report decides the verdict.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use quick_xml::events::Event;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default public WildFire endpoint.
pub const DEFAULT_URL: &str = "https://wildfire.paloaltonetworks.com";

/// Verdict for a submitted content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The report's `<malware>` field is the literal `yes`.
    Malware,
    /// Any other well-formed report.
    Benign,
}

/// Client for the WildFire report API.
pub struct WildfireClient {
    http: reqwest::Client,
    report_url: Url,
    api_key: SecretString,
}

impl WildfireClient {
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base: Url = base_url.parse()?;
        let report_url = base.join("/publicapi/get/report")?;
        Ok(Self {
            http: transport.build_client()?,
            report_url,
            api_key,
        })
    }

    /// Look up the verdict for one content hash.
    ///
    /// Transport and parse failures are returned to the caller, which
    /// counts them per item — a single bad hash never aborts a batch.
    pub async fn verdict(&self, hash: &str) -> Result<Verdict, Error> {
        debug!(%hash, "wildfire report lookup");
        let resp = self
            .http
            .post(self.report_url.clone())
            .form(&[
                ("apikey", self.api_key.expose_secret()),
                ("hash", hash),
            ])
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed {
                host: self.report_url.to_string(),
                source: e,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::ConnectionFailed {
            host: self.report_url.to_string(),
            source: e,
        })?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: "WildFire rejected the API key".to_owned(),
            });
        }
        if !status.is_success() {
            return Err(Error::Api {
                code: Some(status.as_str().to_owned()),
                message: format!("unexpected HTTP status for hash {hash}"),
            });
        }

        parse_verdict(&body)
    }
}

/// Extract the first `<malware>` element's text from a report document.
fn parse_verdict(body: &str) -> Result<Verdict, Error> {
    let mut reader = quick_xml::Reader::from_str(body);
    let mut in_malware = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"malware" => in_malware = true,
            Ok(Event::Text(t)) if in_malware => {
                let text = t.unescape().map_err(|e| Error::Parse {
                    message: e.to_string(),
                    body: body.to_owned(),
                })?;
                return Ok(if text.trim() == "yes" {
                    Verdict::Malware
                } else {
                    Verdict::Benign
                });
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"malware" => in_malware = false,
            Ok(Event::Eof) => {
                return Err(Error::Parse {
                    message: "report has no <malware> field".to_owned(),
                    body: body.to_owned(),
                })
            }
            Err(e) => {
                return Err(Error::Parse {
                    message: e.to_string(),
                    body: body.to_owned(),
                })
            }
            Ok(_) => {}
        }
    }
}
