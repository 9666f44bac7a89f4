// PAN-OS XML API HTTP client
//
// Wraps `reqwest::Client` with API-key injection, the
// `<response status="…">` envelope, and the `type=op` / `type=config`
// request forms. Domain operations (device groups, rulebases, address
// objects) live on the session types; this module stays focused on
// transport mechanics.

use quick_xml::events::Event;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::model::{Envelope, KeygenResult, Response};
use crate::transport::TransportConfig;

/// Raw client for the PAN-OS XML management API.
///
/// All requests go to `/api/` with a `type` parameter selecting the
/// command family. Responses are wrapped in
/// `<response status="success|error">`; the envelope is checked and
/// stripped before the caller sees the payload.
pub struct XapiClient {
    http: reqwest::Client,
    base_url: Url,
    host: String,
    api_key: String,
}

impl std::fmt::Debug for XapiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // api_key stays out of debug output
        f.debug_struct("XapiClient")
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl XapiClient {
    /// Authenticate against `host` and return a client holding the issued
    /// API key.
    ///
    /// `host` may be a bare name/IP (`https://` is assumed) or a full URL.
    /// This is the single handshake of a run: credential rejection maps to
    /// [`Error::Authentication`], unreachable endpoints to
    /// [`Error::ConnectionFailed`].
    pub async fn connect(
        host: &str,
        username: &str,
        password: &str,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = base_url_for(host)?;
        let http = transport.build_client()?;

        debug!(%base_url, "requesting API key");
        let body = http
            .post(api_endpoint(&base_url)?)
            .form(&[
                ("type", "keygen"),
                ("user", username),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed {
                host: host.to_owned(),
                source: e,
            })?
            .text()
            .await
            .map_err(|e| Error::ConnectionFailed {
                host: host.to_owned(),
                source: e,
            })?;

        if let Err(err) = check_envelope(&body) {
            // The keygen endpoint reports bad credentials as a plain
            // status=error envelope.
            return Err(match err {
                Error::Api { message, .. } => Error::Authentication { message },
                other => other,
            });
        }
        let keygen: Response<KeygenResult> = parse_body(&body)?;

        Ok(Self {
            http,
            base_url,
            host: host.to_owned(),
            api_key: keygen.result.key,
        })
    }

    /// The management endpoint this client talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    // ── Request forms ────────────────────────────────────────────────

    /// Submit an operational command (`type=op`) and deserialize the
    /// response, envelope included.
    pub async fn op<T: DeserializeOwned>(
        &self,
        cmd: &str,
        vsys: Option<&str>,
    ) -> Result<T, Error> {
        debug!(%cmd, "op command");
        let mut params = vec![("type", "op"), ("cmd", cmd), ("key", &self.api_key)];
        if let Some(vsys) = vsys {
            params.push(("vsys", vsys));
        }
        let body = self.request(&params).await?;
        check_envelope(&body)?;
        parse_body(&body)
    }

    /// Read a config node (`action=get`) and deserialize the response.
    pub async fn config_get<T: DeserializeOwned>(&self, xpath: &str) -> Result<T, Error> {
        let body = self.config_get_raw(xpath).await?;
        parse_body(&body)
    }

    /// Read a config node (`action=get`) and return the envelope-checked
    /// raw response body, for callers that keep the XML.
    pub async fn config_get_raw(&self, xpath: &str) -> Result<String, Error> {
        debug!(%xpath, "config get");
        let body = self
            .request(&[
                ("type", "config"),
                ("action", "get"),
                ("xpath", xpath),
                ("key", &self.api_key),
            ])
            .await?;
        check_envelope(&body)?;
        Ok(body)
    }

    /// Create a config node (`action=set`). Set is additive: it never
    /// overwrites an existing sibling.
    pub async fn config_set(&self, xpath: &str, element: &str) -> Result<(), Error> {
        debug!(%xpath, "config set");
        let body = self
            .request(&[
                ("type", "config"),
                ("action", "set"),
                ("xpath", xpath),
                ("element", element),
                ("key", &self.api_key),
            ])
            .await?;
        check_envelope(&body)
    }

    /// Replace a config node in place (`action=edit`).
    pub async fn config_edit(&self, xpath: &str, element: &str) -> Result<(), Error> {
        debug!(%xpath, "config edit");
        let body = self
            .request(&[
                ("type", "config"),
                ("action", "edit"),
                ("xpath", xpath),
                ("element", element),
                ("key", &self.api_key),
            ])
            .await?;
        check_envelope(&body)
    }

    /// Move a config node before a sibling (`action=move`). Rule order is
    /// evaluation order, so placement matters.
    pub async fn config_move_before(&self, xpath: &str, dst: &str) -> Result<(), Error> {
        debug!(%xpath, %dst, "config move");
        let body = self
            .request(&[
                ("type", "config"),
                ("action", "move"),
                ("xpath", xpath),
                ("where", "before"),
                ("dst", dst),
                ("key", &self.api_key),
            ])
            .await?;
        check_envelope(&body)
    }

    /// POST a parameter set to `/api/` and return the raw response body.
    ///
    /// Form-encoded POST keeps command payloads and the key out of URLs.
    async fn request(&self, params: &[(&str, &str)]) -> Result<String, Error> {
        let resp = self
            .http
            .post(api_endpoint(&self.base_url)?)
            .form(params)
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed {
                host: self.host.clone(),
                source: e,
            })?;

        resp.text().await.map_err(|e| Error::ConnectionFailed {
            host: self.host.clone(),
            source: e,
        })
    }
}

// ── URL helpers ──────────────────────────────────────────────────────

/// Normalize a host argument into a base URL (`https://` assumed).
pub(crate) fn base_url_for(host: &str) -> Result<Url, Error> {
    if host.contains("://") {
        Ok(host.parse()?)
    } else {
        Ok(format!("https://{host}").parse()?)
    }
}

fn api_endpoint(base: &Url) -> Result<Url, Error> {
    base.join("/api/").map_err(Error::InvalidUrl)
}

// ── Envelope handling ────────────────────────────────────────────────

/// Check the `<response status="…">` envelope, extracting the error
/// message from `<msg>` / `<line>` nodes when the API rejects a request.
pub(crate) fn check_envelope(body: &str) -> Result<(), Error> {
    let envelope: Envelope = quick_xml::de::from_str(body).map_err(|e| Error::Parse {
        message: e.to_string(),
        body: body.to_owned(),
    })?;

    if envelope.status == "success" {
        return Ok(());
    }

    Err(Error::Api {
        code: envelope.code,
        message: error_message(body),
    })
}

/// Deserialize a full response body into a typed payload.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    quick_xml::de::from_str(body).map_err(|e| Error::Parse {
        message: e.to_string(),
        body: body.to_owned(),
    })
}

/// Collect the text inside `<msg>` (and nested `<line>`) elements.
///
/// Error envelopes are not uniform across command families: keygen wraps
/// the message in `<result><msg>`, config actions in `<msg><line>`.
fn error_message(body: &str) -> String {
    let mut reader = quick_xml::Reader::from_str(body);
    let mut depth_in_msg = 0u32;
    let mut parts: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if depth_in_msg > 0 || name.as_ref() == b"msg" {
                    depth_in_msg += 1;
                }
            }
            Ok(Event::End(_)) if depth_in_msg > 0 => depth_in_msg -= 1,
            Ok(Event::Text(t)) if depth_in_msg > 0 => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        parts.push(text.to_owned());
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }

    if parts.is_empty() {
        "request rejected by the API".to_owned()
    } else {
        parts.join("; ")
    }
}
