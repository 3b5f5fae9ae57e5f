//! Provisioning portal: the request server behind the access point.
//!
//! Serves the credential form, accepts `POST /credentials`, and exposes
//! the latest [`FeedbackState`] read-only at `GET /status`.  The HTTP
//! handlers run on the server's own task; they only touch the
//! [`PortalState`] behind a mutex, which the control loop drains through
//! the board adapter.
//!
//! | route              | method | body / response                      |
//! |--------------------|--------|--------------------------------------|
//! | `/`                | GET    | HTML form                            |
//! | `/credentials`     | POST   | urlencoded form → 202 or 400         |
//! | `/result`          | GET    | JSON outcome of the last submission  |
//! | `/status`          | GET    | JSON [`FeedbackState`]               |

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use serde::Serialize;

use crate::feedback::FeedbackState;
use crate::provisioning::{CredentialSubmission, ProvisioningError, parse_form};
use crate::timezone::ZONES;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    http::Method,
    http::server::{Configuration as HttpConfiguration, EspHttpConnection, EspHttpServer, Request},
    io::{Read, Write},
};

/// Largest form body accepted.  Three 32-byte fields, worst-case
/// percent-encoded, plus field names.
pub const MAX_FORM_BODY: usize = 512;

#[cfg(target_os = "espidf")]
const HTTP_STACK_SIZE: usize = 8192;

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

/// Outcome of the last submission, as served at `/result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub accepted: bool,
    pub message: String,
}

impl SubmissionReport {
    fn from_result(result: Result<(), ProvisioningError>) -> Self {
        match result {
            Ok(()) => Self {
                accepted: true,
                message: "saved".into(),
            },
            Err(e) => Self {
                accepted: false,
                message: e.to_string(),
            },
        }
    }
}

/// Everything the HTTP handlers and the control loop exchange.
#[derive(Debug, Default)]
pub struct PortalState {
    /// Newest unconsumed submission.  A second POST replaces it.
    pending: Option<CredentialSubmission>,
    last_report: Option<SubmissionReport>,
    feedback: FeedbackState,
}

impl PortalState {
    /// Decode a form body and queue it for the control loop.
    pub fn submit_form(&mut self, body: &str) -> Result<(), ProvisioningError> {
        match parse_form(body) {
            Ok(submission) => {
                info!("Portal: submission for '{}' queued", submission.ssid);
                self.pending = Some(submission);
                self.last_report = None;
                Ok(())
            }
            Err(e) => {
                warn!("Portal: form rejected: {}", e);
                self.last_report = Some(SubmissionReport::from_result(Err(e)));
                Err(e)
            }
        }
    }

    pub fn take_pending(&mut self) -> Option<CredentialSubmission> {
        self.pending.take()
    }

    pub fn set_report(&mut self, result: Result<(), ProvisioningError>) {
        self.last_report = Some(SubmissionReport::from_result(result));
    }

    pub fn last_report(&self) -> Option<&SubmissionReport> {
        self.last_report.as_ref()
    }

    pub fn set_feedback(&mut self, feedback: FeedbackState) {
        self.feedback = feedback;
    }

    pub fn feedback(&self) -> FeedbackState {
        self.feedback
    }

    /// Forget anything left over from a previous provisioning window.
    fn clear(&mut self) {
        self.pending = None;
        self.last_report = None;
    }
}

fn lock(state: &Mutex<PortalState>) -> MutexGuard<'_, PortalState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// Portal
// ───────────────────────────────────────────────────────────────

pub struct ProvisioningPortal {
    state: Arc<Mutex<PortalState>>,
    #[cfg(target_os = "espidf")]
    server: Option<EspHttpServer<'static>>,
    #[cfg(not(target_os = "espidf"))]
    serving: bool,
}

impl Default for ProvisioningPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisioningPortal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PortalState::default())),
            #[cfg(target_os = "espidf")]
            server: None,
            #[cfg(not(target_os = "espidf"))]
            serving: false,
        }
    }

    pub fn take_submission(&mut self) -> Option<CredentialSubmission> {
        lock(&self.state).take_pending()
    }

    pub fn report(&mut self, result: Result<(), ProvisioningError>) {
        lock(&self.state).set_report(result);
    }

    pub fn publish_feedback(&mut self, feedback: &FeedbackState) {
        lock(&self.state).set_feedback(*feedback);
    }

    pub fn last_report(&self) -> Option<SubmissionReport> {
        lock(&self.state).last_report().cloned()
    }

    /// `/status` body.
    pub fn status_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&lock(&self.state).feedback())
    }
}

#[cfg(target_os = "espidf")]
impl ProvisioningPortal {
    pub fn is_serving(&self) -> bool {
        self.server.is_some()
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.server.is_some() {
            return Ok(());
        }
        lock(&self.state).clear();

        let mut server = EspHttpServer::new(&HttpConfiguration {
            stack_size: HTTP_STACK_SIZE,
            ..Default::default()
        })?;

        server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
            req.into_ok_response()?.write_all(render_form().as_bytes())?;
            Ok(())
        })?;

        {
            let state = self.state.clone();
            server.fn_handler::<anyhow::Error, _>("/credentials", Method::Post, move |mut req| {
                let body = read_request_body(&mut req)?;
                let Ok(body) = core::str::from_utf8(&body) else {
                    return write_text(req, 400, "form body is not UTF-8");
                };
                let result = lock(&state).submit_form(body);
                match result {
                    Ok(()) => write_text(req, 202, "saving, check /result"),
                    Err(e) => write_text(req, 400, &e.to_string()),
                }
            })?;
        }

        {
            let state = self.state.clone();
            server.fn_handler::<anyhow::Error, _>("/result", Method::Get, move |req| {
                let report = lock(&state).last_report().cloned();
                write_json(req, &report)
            })?;
        }

        {
            let state = self.state.clone();
            server.fn_handler::<anyhow::Error, _>("/status", Method::Get, move |req| {
                let feedback = lock(&state).feedback();
                write_json(req, &feedback)
            })?;
        }

        self.server = Some(server);
        info!("Portal: serving");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.server.take().is_some() {
            info!("Portal: stopped");
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl ProvisioningPortal {
    pub fn is_serving(&self) -> bool {
        self.serving
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        if !self.serving {
            lock(&self.state).clear();
            self.serving = true;
            info!("Portal(sim): serving");
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.serving {
            self.serving = false;
            info!("Portal(sim): stopped");
        }
    }

    /// Act as a browser posting the form.  Ignored while not serving.
    pub fn sim_post_form(&mut self, body: &str) -> Option<Result<(), ProvisioningError>> {
        self.serving.then(|| lock(&self.state).submit_form(body))
    }
}

// ───────────────────────────────────────────────────────────────
// HTTP helpers
// ───────────────────────────────────────────────────────────────

/// The credential form, with one option per named zone.
pub fn render_form() -> String {
    use core::fmt::Write as _;

    let mut zones = String::new();
    for (idx, zone) in ZONES.iter().enumerate() {
        let _ = write!(zones, "<option value=\"{}\">{}</option>", idx, zone.name);
    }
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width\"><title>ClockClock</title></head><body>\
<h1>ClockClock WiFi</h1><form method=\"post\" action=\"/credentials\">\
<p><label>Network <input name=\"wifissid\" maxlength=\"32\" required></label></p>\
<p><label>Password <input name=\"wifipass\" type=\"password\" maxlength=\"32\"></label></p>\
<p><label><input name=\"is_protected\" type=\"checkbox\" checked> Protected</label></p>\
<p><label>Time zone <select name=\"tz\">{zones}</select></label></p>\
<p><label>or UTC offset (hours) <input name=\"tzoffset\" type=\"number\" min=\"-12\" max=\"14\"></label></p>\
<p><button>Save</button></p></form><p><a href=\"/status\">Last sync status</a></p></body></html>"
    )
}

#[cfg(target_os = "espidf")]
fn read_request_body(req: &mut Request<&mut EspHttpConnection<'_>>) -> anyhow::Result<Vec<u8>> {
    let len = req.content_len().unwrap_or(0) as usize;
    if len > MAX_FORM_BODY {
        return Err(anyhow::anyhow!("request body too large"));
    }
    let mut body = vec![0_u8; len];
    if len > 0 {
        req.read_exact(&mut body)?;
    }
    Ok(body)
}

#[cfg(target_os = "espidf")]
fn write_json<T: Serialize>(
    req: Request<&mut EspHttpConnection<'_>>,
    payload: &T,
) -> anyhow::Result<()> {
    let body = serde_json::to_vec(payload)?;
    req.into_response(
        200,
        Some("OK"),
        &[("Content-Type", "application/json; charset=utf-8")],
    )?
    .write_all(&body)?;
    Ok(())
}

#[cfg(target_os = "espidf")]
fn write_text(
    req: Request<&mut EspHttpConnection<'_>>,
    status: u16,
    message: &str,
) -> anyhow::Result<()> {
    req.into_response(status, None, &[("Content-Type", "text/plain; charset=utf-8")])?
        .write_all(message.as_bytes())?;
    Ok(())
}
