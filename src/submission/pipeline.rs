use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use panel_config::{Config, SaveScope};

use super::flatten::flatten;
use super::guard::{SubmissionTracker, Ticket, ViewHandle};
use super::notice::Notice;
use crate::errors::{PanelError, TransportError};
use crate::form::FormState;
use crate::matrix::{MatrixEditor, MatrixSaveOutcome, MatrixSaveReply, MatrixSaveRequest};

/// Which resource call a form submission maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub ticket: Ticket,
    pub operation: Operation,
    /// Flat leaf-key body, as the create/update endpoints expect.
    pub body: Map<String, Value>,
}

impl SubmitRequest {
    pub fn to_json(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

/// A successful round trip: either the stored record or field errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitReply {
    Saved { record: Map<String, Value> },
    Invalid { errors: BTreeMap<String, String> },
}

impl SubmitReply {
    /// Interprets an HTTP-style response. 2xx is a stored record; 400 and 422
    /// with an object body are field errors (a message or a list of messages
    /// per key); anything else is a server failure.
    pub fn from_response(status: u16, body: &Value) -> Result<Self, TransportError> {
        match (status, body) {
            (200..=299, Value::Object(record)) => Ok(SubmitReply::Saved {
                record: record.clone(),
            }),
            (200..=299, _) => Ok(SubmitReply::Saved { record: Map::new() }),
            (400 | 422, Value::Object(fields)) => Ok(SubmitReply::Invalid {
                errors: fields
                    .iter()
                    .filter_map(|(key, message)| error_text(message).map(|text| (key.clone(), text)))
                    .collect(),
            }),
            (status, body) => Err(TransportError::Server {
                status,
                message: error_text(body).unwrap_or_else(|| "unexpected response".to_string()),
            }),
        }
    }
}

fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(error_text).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        Value::Object(map) => map.get("detail").or_else(|| map.get("message")).and_then(error_text),
        _ => None,
    }
}

/// Backend calls the pipeline needs. Implementations may block or hand the
/// work to any executor; state is only touched again through `complete`.
pub trait Transport {
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitReply, TransportError>;

    fn save_matrix(&self, request: &MatrixSaveRequest) -> Result<MatrixSaveReply, TransportError>;
}

/// Result of preparing a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Request(SubmitRequest),
    /// Client-side validation failed; nothing is sent.
    Invalid(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Invalid(BTreeMap<String, String>),
    Accepted { changed: usize },
    /// Server field errors, keyed by the form's dotted paths.
    Rejected(BTreeMap<String, String>),
    Failed { notice: Notice, error: TransportError },
    Stale,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }

    pub fn into_result(self) -> Result<usize, PanelError> {
        match self {
            SubmitOutcome::Accepted { changed } => Ok(changed),
            SubmitOutcome::Stale => Ok(0),
            SubmitOutcome::Invalid(errors) => Err(PanelError::invalid_input(
                "form",
                format!("{} field(s) failed validation", errors.len()),
            )),
            SubmitOutcome::Rejected(errors) => Err(PanelError::ServerValidation(errors)),
            SubmitOutcome::Failed { error, .. } => Err(PanelError::Transport(error)),
        }
    }
}

/// Drives create/update submissions for one form view.
#[derive(Debug)]
pub struct FormSubmitter {
    tracker: SubmissionTracker,
    skip_empty: bool,
}

impl FormSubmitter {
    pub fn new(skip_empty: bool) -> Self {
        Self {
            tracker: SubmissionTracker::new(),
            skip_empty,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.skip_empty)
    }

    pub fn view(&self) -> ViewHandle {
        self.tracker.view()
    }

    pub fn in_flight(&self) -> bool {
        self.tracker.in_flight()
    }

    /// Validates and snapshots the form. Later edits do not change the request.
    pub fn begin(&mut self, form: &mut FormState, operation: Operation) -> Prepared {
        let report = form.validate_all();
        if !report.is_valid() {
            tracing::debug!(errors = report.errors.len(), "submission blocked by validation");
            return Prepared::Invalid(report.errors);
        }
        let ticket = self.tracker.issue();
        let body = flatten(&report.values, self.skip_empty);
        tracing::debug!(ticket = ticket.sequence(), fields = body.len(), ?operation, "submission started");
        Prepared::Request(SubmitRequest {
            ticket,
            operation,
            body,
        })
    }

    /// Applies a response. Nothing is retried; a failure leaves the form as it is.
    pub fn complete(
        &mut self,
        form: &mut FormState,
        ticket: Ticket,
        result: Result<SubmitReply, TransportError>,
    ) -> SubmitOutcome {
        if !self.tracker.accept(&ticket) {
            return SubmitOutcome::Stale;
        }
        match result {
            Ok(SubmitReply::Saved { record }) => {
                form.clear_server_errors();
                let changed = form.apply_record(&record);
                tracing::info!(ticket = ticket.sequence(), changed, "submission accepted");
                SubmitOutcome::Accepted { changed }
            }
            Ok(SubmitReply::Invalid { errors }) => {
                let mapped: BTreeMap<String, String> = errors
                    .into_iter()
                    .map(|(key, message)| (form.resolve_error_key(&key).unwrap_or(key), message))
                    .collect();
                form.clear_server_errors();
                form.apply_server_errors(mapped.clone());
                tracing::info!(ticket = ticket.sequence(), errors = mapped.len(), "submission rejected by server");
                SubmitOutcome::Rejected(mapped)
            }
            Err(error) => {
                tracing::error!(ticket = ticket.sequence(), error = %error, "submission failed");
                SubmitOutcome::Failed {
                    notice: Notice::error(format!(
                        "Saving failed: {error}. Your changes are still here."
                    )),
                    error,
                }
            }
        }
    }

    /// `begin`, the transport call, then `complete`.
    pub fn submit(
        &mut self,
        form: &mut FormState,
        transport: &dyn Transport,
        operation: Operation,
    ) -> SubmitOutcome {
        match self.begin(form, operation) {
            Prepared::Invalid(errors) => SubmitOutcome::Invalid(errors),
            Prepared::Request(request) => {
                let result = transport.submit(&request);
                self.complete(form, request.ticket, result)
            }
        }
    }
}

/// Saves a matrix through `transport` in one call.
pub fn save_matrix(
    editor: &mut MatrixEditor,
    transport: &dyn Transport,
    scope: SaveScope,
) -> MatrixSaveOutcome {
    let request = editor.begin_save(scope);
    if request.is_empty() {
        tracing::debug!("nothing to save");
    }
    let result = transport.save_matrix(&request);
    editor.complete_save(request.ticket, result)
}

/// Payload preview used by diagnostics: `{ "operation": ..., "body": {...} }`.
pub fn describe(request: &SubmitRequest) -> Value {
    let operation = match &request.operation {
        Operation::Create => json!({"kind": "create"}),
        Operation::Update { id } => json!({"kind": "update", "id": id}),
    };
    json!({"operation": operation, "body": request.to_json()})
}
