#![doc(test(attr(deny(warnings))))]

//! Panel Core interprets backend-declared form and matrix schemas for the
//! broker control panel: it decodes payloads, compiles validators, keeps
//! editable form and grid state, and prepares submissions.

pub mod cli;
pub mod context;
pub mod errors;
pub mod form;
pub mod matrix;
pub mod schema;
pub mod submission;
pub mod utils;
pub mod validation;

pub use errors::{PanelError, TransportError};
pub use panel_config::{Config, ConfigManager, SaveScope, UnknownKindPolicy};
pub use panel_schema as model;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Panel Core tracing initialized.");
    });
}
