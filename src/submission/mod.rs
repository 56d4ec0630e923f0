//! From edited state to backend calls and back.
//!
//! A submission is split into `begin` (validate and snapshot) and `complete`
//! (apply the response), so the transport call can run anywhere in between.
//! Responses pass through a [`SubmissionTracker`] and are dropped once stale.

mod flatten;
mod guard;
mod notice;
mod pipeline;

pub use flatten::flatten;
pub use guard::{SubmissionTracker, Ticket, ViewHandle};
pub use notice::{Notice, NoticeLevel};
pub use pipeline::{
    describe, save_matrix, FormSubmitter, Operation, Prepared, SubmitOutcome, SubmitReply,
    SubmitRequest, Transport,
};
