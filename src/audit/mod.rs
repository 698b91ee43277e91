//! Audit logging module.
//!
//! Records every inbound request's outcome as a JSON line: accepted or
//! rejected, with every failure reason code collected during authentication.
//!
//! Entries never contain secrets, raw signatures or full payment-method
//! identifiers; request details pass through [`sanitize_details`] first.

mod entry;
mod logger;
mod sanitize;

pub use entry::{AuditEntry, AuditOutcome};
pub use logger::{AuditLogger, AuditSink, NullAuditLogger};
pub use sanitize::sanitize_details;
