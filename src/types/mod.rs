//! Shared types: messages, report requests and the unified error.

pub mod error;
pub mod message;
pub mod request;

pub use error::{
    AnalystError, ErrorCategory, ErrorClassifier, LlmError, Result, ValidationError,
    ValidationErrorKind,
};
pub use message::{Message, Role, transcript};
pub use request::{Currency, Grouping, Period, ReportRequest};
