//! Diagnostics produced by the `.api` pipeline.
//!
//! Nothing in the pipeline fails hard: the lexer, parser, builder and
//! validator all report problems as [`Diagnostic`] values and keep going.
//!
//! - Error codes group diagnostics by phase ([`ErrorCode`])
//! - Primary and secondary labels point at the offending spans ([`Label`])
//! - [`Severity`] separates errors from advisory warnings
//! - [`ParseError`] wraps a list of diagnostics for `Result`-returning APIs
//!
//! # Example
//!
//! ```
//! # use zeroapi_parser::error::{Diagnostic, ErrorCode};
//! # use zeroapi_parser::Span;
//!
//! let diag = Diagnostic::error("duplicate struct `User`")
//!     .with_code(ErrorCode::E200)
//!     .with_label(Span::new(5..9), "declared here")
//!     .with_secondary_label(Span::new(31..35), "also declared here")
//!     .with_help("rename one of the structs");
//!
//! assert_eq!(diag.to_string(), "error[E200]: duplicate struct `User`");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
