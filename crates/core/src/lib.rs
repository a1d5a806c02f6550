//! `usageql-core`: pure building blocks of the query gateway.
//!
//! This crate contains **no IO**: identifiers, the candidate/result data model,
//! request/response shapes, and the two textual guards every candidate query
//! must pass before it may reach the store.

pub mod candidate;
pub mod error;
pub mod guard;
pub mod id;
pub mod request;
pub mod response;
pub mod result;

pub use candidate::{QueryCandidate, QueryOrigin};
pub use error::{DomainError, DomainResult};
pub use guard::{DenyReason, Verdict, evaluate, has_isolation, validate_candidate};
pub use id::TenantId;
pub use request::{MAX_QUESTION_CHARS, QueryRequest};
pub use response::{HealthResponse, QueryResponse};
pub use result::{ExecutionResult, RowMap};
