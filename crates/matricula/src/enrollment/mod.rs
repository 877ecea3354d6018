//! Enrollment-request lifecycle: the three request variants, the
//! promotion-eligibility engine, and the unified matriculas view.

pub mod aggregate;
pub mod domain;
pub mod promotion;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    EnrollmentRequest, NewEnrollmentRequest, PromotionRequest, RequestKind, RequestRef,
    RequestStatus, RequestSummary, TransferRequest,
};
pub use repository::{NewRequestStore, PromotionRequestStore, TransferRequestStore};
pub use router::{matricula_router, request_router};
pub use service::EnrollmentService;
