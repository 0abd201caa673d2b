//! Resource Matcher (C1, re-exported from `finfocus-core`), Request
//! Validator (C2) and Source Router (C5): the ordered candidate chain
//! plugins -> local spec -> none (SPEC_FULL §4.1, §4.2, §4.5).

pub mod router;
pub mod validator;

pub use finfocus_core::ResourceMatcher;
pub use router::{candidates_for, Candidate};
pub use validator::{validate, ValidationFailure};
