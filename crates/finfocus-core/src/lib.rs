//! Domain types, error taxonomy and correlation context shared by every
//! FinFocus crate: the descriptor/query/result model, the plugin candidate
//! chain, and the secrets-redaction helper used by both logging and error
//! text.

pub mod descriptor;
pub mod error;
pub mod matcher;
pub mod redact;
pub mod source;
pub mod trace;

pub use descriptor::{
    Bundle, CostQuery, CostResult, CostSample, ImpactMetric, MetricKind, QueryKind,
    ResourceDescriptor, SampleBucket, SourceCandidate,
};
pub use error::{CoreError, ErrorDetail, ErrorKind};
pub use matcher::ResourceMatcher;
pub use source::CostSource;
pub use trace::TraceContext;
