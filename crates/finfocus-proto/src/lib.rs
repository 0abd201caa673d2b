//! Generated gRPC client/server stubs for the FinFocus plugin wire protocol.
//! The `.proto` in `proto/finfocus.proto` is the single source of truth; see
//! SPEC_FULL.md §6 for the prose description this mirrors.

tonic::include_proto!("finfocus.v1");

pub const TRACE_METADATA_KEY: &str = "x-finfocus-trace-id";
