use ulid::Ulid;

/// The metadata key a trace id propagates under on outbound gRPC calls
/// (§4.3, §6).
pub const TRACE_METADATA_KEY: &str = "x-finfocus-trace-id";

/// Correlation id for a single CLI invocation (§4.8). Source precedence:
/// `FINFOCUS_TRACE_ID` env var, then an existing value propagated from the
/// caller, then a fresh ULID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    id: String,
}

impl TraceContext {
    /// Resolve a trace id following the documented precedence. `propagated`
    /// is a value already in flight (e.g. inherited from a parent process or
    /// an earlier stage); it is consulted only if the environment variable
    /// is absent.
    pub fn resolve(propagated: Option<&str>) -> Self {
        if let Ok(env_id) = std::env::var("FINFOCUS_TRACE_ID") {
            if !env_id.is_empty() {
                return Self { id: env_id };
            }
        }
        if let Some(id) = propagated {
            if !id.is_empty() {
                return Self { id: id.to_string() };
            }
        }
        Self {
            id: Ulid::new().to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for TraceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
