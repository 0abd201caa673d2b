//! Secrets redaction and volatile-fragment stripping shared by logging and
//! the error fingerprint (§4.9).

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches `key=value` / `key: value` pairs whose key looks sensitive.
/// Applied to both log fields and error/result text before it leaves the
/// process boundary.
static SECRET_KV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(token|secret|key|password|authorization)\b\s*[:=]\s*("?)([^\s"&]+)("?)"#)
        .expect("secret kv pattern is valid")
});

/// Strips volatile fragments (loopback ports, PIDs, temp paths) so two
/// otherwise-identical errors fingerprint the same across runs.
static PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r":\d{2,5}\b").expect("port pattern is valid"));
static PID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bpid[=: ]\d+\b").expect("pid pattern is valid"));
static TMP_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/tmp/[^\s]+").expect("tmp path pattern is valid"));

/// Redact sensitive key/value pairs in `text`, replacing the value with
/// `***`. Keys matching `(?i)(token|secret|key|password|authorization)`.
pub fn redact_secrets(text: &str) -> String {
    SECRET_KV
        .replace_all(text, |caps: &regex::Captures| {
            format!("{}={}***{}", &caps[1], &caps[2], &caps[4])
        })
        .into_owned()
}

/// Strip volatile fragments (ports, PIDs, temp paths) that would otherwise
/// make fingerprints of the same underlying error diverge across runs.
pub fn strip_volatile(text: &str) -> String {
    let text = PORT.replace_all(text, ":<port>");
    let text = PID.replace_all(&text, "pid=<pid>");
    TMP_PATH.replace_all(&text, "/tmp/<path>").into_owned()
}

/// Full sanitization pipeline applied before a message crosses into an
/// `ErrorDetail` or a log line: redact secrets, then strip volatile
/// fragments.
pub fn sanitize(text: &str) -> String {
    strip_volatile(&redact_secrets(text))
}
