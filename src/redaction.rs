use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::io::Write;

lazy_static! {
    // Query-string keys, raw Google API keys, bearer tokens.
    static ref REDACTION_REGEX: Regex = Regex::new(
        r#"(?i)(key=[^&\s"']+|AIza[0-9A-Za-z_\-]{20,}|Bearer\s+[^\s]+|x-goog-api-key:\s*[^\s]+)"#
    ).expect("Invalid redaction regex");
}

/// Longer base64 blobs under a `data` key are replaced rather than logged.
const MAX_LOGGED_DATA_CHARS: usize = 100;

pub fn redact_str(input: &str) -> std::borrow::Cow<'_, str> {
    REDACTION_REGEX.replace_all(input, "[REDACTED]")
}

const SECRET_KEY_SUFFIXES: &[&str] = &[
    "key",
    "token",
    "secret",
    "password",
    "authorization",
    "cookie",
];

/// Matches on the whole key name (`apiKey`, `access_token`, `X-Goog-Api-Key`),
/// so counters such as `maxOutputTokens` stay readable.
fn is_secret_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| !matches!(c, '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect();
    SECRET_KEY_SUFFIXES
        .iter()
        .any(|suffix| normalized.ends_with(suffix))
}

/// Masks credentials and inline media payloads in a JSON value before it is logged.
pub fn redact_value(v: &mut Value) {
    match v {
        Value::Object(map) => {
            for (k, val) in map.iter_mut() {
                if is_secret_key(k) {
                    *val = Value::String("[REDACTED]".to_string());
                    continue;
                }

                let large_blob = k.eq_ignore_ascii_case("data")
                    && val
                        .as_str()
                        .map_or(false, |s| s.len() > MAX_LOGGED_DATA_CHARS);
                if large_blob {
                    *val = Value::String("[REDACTED-DATA]".to_string());
                } else {
                    redact_value(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr {
                redact_value(val);
            }
        }
        _ => {}
    }
}

/// Scrubs every formatted log line on its way to the sink.
pub struct RedactingWriter<W: Write> {
    inner: W,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        self.inner.write_all(redact_str(&input).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
