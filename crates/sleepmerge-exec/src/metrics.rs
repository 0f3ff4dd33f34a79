//! Per-stage metric events.
//!
//! Emitted through `tracing`; the binary decides where they go.

pub fn emit_stage(stage: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "sleepmerge", stage);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::debug!(%stage, %k, %v, "metric");
    }
}
