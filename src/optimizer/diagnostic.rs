/// Destination for optimizer diagnostics. Implementations receive one
/// formatted message per pruning pass that actually changed the query.
pub trait DiagnosticSink {
    fn notice(&self, message: &str);
}

/// Sink that forwards diagnostics to the `tracing` subscriber.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn notice(&self, message: &str) {
        tracing::info!("{}", message);
    }
}
