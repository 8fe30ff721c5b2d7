use std::time::Instant;

/// Observability capability the use case threads around expensive calls.
/// Purely informational: implementations must not affect correctness, and
/// tests use the no-op.
///
/// A segment ends when its guard is dropped.
pub trait Instrumentor {
    type Segment;

    fn log(&self, message: &str);

    /// Times a named operation.
    fn segment(&self, name: &'static str) -> Self::Segment;

    /// Times a datastore round-trip, annotated with the collection touched
    /// and a short query description.
    fn data_segment(
        &self,
        collection: &'static str,
        operation: &'static str,
        query: &str,
    ) -> Self::Segment;
}

/// Does nothing. The default choice for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumentor;

impl Instrumentor for NoopInstrumentor {
    type Segment = ();

    fn log(&self, _message: &str) {}

    fn segment(&self, _name: &'static str) -> Self::Segment {}

    fn data_segment(
        &self,
        _collection: &'static str,
        _operation: &'static str,
        _query: &str,
    ) -> Self::Segment {
    }
}

/// Emits `tracing` events: logs at info, segment timings at debug on drop.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumentor;

pub struct TracingSegment {
    name: &'static str,
    detail: Option<String>,
    started: Instant,
}

impl Drop for TracingSegment {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        match &self.detail {
            Some(detail) => {
                tracing::debug!(segment = self.name, %detail, elapsed_ms, "segment finished");
            }
            None => tracing::debug!(segment = self.name, elapsed_ms, "segment finished"),
        }
    }
}

impl Instrumentor for TracingInstrumentor {
    type Segment = TracingSegment;

    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn segment(&self, name: &'static str) -> Self::Segment {
        TracingSegment {
            name,
            detail: None,
            started: Instant::now(),
        }
    }

    fn data_segment(
        &self,
        collection: &'static str,
        operation: &'static str,
        query: &str,
    ) -> Self::Segment {
        TracingSegment {
            name: operation,
            detail: Some(format!("{collection}: {query}")),
            started: Instant::now(),
        }
    }
}
