use tracing::info;

/// Sink for operational log lines, handed to components at construction.
pub trait OpLog: Send + Sync + 'static {
    fn info(&self, message: &str);
}

/// Forwards to `tracing` at info level, tagged with the owning component.
#[derive(Debug, Clone)]
pub struct TracingLog {
    component: &'static str,
}

impl TracingLog {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl OpLog for TracingLog {
    fn info(&self, message: &str) {
        info!(component = self.component, "{message}");
    }
}

#[cfg(test)]
pub(crate) use recording::RecordingLog;
