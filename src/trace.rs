//! Execution tracing hooks.
//!
//! The engine never executes commands. A caller that does can hand the
//! command to a [`Tracer`] before and after running it; [`LogTracer`] writes
//! both events through `tracing`.

use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::command::{DbCommand, DbParameter};

/// What a tracer sees of one execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceLog {
    /// Correlates the before and after events.
    pub id: Uuid,
    pub operation: String,
    pub text: String,
    pub parameters: Vec<DbParameter>,
}

impl TraceLog {
    pub fn new(operation: impl Into<String>, command: &DbCommand) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation: operation.into(),
            text: command.text().to_string(),
            parameters: command.parameters().to_vec(),
        }
    }
}

pub trait Tracer: Send + Sync {
    fn before_execution(&self, log: &TraceLog);

    fn after_execution(&self, log: &TraceLog, elapsed: Duration);
}

/// Forwards trace events to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn before_execution(&self, log: &TraceLog) {
        tracing::debug!(
            "[{}] {} executing: {} ({} parameters)",
            log.id,
            log.operation,
            log.text,
            log.parameters.len()
        );
    }

    fn after_execution(&self, log: &TraceLog, elapsed: Duration) {
        tracing::debug!("[{}] {} done in {:?}", log.id, log.operation, elapsed);
    }
}

/// Run `execute` between the tracer's before and after events.
pub fn traced<T>(tracer: &dyn Tracer, log: &TraceLog, execute: impl FnOnce() -> T) -> T {
    tracer.before_execution(log);
    let started = Instant::now();
    let result = execute();
    tracer.after_execution(log, started.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Tracer for Recorder {
        fn before_execution(&self, log: &TraceLog) {
            self.events.lock().unwrap().push(format!("before {}", log.text));
        }

        fn after_execution(&self, log: &TraceLog, _elapsed: Duration) {
            self.events.lock().unwrap().push(format!("after {}", log.operation));
        }
    }

    #[test]
    fn test_log_carries_command() {
        let mut cmd = DbCommand::new(Arc::from("DELETE FROM [Person] WHERE [Id] = @Id;"));
        cmd.set("Id", Value::Int(7), None);
        let log = TraceLog::new("Delete", &cmd);
        assert_eq!(log.text, cmd.text());
        assert_eq!(log.parameters[0].value, Value::Int(7));
    }

    #[test]
    fn test_traced_wraps_execution() {
        let cmd = DbCommand::new(Arc::from("SELECT 1;"));
        let log = TraceLog::new("Query", &cmd);
        let recorder = Recorder::default();
        let rows = traced(&recorder, &log, || 3);
        assert_eq!(rows, 3);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["before SELECT 1;".to_string(), "after Query".to_string()]
        );
        traced(&LogTracer, &log, || ());
    }
}
