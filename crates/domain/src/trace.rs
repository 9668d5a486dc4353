use serde::Serialize;

/// Structured session milestones emitted by the telemetry daemon.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    Connected {
        authority: String,
    },
    ConnectFailed {
        authority: String,
        consecutive_failures: u64,
        error: String,
    },
    MeasurementRecorded {
        channel: u8,
        sensor_id: u64,
        value: f64,
        measurement_id: u64,
    },
    PassCompleted {
        channels: usize,
        successful_passes: u64,
    },
    PassFailed {
        error: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "fl_event");
    }
}
