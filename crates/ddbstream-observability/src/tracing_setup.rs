//! Tracing / logging initialisation helpers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type BoxSubscriber = Box<dyn tracing::Subscriber + Send + Sync>;

/// Stream that log lines are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Keeps stdout free for program output.
    #[default]
    Stderr,
    Stdout,
}

impl LogTarget {
    pub fn make_writer(self) -> BoxMakeWriter {
        match self {
            Self::Stderr => BoxMakeWriter::new(std::io::stderr),
            Self::Stdout => BoxMakeWriter::new(std::io::stdout),
        }
    }
}

/// Log level per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: crate name → level, e.g. `ddbstream-core = "trace"`
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
    /// Where log lines go (default: stderr)
    #[serde(default)]
    pub target: LogTarget,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: BTreeMap::new(),
            json: false,
            target: LogTarget::default(),
        }
    }
}

impl LogConfig {
    /// Raise one component to its own level.
    pub fn component(mut self, name: impl Into<String>, level: impl Into<String>) -> Self {
        self.components.insert(name.into(), level.into());
        self
    }

    /// `EnvFilter` directive string, e.g. `"info,ddbstream_core=trace"`.
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        for (component, level) in &self.components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup.
///
/// `RUST_LOG`, when set, takes precedence over the config.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    build_subscriber(filter, config.json, config.target.make_writer()).init();
}

fn build_subscriber(filter: EnvFilter, json: bool, writer: BoxMakeWriter) -> BoxSubscriber {
    if json {
        Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(writer)),
        )
    } else {
        Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(json: bool) -> String {
        let capture = Capture::default();
        let sink = capture.clone();
        let subscriber = build_subscriber(
            EnvFilter::new("info"),
            json,
            BoxMakeWriter::new(move || sink.clone()),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(records = 3, "Replaying batch");
        });
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn logs_default_to_stderr() {
        assert_eq!(LogConfig::default().target, LogTarget::Stderr);
        let cfg: LogConfig = serde_json::from_str(r#"{"target": "stdout"}"#).unwrap();
        assert_eq!(cfg.target, LogTarget::Stdout);
    }

    #[test]
    fn subscriber_writes_only_to_configured_writer() {
        let text = captured(false);
        assert!(text.contains("Replaying batch"));

        let json = captured(true);
        let line: serde_json::Value = serde_json::from_str(json.trim()).unwrap();
        assert_eq!(line["fields"]["message"], "Replaying batch");
    }

    #[test]
    fn directives_default_to_global_level() {
        assert_eq!(LogConfig::default().directives(), "info");
    }

    #[test]
    fn directives_normalise_component_names() {
        let cfg = LogConfig::default()
            .component("ddbstream-core", "trace")
            .component("ddbstream-cli", "debug");
        assert_eq!(
            cfg.directives(),
            "info,ddbstream_cli=debug,ddbstream_core=trace"
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: LogConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert!(cfg.json);
        assert_eq!(cfg.level, "info");
        assert!(cfg.components.is_empty());
    }
}
