use crate::client::retrier::ErrorKind;
use crate::error::Result;
use crate::readiness::state::ProbeOutcome;
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt::{self as stdfmt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::{
    self as fmt_subscriber, format::Writer, FmtContext, FormatEvent, FormatFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "courtside";

pub fn init_tracing() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courtside=info,warn"));

    let stdout = std::io::stdout;
    let stderr = std::io::stderr;

    let writer = stdout
        .with_max_level(tracing::Level::INFO)
        .or_else(stderr.with_min_level(tracing::Level::WARN));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(false)
        .with_ansi(false)
        .event_format(KeyValueFormatter)
        .fmt_fields(fmt_subscriber::format::DefaultFields::new())
        .with_writer(writer)
        .try_init()
        .map_err(|err| crate::err!("failed to initialise tracing subscriber: {err}"))
}

struct KeyValueFormatter;

impl<S, N> FormatEvent<S, N> for KeyValueFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let metadata = event.metadata();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());

        let mut fields = visitor.fields;
        fields.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

        let mut line = String::new();
        push_field(&mut line, "ts", &timestamp);
        push_field(&mut line, "level", metadata.level().as_str());
        push_field(&mut line, "service", SERVICE_NAME);
        push_field(&mut line, "component", metadata.target());
        push_field(&mut line, "msg", &message);

        for (key, value) in fields {
            push_field(&mut line, &key, &value);
        }

        writer.write_str(&line)?;
        writer.write_char('\n')
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn record_field(&mut self, field: &Field, value: String) {
        if field.name().is_empty() {
            return;
        }
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_field(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        self.record_field(field, format!("{value:?}"));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_field(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_field(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_field(field, value.to_string());
    }
}

fn encode_field_value(value: &str) -> String {
    let needs_quotes = value.chars().any(|c| {
        c.is_whitespace()
            || matches!(
                c,
                '"' | '\\' | '=' | '[' | ']' | '{' | '}' | ',' | '\n' | '\r' | '\t'
            )
    });

    if !needs_quotes {
        return value.to_string();
    }

    let mut encoded = String::with_capacity(value.len() + 2);
    encoded.push('"');
    for ch in value.chars() {
        match ch {
            '"' => encoded.push_str("\\\""),
            '\\' => encoded.push_str("\\\\"),
            '\n' => encoded.push_str("\\n"),
            '\r' => encoded.push_str("\\r"),
            '\t' => encoded.push_str("\\t"),
            _ => encoded.push(ch),
        }
    }
    encoded.push('"');
    encoded
}

fn push_field(buffer: &mut String, key: &str, value: &str) {
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(key);
    buffer.push('=');
    buffer.push_str(&encode_field_value(value));
}

/// Process-wide counters for probe and request outcomes.
#[derive(Default)]
pub struct RuntimeCounters {
    probe_outcomes: OutcomeRegistry,
    keep_alive_pings: AtomicU64,
    keep_alive_failures: AtomicU64,
    cold_resets: AtomicU64,
    requests: RequestOutcomeRegistry,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeCountersSnapshot {
    pub probe_outcomes: Vec<(String, u64)>,
    pub keep_alive_pings: u64,
    pub keep_alive_failures: u64,
    pub cold_resets: u64,
    pub requests: Vec<RequestOutcomeSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOutcomeSnapshot {
    pub call: String,
    pub outcome: String,
    pub total: u64,
}

static RUNTIME_COUNTERS: OnceLock<RuntimeCounters> = OnceLock::new();

pub fn counters() -> &'static RuntimeCounters {
    RUNTIME_COUNTERS.get_or_init(RuntimeCounters::default)
}

impl RuntimeCounters {
    pub fn record_probe_outcome(&self, outcome: ProbeOutcome) {
        self.probe_outcomes.record(outcome.as_str());
    }

    pub fn record_keep_alive(&self, outcome: ProbeOutcome) {
        self.keep_alive_pings.fetch_add(1, Ordering::Relaxed);
        if !outcome.is_success() {
            self.keep_alive_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cold_reset(&self) {
        self.cold_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_success(&self, call: &str) {
        self.requests.record(call, "SUCCESS");
    }

    pub fn record_request_failure(&self, call: &str, kind: ErrorKind) {
        self.requests.record(call, kind.as_str());
    }

    pub fn snapshot(&self) -> RuntimeCountersSnapshot {
        RuntimeCountersSnapshot {
            probe_outcomes: self.probe_outcomes.snapshot(),
            keep_alive_pings: self.keep_alive_pings.load(Ordering::Relaxed),
            keep_alive_failures: self.keep_alive_failures.load(Ordering::Relaxed),
            cold_resets: self.cold_resets.load(Ordering::Relaxed),
            requests: self.requests.snapshot(),
        }
    }
}

#[derive(Default)]
struct OutcomeRegistry {
    inner: Mutex<BTreeMap<&'static str, u64>>,
}

impl OutcomeRegistry {
    fn record(&self, outcome: &'static str) {
        let mut guard = self.inner.lock().expect("probe outcome registry poisoned");
        *guard.entry(outcome).or_insert(0) += 1;
    }

    fn snapshot(&self) -> Vec<(String, u64)> {
        let guard = self.inner.lock().expect("probe outcome registry poisoned");
        guard
            .iter()
            .map(|(outcome, total)| (outcome.to_string(), *total))
            .collect()
    }
}

#[derive(Default)]
struct RequestOutcomeRegistry {
    inner: Mutex<BTreeMap<(String, &'static str), u64>>,
}

impl RequestOutcomeRegistry {
    fn record(&self, call: &str, outcome: &'static str) {
        let mut guard = self
            .inner
            .lock()
            .expect("request outcome registry poisoned");
        *guard.entry((call.to_string(), outcome)).or_insert(0) += 1;
    }

    fn snapshot(&self) -> Vec<RequestOutcomeSnapshot> {
        let guard = self
            .inner
            .lock()
            .expect("request outcome registry poisoned");
        guard
            .iter()
            .map(|((call, outcome), total)| RequestOutcomeSnapshot {
                call: call.clone(),
                outcome: outcome.to_string(),
                total: *total,
            })
            .collect()
    }
}
