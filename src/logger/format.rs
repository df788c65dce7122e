//! Event formatters for the console and file sinks.
//!
//! - [`ConsoleFormat`]: `2026-10-18 09:30:00 - [i] INFO     - message key=value`
//! - [`TextFormat`]: `2026-10-18 09:30:00 | INFO     | app::module:42 | message key=value`
//! - [`JsonFormat`]: one JSON object per line.
//!
//! All three write a complete line per event, so a sink never sees a
//! partial record.

use std::fmt;

use chrono::{Local, SecondsFormat};
use console::Style;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields, format::Writer},
    registry::LookupSpan,
};

use super::severity::{SEVERITY_FIELD, Severity};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field values of a single event, split into message, severity tag and extras.
#[derive(Debug, Default)]
pub(crate) struct EventFields {
    pub message: String,
    pub severity: Option<String>,
    pub fields: Map<String, Value>,
}

impl EventFields {
    pub fn from_event(event: &Event<'_>) -> Self {
        let mut visitor = Self::default();
        event.record(&mut visitor);
        visitor
    }

    fn insert(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => {
                self.message = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                }
            }
            SEVERITY_FIELD => self.severity = value.as_str().map(str::to_owned),
            name => {
                self.fields.insert(name.to_owned(), value);
            }
        }
    }

    fn write_extras(&self, writer: &mut Writer<'_>) -> fmt::Result {
        for (key, value) in &self.fields {
            match value {
                Value::String(s) => write!(writer, " {key}={s}")?,
                other => write!(writer, " {key}={other}")?,
            }
        }
        Ok(())
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

/// Colourised single-line console format. Colour follows the writer's ANSI setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let fields = EventFields::from_event(event);
        let severity = Severity::resolve(event.metadata().level(), fields.severity.as_deref());
        let timestamp = Local::now().format(TIME_FORMAT).to_string();
        let level = format!("{} {:<8}", severity.icon(), severity.name());

        if writer.has_ansi_escapes() {
            let time_style = Style::new().force_styling(true).green();
            write!(
                writer,
                "{} - {} - ",
                time_style.apply_to(timestamp),
                severity.style().apply_to(level)
            )?;
        } else {
            write!(writer, "{timestamp} - {level} - ")?;
        }

        write!(writer, "{}", fields.message)?;
        fields.write_extras(&mut writer)?;
        writeln!(writer)
    }
}

/// Plain-text file format with source location, used in development.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormat;

impl<S, N> FormatEvent<S, N> for TextFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let fields = EventFields::from_event(event);
        let severity = Severity::resolve(meta.level(), fields.severity.as_deref());
        let module = meta.module_path().unwrap_or_else(|| meta.target());

        write!(
            writer,
            "{} | {:<8} | {}:{} | {}",
            Local::now().format(TIME_FORMAT),
            severity.name(),
            module,
            meta.line().unwrap_or(0),
            fields.message
        )?;
        fields.write_extras(&mut writer)?;
        writeln!(writer)
    }
}

#[derive(Debug, Serialize)]
struct SpanRecord {
    name: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    fields: String,
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    level: &'static str,
    icon: &'static str,
    message: String,
    target: &'a str,
    module: Option<&'a str>,
    file: Option<&'a str>,
    line: Option<u32>,
    thread: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    spans: Vec<SpanRecord>,
}

/// JSON-lines format with full metadata, used in production.
///
/// An `error` field is lifted into `exception`; every other field lands
/// under `fields`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let EventFields {
            message,
            severity,
            mut fields,
        } = EventFields::from_event(event);
        let severity = Severity::resolve(meta.level(), severity.as_deref());
        let exception = fields.remove("error");

        let mut spans = Vec::new();
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let fields = span
                    .extensions()
                    .get::<FormattedFields<N>>()
                    .map(|f| f.fields.clone())
                    .unwrap_or_default();
                spans.push(SpanRecord {
                    name: span.name(),
                    fields,
                });
            }
        }

        let thread = std::thread::current();
        let record = JsonRecord {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            level: severity.name(),
            icon: severity.icon(),
            message,
            target: meta.target(),
            module: meta.module_path(),
            file: meta.file(),
            line: meta.line(),
            thread: thread
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{:?}", thread.id())),
            fields,
            exception,
            spans,
        };

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}
