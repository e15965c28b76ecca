use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::bufread::GzDecoder;
use quick_xml::{escape::unescape, events::BytesStart, Reader};
use serde::{Deserialize, Serialize};

use super::constants::TIMESTAMP;
use super::event_log_struct::{
    Attribute, AttributeValue, Attributes, Event, EventLog, Trace, XESEditableAttribute,
};

///
/// Error encountered while parsing XES
///
#[derive(Debug, thiserror::Error)]
pub enum XESParseError {
    /// IO error
    #[error("failed to read XES: {0}")]
    IOError(#[from] std::io::Error),
    /// XML error (e.g., incorrect XML format)
    #[error("failed to parse XES XML: {0}")]
    XMLParsingError(#[from] quick_xml::Error),
    /// There is no top-level `<log>`
    #[error("XES has no top-level <log> element")]
    NoTopLevelLog,
    /// An `<event>` was encountered outside of an open `<trace>`
    #[error("XES contains an <event> outside of a <trace>")]
    EventOutsideTrace,
    /// Missing key on XML element (with expected key included)
    #[error("XES element is missing the XML attribute `{0}`")]
    MissingKey(&'static str),
    /// Invalid value of XML attribute with key (with key included)
    #[error("XES element has an invalid value for XML attribute `{0}`")]
    InvalidKeyValue(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
///
/// Options for XES Import
///
pub struct XESImportOptions {
    /// Optional date format to use when parsing `DateTimes` (first trying [`chrono::DateTime`] then falling back to [`chrono::NaiveDateTime`] with UTC timezone).
    ///
    /// Will fall back to default formats (e.g., rfc3339) if parsing fails using passed `date_format`
    pub date_format: Option<String>,
    /// Stable-sort the events of every trace by their `time:timestamp` value
    ///
    /// Events without a valid timestamp are placed before all other events.
    pub sort_events_by_timestamp: bool,
}

/// Which element attributes are currently attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Log,
    Trace,
    Event,
    GlobalTraceAttributes,
    GlobalEventAttributes,
}

/// Parse XES from the given reader
pub fn import_xes<T>(reader: T, options: XESImportOptions) -> Result<EventLog, XESParseError>
where
    T: BufRead,
{
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut log = EventLog::default();
    let mut global_trace_attrs = Attributes::new();
    let mut global_event_attrs = Attributes::new();
    let mut current_trace: Option<Trace> = None;
    let mut mode = Mode::Log;
    let mut encountered_log = false;
    // Depth of nested attributes (children of lists/containers) below the current one
    let mut nested_depth: usize = 0;
    let mut buf = Vec::new();

    loop {
        let (element, has_children) = match reader.read_event_into(&mut buf)? {
            quick_xml::events::Event::Start(t) => (t.into_owned(), true),
            quick_xml::events::Event::Empty(t) => (t.into_owned(), false),
            quick_xml::events::Event::End(t) => {
                match t.name().as_ref() {
                    b"trace" => {
                        if let Some(trace) = current_trace.take() {
                            log.traces.push(trace);
                        }
                        mode = Mode::Log;
                    }
                    b"event" => mode = Mode::Trace,
                    b"global" => mode = Mode::Log,
                    _ => nested_depth = nested_depth.saturating_sub(1),
                }
                buf.clear();
                continue;
            }
            quick_xml::events::Event::Eof => break,
            _ => {
                buf.clear();
                continue;
            }
        };
        match element.name().as_ref() {
            b"log" => encountered_log = true,
            b"trace" => {
                let trace = Trace::default();
                if has_children {
                    mode = Mode::Trace;
                    current_trace = Some(trace);
                } else {
                    log.traces.push(trace);
                }
            }
            b"event" => {
                let trace = current_trace
                    .as_mut()
                    .ok_or(XESParseError::EventOutsideTrace)?;
                trace.events.push(Event {
                    attributes: Attributes::with_capacity(4),
                });
                if has_children {
                    mode = Mode::Event;
                }
            }
            b"global" => {
                let scope = element
                    .try_get_attribute("scope")
                    .ok()
                    .flatten()
                    .ok_or(XESParseError::MissingKey("scope"))?;
                mode = match scope.value.as_ref() {
                    b"trace" => Mode::GlobalTraceAttributes,
                    b"event" => Mode::GlobalEventAttributes,
                    _ => return Err(XESParseError::InvalidKeyValue("scope")),
                };
                if !has_children {
                    mode = Mode::Log;
                }
            }
            b"extension" | b"classifier" => {}
            _ => {
                if !encountered_log {
                    return Err(XESParseError::NoTopLevelLog);
                }
                if nested_depth == 0 {
                    let attr = parse_attribute_from_tag(&element, &options)?;
                    let target = match mode {
                        Mode::Log => Some(&mut log.attributes),
                        Mode::GlobalTraceAttributes => Some(&mut global_trace_attrs),
                        Mode::GlobalEventAttributes => Some(&mut global_event_attrs),
                        Mode::Trace => current_trace.as_mut().map(|t| &mut t.attributes),
                        Mode::Event => current_trace
                            .as_mut()
                            .and_then(|t| t.events.last_mut())
                            .map(|e| &mut e.attributes),
                    };
                    if let Some(target) = target {
                        target.add_attribute(attr);
                    }
                }
                if has_children {
                    nested_depth += 1;
                }
            }
        }
        buf.clear();
    }

    if !encountered_log {
        return Err(XESParseError::NoTopLevelLog);
    }
    if options.sort_events_by_timestamp {
        let global_ts = global_event_attrs
            .get_by_key(TIMESTAMP)
            .and_then(|a| a.value.try_as_date())
            .copied();
        log.traces.iter_mut().for_each(|t| {
            t.events.sort_by_key(|e| {
                e.attributes
                    .get_by_key(TIMESTAMP)
                    .and_then(|a| a.value.try_as_date())
                    .copied()
                    .or(global_ts)
            })
        });
    }
    if !global_trace_attrs.is_empty() {
        log.global_trace_attrs = Some(global_trace_attrs);
    }
    if !global_event_attrs.is_empty() {
        log.global_event_attrs = Some(global_event_attrs);
    }
    Ok(log)
}

fn get_attribute_string(t: &BytesStart<'_>, key: &'static str) -> Option<String> {
    t.try_get_attribute(key)
        .ok()
        .flatten()
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

fn parse_attribute_from_tag(
    t: &BytesStart<'_>,
    options: &XESImportOptions,
) -> Result<Attribute, XESParseError> {
    let key = get_attribute_string(t, "key").ok_or(XESParseError::MissingKey("key"))?;
    let value = get_attribute_string(t, "value").unwrap_or_default();
    let attribute_val = match t.name().as_ref() {
        b"string" | b"id" => AttributeValue::String(
            unescape(value.as_str())
                .unwrap_or(value.as_str().into())
                .into(),
        ),
        b"date" => match parse_date_from_str(&value, &options.date_format) {
            Some(dt) => AttributeValue::Date(dt),
            None => {
                tracing::warn!("Failed to parse date from {:?}", value);
                AttributeValue::None()
            }
        },
        b"int" => value
            .parse::<i64>()
            .map(AttributeValue::Int)
            .unwrap_or_else(|e| {
                tracing::warn!("Could not parse integer {:?}: {}", value, e);
                AttributeValue::None()
            }),
        b"float" => value
            .parse::<f64>()
            .map(AttributeValue::Float)
            .unwrap_or_else(|e| {
                tracing::warn!("Could not parse float {:?}: {}", value, e);
                AttributeValue::None()
            }),
        b"boolean" => value
            .parse::<bool>()
            .map(AttributeValue::Boolean)
            .unwrap_or_else(|e| {
                tracing::warn!("Could not parse boolean {:?}: {}", value, e);
                AttributeValue::None()
            }),
        // Children of lists and containers are skipped
        b"container" | b"list" => AttributeValue::None(),
        other => {
            tracing::warn!(
                "Attribute type not implemented '{}'",
                String::from_utf8_lossy(other)
            );
            AttributeValue::None()
        }
    };
    Ok(Attribute::new(key, attribute_val))
}

fn parse_date_from_str(value: &str, date_format: &Option<String>) -> Option<DateTime<Utc>> {
    if let Some(date_format) = &date_format {
        if let Ok(dt) = DateTime::parse_from_str(value, date_format) {
            return Some(dt.into());
        }
        // Without time-zone information, assume UTC
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, date_format) {
            return Some(dt.and_utc());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.into());
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S:%f%:z") {
        return Some(dt.into());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }

    None
}

///
/// Import a XES [`EventLog`] from a file path
///
/// Files ending in `.gz` are decompressed on the fly
///
pub fn import_xes_file<P: AsRef<Path>>(
    path: P,
    options: XESImportOptions,
) -> Result<EventLog, XESParseError> {
    let is_gz = path
        .as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    let file = File::open(path)?;
    if is_gz {
        let dec = GzDecoder::new(BufReader::new(file));
        import_xes(BufReader::new(dec), options)
    } else {
        import_xes(BufReader::new(file), options)
    }
}

///
/// Import a XES [`EventLog`] directly from a string
///
pub fn import_xes_str(xes_str: &str, options: XESImportOptions) -> Result<EventLog, XESParseError> {
    import_xes(BufReader::new(xes_str.as_bytes()), options)
}

///
/// Import a XES [`EventLog`] from a byte slice (&\[u8\])
///
/// * `is_compressed_gz`: Parse the passed `xes_data` as a compressed .gz archive
///
pub fn import_xes_slice(
    xes_data: &[u8],
    is_compressed_gz: bool,
    options: XESImportOptions,
) -> Result<EventLog, XESParseError> {
    if is_compressed_gz {
        let gz: GzDecoder<&[u8]> = GzDecoder::new(xes_data);
        return import_xes(BufReader::new(gz), options);
    }
    import_xes(BufReader::new(xes_data), options)
}
