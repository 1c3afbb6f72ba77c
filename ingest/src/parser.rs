//! Streaming export parser.
//!
//! Drives the pipeline end to end: XML events feed a [`TreeBuilder`]; each
//! completed top-level element is normalised, serialised to JSON, and handed
//! to a [`RecordSink`]. The sink is flushed once the input is exhausted.

use std::collections::BTreeMap;
use std::io::{BufReader, Read};

use chrono::{DateTime, TimeDelta, Utc};
use te_core::{IngestConfig, Node, normalise};
use te_sqlite::Store;
use tracing::{info, trace, warn};

use crate::builder::{CompletedElement, TreeBuilder};
use crate::error::{IngestError, Result};
use crate::event::{Event, EventReader};
use crate::sink::RecordSink;

/// Attribute holding the stable element identifier.
pub const IDENTIFIER_KEY: &str = "hjid";

/// Key used for elements without an identifier outside strict mode.
pub const MISSING_IDENTIFIER: &str = "<nil>";

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    /// Number of records handed to the sink.
    pub records: usize,
    /// Records per element type.
    pub by_type: BTreeMap<String, usize>,
    /// Elements persisted under [`MISSING_IDENTIFIER`].
    pub missing_identifiers: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestSummary {
    pub fn elapsed(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }
}

/// Parses TARIC exports with a given [`IngestConfig`].
///
/// # Examples
///
/// ```
/// use te_core::IngestConfig;
/// use te_ingest::{MemorySink, Parser};
///
/// let xml = "<r><a><b><Measure><hjid>1</hjid><sid>100</sid></Measure></b></a></r>";
/// let mut sink = MemorySink::default();
/// let summary = Parser::new(IngestConfig::default())
///     .parse(xml.as_bytes(), &mut sink)
///     .unwrap();
///
/// assert_eq!(summary.records, 1);
/// assert_eq!(sink.records[0].hjid, "1");
/// assert_eq!(sink.records[0].element_type, "Measure");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: IngestConfig,
}

impl Parser {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Reads the whole input, persisting every target-depth element.
    ///
    /// The first error aborts the run. Records already handed to the sink
    /// are not flushed in that case.
    ///
    /// # Errors
    ///
    /// Any [`IngestError`] variant; see its documentation.
    pub fn parse<R, S>(&self, input: R, sink: &mut S) -> Result<IngestSummary>
    where
        R: Read,
        S: RecordSink + ?Sized,
    {
        let started_at = Utc::now();
        info!(
            target_depth = self.config.target_depth,
            max_nesting = self.config.max_nesting,
            strict = self.config.strict,
            "Parsing export"
        );

        let mut events = EventReader::new(BufReader::new(input));
        let mut builder =
            TreeBuilder::with_max_nesting(self.config.target_depth, self.config.max_nesting);
        let mut summary = IngestSummary {
            records: 0,
            by_type: BTreeMap::new(),
            missing_identifiers: 0,
            started_at,
            finished_at: started_at,
        };

        loop {
            match events.next_event()? {
                Event::StartElement(_) => builder.start_element()?,
                Event::CharacterData(text) => builder.character_data(&text),
                Event::EndElement(name) => {
                    if let Some(element) = builder.end_element(&name)? {
                        self.persist(element, sink, &mut summary)?;
                    }
                }
                Event::EndOfInput => break,
            }
        }
        builder.finish()?;

        sink.flush().map_err(IngestError::Flush)?;
        summary.finished_at = Utc::now();
        info!(
            records = summary.records,
            types = summary.by_type.len(),
            elapsed_ms = summary.elapsed().num_milliseconds(),
            "Finished parsing export"
        );
        Ok(summary)
    }

    fn persist<S>(&self, element: CompletedElement, sink: &mut S, summary: &mut IngestSummary) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let CompletedElement { element_type, node } = element;
        let normalised = normalise(node);

        let hjid = match identifier(&normalised) {
            Some(id) => id.to_string(),
            None if self.config.strict => {
                return Err(IngestError::MissingIdentifier { element_type });
            }
            None => {
                warn!(element_type = %element_type, "Element has no hjid, storing under sentinel key");
                summary.missing_identifiers += 1;
                MISSING_IDENTIFIER.to_string()
            }
        };

        let payload = serde_json::to_string(&normalised).map_err(|source| IngestError::Serialise {
            hjid: hjid.clone(),
            source,
        })?;

        sink.insert(&hjid, &element_type, &payload)
            .map_err(|source| IngestError::Store {
                hjid: hjid.clone(),
                element_type: element_type.clone(),
                source,
            })?;
        trace!(hjid = %hjid, element_type = %element_type, "Stored element");

        summary.records += 1;
        *summary.by_type.entry(element_type).or_default() += 1;
        Ok(())
    }
}

/// The element's scalar `hjid`, if it has one.
pub fn identifier(node: &Node) -> Option<&str> {
    node.scalar(IDENTIFIER_KEY)
}

/// Parses `input` into `store` with the default configuration.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse<R: Read>(input: R, store: &mut Store) -> Result<IngestSummary> {
    Parser::default().parse(input, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn wrap(inner: &str) -> String {
        format!("<root><l2><l3>{inner}</l3></l2></root>")
    }

    #[test]
    fn test_identifier_requires_scalar() {
        let mut node = Node::new();
        assert_eq!(identifier(&node), None);
        node.insert(IDENTIFIER_KEY, te_core::Value::from("9"));
        assert_eq!(identifier(&node), Some("9"));
    }

    #[test]
    fn test_missing_identifier_uses_sentinel() {
        let xml = wrap("<Measure><sid>1</sid></Measure>");
        let mut sink = MemorySink::default();
        let summary = Parser::default().parse(xml.as_bytes(), &mut sink).unwrap();
        assert_eq!(sink.records[0].hjid, MISSING_IDENTIFIER);
        assert_eq!(summary.missing_identifiers, 1);
    }

    #[test]
    fn test_missing_identifier_rejected_when_strict() {
        let xml = wrap("<Measure><sid>1</sid></Measure>");
        let parser = Parser::new(IngestConfig {
            strict: true,
            ..IngestConfig::default()
        });
        let mut sink = MemorySink::default();
        let err = parser.parse(xml.as_bytes(), &mut sink).unwrap_err();
        assert!(matches!(err, IngestError::MissingIdentifier { ref element_type } if element_type == "Measure"));
        assert_eq!(sink.flushes, 0);
    }

    #[test]
    fn test_summary_counts_by_type() {
        let xml = wrap(
            "<Measure><hjid>1</hjid></Measure>\
             <Footnote><hjid>2</hjid></Footnote>\
             <Measure><hjid>3</hjid></Measure>",
        );
        let mut sink = MemorySink::default();
        let summary = Parser::default().parse(xml.as_bytes(), &mut sink).unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.by_type["Measure"], 2);
        assert_eq!(summary.by_type["Footnote"], 1);
        assert_eq!(sink.flushes, 1);
        assert!(summary.elapsed() >= TimeDelta::zero());
    }

    #[test]
    fn test_configurable_target_depth() {
        let xml = "<root><Item><hjid>1</hjid></Item><Item><hjid>2</hjid></Item></root>";
        let parser = Parser::new(IngestConfig {
            target_depth: 2,
            ..IngestConfig::default()
        });
        let mut sink = MemorySink::default();
        parser.parse(xml.as_bytes(), &mut sink).unwrap();
        let ids: Vec<_> = sink.records.iter().map(|r| r.hjid.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn test_truncated_input_is_error() {
        let xml = "<root><l2><l3><Measure><hjid>1</hjid></Measure>";
        let mut sink = MemorySink::default();
        assert!(Parser::default().parse(xml.as_bytes(), &mut sink).is_err());
        assert_eq!(sink.flushes, 0);
    }
}
