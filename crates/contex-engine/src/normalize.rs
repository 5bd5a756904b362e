//! Normalization (spec §4.7 step 1, §9 "dynamic payloads → tagged
//! variants"): turn the raw wire representation of a published record
//! (`json|yaml|toml|xml|csv|text`) into canonical `serde_json::Value`
//! before anything downstream touches it. No precedent in the teacher for
//! multi-format ingestion; grounded on its general discipline of
//! normalizing heterogeneous input into typed JSON trees at the boundary
//! (`rootsignal-domains::extraction::activities::normalize`).

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Yaml,
    Toml,
    Xml,
    Csv,
    Text,
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid xml: {0}")]
    Xml(String),
}

impl From<NormalizeError> for contex_core::ContexError {
    fn from(err: NormalizeError) -> Self {
        contex_core::ContexError::validation(err.to_string())
    }
}

/// Parses `raw` per `format` into canonical JSON.
pub fn normalize(raw: &str, format: DataFormat) -> Result<Value, NormalizeError> {
    match format {
        DataFormat::Json => Ok(serde_json::from_str(raw)?),
        DataFormat::Yaml => {
            let value: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(value).unwrap_or(Value::Null))
        }
        DataFormat::Toml => {
            let value: toml::Value = raw.parse().map_err(NormalizeError::Toml)?;
            Ok(serde_json::to_value(value).unwrap_or(Value::Null))
        }
        DataFormat::Xml => xml::xml_to_json(raw),
        DataFormat::Csv => csv::Reader::from_reader(raw.as_bytes())
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(NormalizeError::from)
            .and_then(|records| csv_records_to_json(raw, records)),
        DataFormat::Text => Ok(Value::String(raw.to_string())),
    }
}

fn csv_records_to_json(raw: &str, _records: Vec<csv::StringRecord>) -> Result<Value, NormalizeError> {
    // Re-read with headers available (csv::Reader consumes headers lazily
    // on first `records()` call, so a fresh reader is simplest here).
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(raw.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = serde_json::Map::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), Value::String(field.to_string()));
        }
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

mod xml {
    use super::{NormalizeError, Value};
    use quick_xml::events::{BytesStart, Event};
    use quick_xml::reader::Reader;

    pub fn xml_to_json(input: &str) -> Result<Value, NormalizeError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text = true;
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| NormalizeError::Xml(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    let name = element_name(&start);
                    let value = parse_element_body(&mut reader, &start)?;
                    return Ok(Value::Object(serde_json::Map::from_iter([(name, value)])));
                }
                Event::Empty(start) => {
                    let name = element_name(&start);
                    let value = Value::Object(parse_attrs(&start)?);
                    return Ok(Value::Object(serde_json::Map::from_iter([(name, value)])));
                }
                Event::Eof => return Err(NormalizeError::Xml("document has no root element".to_string())),
                _ => {}
            }
            buf.clear();
        }
    }

    fn parse_element_body(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Value, NormalizeError> {
        let mut attrs = parse_attrs(start)?;
        let mut text = String::new();
        let mut children: Vec<(String, Value)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| NormalizeError::Xml(e.to_string()))?;
            match event {
                Event::Start(child) => {
                    let name = element_name(&child);
                    let value = parse_element_body(reader, &child)?;
                    children.push((name, value));
                }
                Event::Empty(child) => {
                    let name = element_name(&child);
                    children.push((name, Value::Object(parse_attrs(&child)?)));
                }
                Event::Text(t) => {
                    text.push_str(&t.unescape().map_err(|e| NormalizeError::Xml(e.to_string()))?);
                }
                Event::End(_) => break,
                Event::Eof => return Err(NormalizeError::Xml("unexpected end of document".to_string())),
                _ => {}
            }
            buf.clear();
        }

        if children.is_empty() {
            let trimmed = text.trim();
            if attrs.is_empty() {
                return Ok(if trimmed.is_empty() { Value::Null } else { Value::String(trimmed.to_string()) });
            }
            if !trimmed.is_empty() {
                attrs.insert("#text".to_string(), Value::String(trimmed.to_string()));
            }
            return Ok(Value::Object(attrs));
        }

        // Repeated child tags become arrays; a tag seen once stays scalar.
        let mut grouped = serde_json::Map::new();
        for (name, value) in children {
            match grouped.get_mut(&name) {
                Some(Value::Array(arr)) => arr.push(value),
                Some(existing) => {
                    let previous = existing.clone();
                    grouped.insert(name, Value::Array(vec![previous, value]));
                }
                None => {
                    grouped.insert(name, value);
                }
            }
        }
        for (k, v) in attrs {
            grouped.insert(k, v);
        }
        Ok(Value::Object(grouped))
    }

    fn element_name(e: &BytesStart) -> String {
        String::from_utf8_lossy(e.name().as_ref()).into_owned()
    }

    fn parse_attrs(e: &BytesStart) -> Result<serde_json::Map<String, Value>, NormalizeError> {
        let mut map = serde_json::Map::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| NormalizeError::Xml(e.to_string()))?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|e| NormalizeError::Xml(e.to_string()))?
                .into_owned();
            map.insert(key, Value::String(value));
        }
        Ok(map)
    }
}
