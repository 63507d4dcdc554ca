//! External register definition import
//!
//! Reads the line-oriented register definition files published for the
//! ESP-based Altherma monitors. Each relevant line is a commented-out C
//! initialiser:
//!
//! ```text
//! //{0x10,0,217,1,-1,"Operation Mode"},
//! ```
//!
//! holding the registry (page) id, the offset of the field within the page
//! data, a conversion id, the data size in bytes, a data type and a label.
//! Every other line is ignored.

use crate::field::{ByteOrder, FieldDecoder, FixedPoint};
use crate::table::{CommandDecoder, DecoderTable};
use crate::types::{DecoderError, Result};
use regex::Regex;
use std::path::Path;

/// Header bytes (sender, page, length) that definition offsets leave out
const HEADER_LEN: usize = 3;

/// Conversion ids that are recognised but not decoded; such lines are skipped
const KNOWN_UNSUPPORTED: &[u32] = &[
    100, 102, 103, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115, 116, 117, 118, 153, 154,
    155, 156, 157, 158, 200, 203, 204, 214, 215, 219, 310, 311, 316, 405, 801, 995, 996, 998,
];

const DEFINITION_PATTERN: &str = r#"^//\{(?P<registry>0x?[0-9A-Fa-f]{2}),(?P<offset>\d+),(?P<conversion>\d+),(?P<size>\d+),(?P<data_type>-?\d+),"(?P<label>[^"]*)"\},?"#;

/// Line parser for definition files
pub struct DefinitionParser {
    pattern: Regex,
}

impl DefinitionParser {
    /// Create a parser
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(DEFINITION_PATTERN)
            .map_err(|e| DecoderError::InvalidDefinition(e.to_string()))?;
        Ok(Self { pattern })
    }

    /// Parse one line, returning `None` if it is not a definition
    pub fn parse_line(&self, line: &str) -> Result<Option<Definition>> {
        let caps = match self.pattern.captures(line.trim()) {
            Some(caps) => caps,
            None => return Ok(None),
        };

        let registry = caps["registry"].trim_start_matches("0x");
        let registry_id = u8::from_str_radix(registry, 16)
            .map_err(|e| DecoderError::InvalidDefinition(format!("{}: {:?}", e, line)))?;

        Ok(Some(Definition {
            registry_id,
            offset: parse_number(&caps["offset"], line)?,
            conversion_id: parse_number(&caps["conversion"], line)?,
            data_size: parse_number(&caps["size"], line)?,
            data_type: parse_number(&caps["data_type"], line)?,
            label: caps["label"].to_string(),
        }))
    }
}

/// One parsed definition line, before conversion to a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub registry_id: u8,
    pub offset: usize,
    pub conversion_id: u32,
    pub data_size: usize,
    pub data_type: i32,
    pub label: String,
}

impl Definition {
    /// Command prefix reading this definition's page
    pub fn prefix(&self) -> [u8; 3] {
        [3, 64, self.registry_id]
    }

    /// Identifier for the decoded value, unique per page, offset and conversion
    pub fn synthetic_id(&self) -> String {
        format!("{}.{}.{}", self.registry_id, self.offset, self.conversion_id)
    }

    /// Map the conversion id to a field decoder
    ///
    /// `Ok(None)` for recognised conversions without a decoder.
    pub fn field_decoder(&self, line: &str) -> Result<Option<FieldDecoder>> {
        let size = self.data_size;
        let decoder = match self.conversion_id {
            101 | 151 => byte_or_word(size, 1, ByteOrder::LittleEndian, line)?,
            105 => byte_or_word(size, 10, ByteOrder::LittleEndian, line)?,
            152 => byte_or_word(size, 1, ByteOrder::BigEndian, line)?,
            104 => {
                require_size(size, 2, line)?;
                FieldDecoder::FixedPointWord(FixedPoint::Binary)
            }
            201 | 217 => {
                require_size(size, 1, line)?;
                FieldDecoder::OperationMode
            }
            211 => {
                require_size(size, 1, line)?;
                FieldDecoder::NonZeroByte
            }
            id @ 300..=307 => {
                require_size(size, 1, line)?;
                FieldDecoder::Bit((id - 300) as u8)
            }
            315 => {
                require_size(size, 1, line)?;
                FieldDecoder::IuOperationMode
            }
            id if KNOWN_UNSUPPORTED.contains(&id) => return Ok(None),
            id => {
                return Err(DecoderError::UnsupportedConversion {
                    conversion_id: id,
                    line: line.to_string(),
                })
            }
        };
        Ok(Some(decoder))
    }
}

fn parse_number<T: std::str::FromStr>(text: &str, line: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e: T::Err| DecoderError::InvalidDefinition(format!("{}: {:?}", e, line)))
}

fn require_size(size: usize, expected: usize, line: &str) -> Result<()> {
    if size == expected {
        Ok(())
    } else {
        Err(DecoderError::InvalidDefinition(format!(
            "data size {} where {} is required: {:?}",
            size, expected, line
        )))
    }
}

fn byte_or_word(size: usize, divisor: u16, byte_order: ByteOrder, line: &str) -> Result<FieldDecoder> {
    match size {
        1 => Ok(FieldDecoder::Byte { divisor }),
        2 => Ok(FieldDecoder::Word { divisor, byte_order }),
        _ => Err(DecoderError::InvalidDefinition(format!(
            "data size {} is neither byte nor word: {:?}",
            size, line
        ))),
    }
}

/// Position of a definition's field within the full response
fn response_offset(definition: &Definition, line: &str) -> Result<usize> {
    definition
        .offset
        .checked_add(HEADER_LEN)
        .ok_or_else(|| DecoderError::InvalidDefinition(format!("offset out of range: {:?}", line)))
}

/// Build a decoder table from definition text
///
/// Pages are created for every registry id mentioned, even when none of its
/// lines has a supported conversion.
pub fn parse_definitions(text: &str) -> Result<DecoderTable> {
    let parser = DefinitionParser::new()?;
    let mut table = DecoderTable::new();
    let mut skipped = 0;

    for line in text.lines() {
        let definition = match parser.parse_line(line)? {
            Some(definition) => definition,
            None => continue,
        };

        let prefix = definition.prefix();
        table.ensure_page(prefix);

        match definition.field_decoder(line)? {
            Some(decoder) => table.insert(
                prefix,
                CommandDecoder::new(
                    response_offset(&definition, line)?,
                    decoder,
                    definition.synthetic_id(),
                    definition.label,
                ),
            ),
            None => {
                log::debug!(
                    "Skipping conversion {} for {:?}",
                    definition.conversion_id,
                    definition.label
                );
                skipped += 1;
            }
        }
    }

    let stats = table.stats();
    log::info!(
        "Parsed definitions: {} pages, {} decoders, {} skipped",
        stats.num_prefixes,
        stats.num_decoders,
        skipped
    );
    Ok(table)
}

/// Load a definitions file
///
/// Files that are not valid UTF-8 are read as Latin-1.
pub fn parse_definitions_file(path: &Path) -> Result<DecoderTable> {
    log::info!("Loading definitions file: {:?}", path);
    let bytes = std::fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("{:?} is not UTF-8, reading as Latin-1", path);
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };
    parse_definitions(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DecodeEngine;
    use crate::types::{Value, VariableId};
    use std::io::Write;

    const SAMPLE: &str = concat!(
        "//{0x00,11,100,1,-1,\"O/U MPU ID (yy)\"},\n",
        "//{0x00,12,105,1,-1,\"O/U capacity (kW)\"},\n",
        "//{0x10,0,217,1,-1,\"Operation Mode\"},\n",
        "//{0x10,1,307,1,-1,\"Thermostat ON/OFF\"},",
    );

    #[test]
    fn test_parse_sample() {
        let table = parse_definitions(SAMPLE).unwrap();

        let page_0 = table.get(&[3, 64, 0]).unwrap();
        assert_eq!(
            page_0,
            &[CommandDecoder::new(15, FieldDecoder::BYTE_10, "0.12.105", "O/U capacity (kW)")]
        );

        let page_16 = table.get(&[3, 64, 16]).unwrap();
        assert_eq!(
            page_16,
            &[
                CommandDecoder::new(3, FieldDecoder::OperationMode, "16.0.217", "Operation Mode"),
                CommandDecoder::new(4, FieldDecoder::Bit(7), "16.1.307", "Thermostat ON/OFF"),
            ]
        );
    }

    #[test]
    fn test_capacity_end_to_end() {
        let table = parse_definitions("//{0x00,12,105,1,-1,\"O/U capacity (kW)\"}").unwrap();
        let (_, decoder) = table.find(&VariableId::from("0.12.105")).unwrap();
        assert_eq!(decoder.start_position, 15);
        assert_eq!(decoder.label.as_deref(), Some("O/U capacity (kW)"));

        let result = DecodeEngine::decode(
            &[3, 64, 0, 188],
            &[64, 0, 15, 4, 1, 0, 1, 1, 1, 0, 2, 1, 1, 4, 57, 60, 43],
            &table,
        );
        assert_eq!(result.value("0.12.105"), Some(Value::Float(6.0)));
    }

    #[test]
    fn test_ignores_other_lines() {
        let text = "#include <stdint.h>\nLabelDef labelDefs[] = {\n  {0x10,0,217,1,-1,\"Operation Mode\"},\n};\n";
        let table = parse_definitions(text).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_conversion_mapping() {
        let text = concat!(
            "//{0x20,0,101,2,-1,\"a\"},\n",
            "//{0x20,2,104,2,-1,\"b\"},\n",
            "//{0x20,4,152,2,-1,\"c\"},\n",
            "//{0x20,6,211,1,-1,\"d\"},\n",
            "//{0x20,7,315,1,-1,\"e\"},\n",
            "//{0x20,8,151,1,-1,\"f\"},\n",
        );
        let table = parse_definitions(text).unwrap();
        let decoders: Vec<FieldDecoder> = table
            .get(&[3, 64, 0x20])
            .unwrap()
            .iter()
            .map(|d| d.decoder)
            .collect();
        assert_eq!(
            decoders,
            vec![
                FieldDecoder::WORD,
                FieldDecoder::WORD_FIXED_BE,
                FieldDecoder::WORD_BE,
                FieldDecoder::NonZeroByte,
                FieldDecoder::IuOperationMode,
                FieldDecoder::BYTE,
            ]
        );
    }

    #[test]
    fn test_unknown_conversion_is_fatal() {
        let err = parse_definitions("//{0x20,0,999,1,-1,\"mystery\"},").unwrap_err();
        assert!(matches!(
            err,
            DecoderError::UnsupportedConversion { conversion_id: 999, .. }
        ));
    }

    #[test]
    fn test_wrong_size_is_invalid() {
        let err = parse_definitions("//{0x20,0,104,1,-1,\"fixed\"},").unwrap_err();
        assert!(matches!(err, DecoderError::InvalidDefinition(_)));

        let err = parse_definitions("//{0x20,0,105,4,-1,\"wide\"},").unwrap_err();
        assert!(matches!(err, DecoderError::InvalidDefinition(_)));
    }

    #[test]
    fn test_huge_offset_is_invalid() {
        let err = parse_definitions("//{0x20,18446744073709551615,105,1,-1,\"x\"},").unwrap_err();
        assert!(matches!(err, DecoderError::InvalidDefinition(_)));
    }

    #[test]
    fn test_known_unsupported_is_skipped() {
        let table = parse_definitions("//{0x61,2,200,1,-1,\"Switch\"},").unwrap();
        assert_eq!(table.stats().num_prefixes, 1);
        assert_eq!(table.stats().num_decoders, 0);
    }

    #[test]
    fn test_latin1_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"//{0x61,5,105,2,-1,\"Temp. \xb0C\"},\n").unwrap();

        let table = parse_definitions_file(file.path()).unwrap();
        let decoders = table.get(&[3, 64, 0x61]).unwrap();
        assert_eq!(decoders[0].label.as_deref(), Some("Temp. \u{b0}C"));
        assert_eq!(decoders[0].start_position, 8);
    }
}
