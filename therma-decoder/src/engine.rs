//! Decode Engine
//!
//! Applies the decoders of every table page whose prefix matches a command to
//! the response of that command, producing one value per identifier.

use crate::table::{CommandDecoder, DecoderTable};
use crate::types::{hex, Value, VariableId};
use std::collections::BTreeMap;

/// One decoded field, with the decoder that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField<'t> {
    /// Table entry that produced this field
    pub decoder: &'t CommandDecoder,
    /// Decoded value, `None` if the response slice was missing or meaningless
    pub value: Option<Value>,
}

/// Identifier → decoded field mapping for one command/response pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeResult<'t> {
    fields: BTreeMap<VariableId, DecodedField<'t>>,
}

impl<'t> DecodeResult<'t> {
    /// Get the decoded field for an identifier
    pub fn get(&self, id: &VariableId) -> Option<&DecodedField<'t>> {
        self.fields.get(id)
    }

    /// Get the decoded value for an identifier
    ///
    /// `None` both when the identifier was not decoded and when it decoded to
    /// no value; use [`get`](Self::get) to tell the two apart.
    pub fn value(&self, id: impl Into<VariableId>) -> Option<Value> {
        self.fields.get(&id.into()).and_then(|field| field.value)
    }

    /// Iterate over fields in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&VariableId, &DecodedField<'t>)> {
        self.fields.iter()
    }

    /// Number of decoded fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if nothing was decoded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Move all fields of `other` into this result, overwriting equal identifiers
    pub fn extend(&mut self, other: DecodeResult<'t>) {
        self.fields.extend(other.fields);
    }

    /// Values keyed by stringified identifier; missing values become `null`
    pub fn to_json_map(&self) -> BTreeMap<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(id, field)| {
                let value = match field.value {
                    Some(value) => serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                    None => serde_json::Value::Null,
                };
                (id.to_string(), value)
            })
            .collect()
    }
}

/// Decode engine - applies decoder tables to responses
pub struct DecodeEngine;

impl DecodeEngine {
    /// Decode the response to `command` using every matching page of `table`
    ///
    /// Pages are applied in table order, so when several prefixes match the
    /// same command a later page overwrites equal identifiers of an earlier one.
    pub fn decode<'t>(command: &[u8], response: &[u8], table: &'t DecoderTable) -> DecodeResult<'t> {
        let mut result = DecodeResult::default();
        let mut matched = 0;

        let matching = table
            .iter()
            .filter(|(prefix, _)| command.starts_with(prefix));
        for (prefix, decoders) in matching {
            matched += 1;
            if matched > 1 {
                log::warn!(
                    "Command {} matches more than one page, [{}] overrides earlier pages",
                    hex(command),
                    hex(prefix)
                );
            }

            for decoder in decoders {
                let value = Self::decode_field(response, decoder);
                result.fields.insert(
                    decoder.id.clone(),
                    DecodedField {
                        decoder,
                        value,
                    },
                );
            }
        }

        if matched == 0 {
            log::trace!("No decoders for command {}", hex(command));
        }

        result
    }

    fn decode_field(response: &[u8], decoder: &CommandDecoder) -> Option<Value> {
        match response.get(decoder.start_position..decoder.end_position()) {
            Some(bytes) => decoder.decoder.decode(bytes),
            None => {
                log::warn!(
                    "Response of {} bytes too short for {} at {}..{}",
                    response.len(),
                    decoder.id,
                    decoder.start_position,
                    decoder.end_position()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDecoder;

    fn voltage_table() -> DecoderTable {
        DecoderTable::from_pages(vec![
            (
                vec![3, 64, 33],
                vec![
                    CommandDecoder::new(3, FieldDecoder::WORD_10, 62, "INV primary current (A)"),
                    CommandDecoder::new(7, FieldDecoder::BYTE, 65, "Voltage (N-phase) (V)"),
                ],
            ),
            (
                vec![3, 64, 98],
                vec![
                    CommandDecoder::new(5, FieldDecoder::Bit(4), 156, "Powerful DHW Operation. ON/OFF"),
                    CommandDecoder::new(10, FieldDecoder::Bit(4), 166, "Main RT Heating"),
                    CommandDecoder::new(15, FieldDecoder::BYTE, 181, "Water pump signal (0:max-100:stop)"),
                ],
            ),
        ])
    }

    #[test]
    fn test_decode_voltage() {
        let table = voltage_table();
        let result = DecodeEngine::decode(
            &[3, 64, 33, 155],
            &[64, 33, 18, 5, 0, 0, 0, 39, 0, 0, 160, 0, 0, 0, 0, 0, 0, 0, 0, 192],
            &table,
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result.value(65), Some(Value::Integer(39)));
        assert_eq!(result.value(62), Some(Value::Float(0.5)));
        assert_eq!(
            result.get(&VariableId::from(65)).unwrap().decoder.label.as_deref(),
            Some("Voltage (N-phase) (V)")
        );
    }

    #[test]
    fn test_decode_bits_and_bytes() {
        let table = voltage_table();
        let result = DecodeEngine::decode(
            &[3, 64, 98, 90],
            &[64, 98, 19, 128, 0, 16, 94, 1, 210, 0, 16, 1, 253, 255, 0, 94, 0, 0, 0, 0, 184],
            &table,
        );

        assert_eq!(result.value(156), Some(Value::Boolean(true)));
        assert_eq!(result.value(166), Some(Value::Boolean(true)));
        assert_eq!(result.value(181), Some(Value::Integer(94)));
        assert_eq!(result.value(65), None);
    }

    #[test]
    fn test_short_response_yields_no_value() {
        let table = voltage_table();
        let result = DecodeEngine::decode(&[3, 64, 33, 155], &[21, 234], &table);

        assert_eq!(result.len(), 2);
        let field = result.get(&VariableId::from(65)).unwrap();
        assert_eq!(field.value, None);
    }

    #[test]
    fn test_unknown_command_decodes_nothing() {
        let table = voltage_table();
        let result = DecodeEngine::decode(&[3, 64, 0, 188], &[64, 0, 2, 189], &table);
        assert!(result.is_empty());
    }

    #[test]
    fn test_later_page_wins() {
        let table = DecoderTable::from_pages(vec![
            (vec![3, 64], vec![CommandDecoder::unlabelled(3, FieldDecoder::BYTE, 1)]),
            (vec![3, 64, 33], vec![CommandDecoder::unlabelled(4, FieldDecoder::BYTE, 1)]),
        ]);
        let result = DecodeEngine::decode(&[3, 64, 33, 155], &[64, 33, 3, 10, 20, 0], &table);
        assert_eq!(result.len(), 1);
        assert_eq!(result.value(1), Some(Value::Integer(20)));
    }

    #[test]
    fn test_json_map() {
        let table = voltage_table();
        let result = DecodeEngine::decode(&[3, 64, 33, 155], &[64, 33, 4, 5, 0, 0, 0], &table);
        let json = result.to_json_map();
        assert_eq!(json["62"], serde_json::json!(0.5));
        assert_eq!(json["65"], serde_json::Value::Null);
    }
}
