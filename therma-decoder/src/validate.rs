//! Decoder table validation
//!
//! Checks the structural invariants every production table must satisfy:
//! decoders on one page never read overlapping bytes (except distinct bits of
//! the same byte), every identifier is produced by exactly one decoder, and no
//! prefix is a prefix of another so that a command matches at most one page.

use crate::table::{CommandDecoder, DecoderTable};
use crate::types::{hex, DecoderError, Result, VariableId};
use std::collections::HashMap;
use std::fmt;

/// One violated table invariant
#[derive(Debug, Clone, PartialEq)]
pub enum TableIssue {
    /// Two decoders on the same page read overlapping bytes
    ByteOverlap {
        prefix: Vec<u8>,
        first: VariableId,
        second: VariableId,
    },
    /// Two bit decoders read the same bit of the same byte
    BitClash {
        prefix: Vec<u8>,
        position: usize,
        bit: u8,
        first: VariableId,
        second: VariableId,
    },
    /// An identifier is produced by more than one decoder
    DuplicateIdentifier {
        id: VariableId,
        first_prefix: Vec<u8>,
        second_prefix: Vec<u8>,
    },
    /// A prefix is itself a prefix of another, so both match some commands
    AmbiguousPrefix { shorter: Vec<u8>, longer: Vec<u8> },
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableIssue::ByteOverlap {
                prefix,
                first,
                second,
            } => write!(
                f,
                "[{}] decoders {} and {} read overlapping bytes",
                hex(prefix),
                first,
                second
            ),
            TableIssue::BitClash {
                prefix,
                position,
                bit,
                first,
                second,
            } => write!(
                f,
                "[{}] decoders {} and {} both read bit {} of byte {}",
                hex(prefix),
                first,
                second,
                bit,
                position
            ),
            TableIssue::DuplicateIdentifier {
                id,
                first_prefix,
                second_prefix,
            } => write!(
                f,
                "identifier {} is produced under [{}] and [{}]",
                id,
                hex(first_prefix),
                hex(second_prefix)
            ),
            TableIssue::AmbiguousPrefix { shorter, longer } => write!(
                f,
                "prefix [{}] also matches every command for [{}]",
                hex(shorter),
                hex(longer)
            ),
        }
    }
}

/// Collect every invariant violation in `table`
pub fn validate_table(table: &DecoderTable) -> Vec<TableIssue> {
    let mut issues = Vec::new();

    for (prefix, decoders) in table.iter() {
        check_page(prefix, decoders, &mut issues);
    }

    let mut seen: HashMap<&VariableId, &[u8]> = HashMap::new();
    for (prefix, decoders) in table.iter() {
        for decoder in decoders {
            if let Some(first_prefix) = seen.insert(&decoder.id, prefix) {
                issues.push(TableIssue::DuplicateIdentifier {
                    id: decoder.id.clone(),
                    first_prefix: first_prefix.to_vec(),
                    second_prefix: prefix.to_vec(),
                });
            }
        }
    }

    let prefixes: Vec<&[u8]> = table.prefixes().collect();
    for (i, shorter) in prefixes.iter().enumerate() {
        for (j, longer) in prefixes.iter().enumerate() {
            if i != j && shorter.len() < longer.len() && longer.starts_with(shorter) {
                issues.push(TableIssue::AmbiguousPrefix {
                    shorter: shorter.to_vec(),
                    longer: longer.to_vec(),
                });
            }
        }
    }

    issues
}

fn check_page(prefix: &[u8], decoders: &[CommandDecoder], issues: &mut Vec<TableIssue>) {
    for (i, first) in decoders.iter().enumerate() {
        for second in &decoders[i + 1..] {
            let overlaps = first.start_position < second.end_position()
                && second.start_position < first.end_position();
            if !overlaps {
                continue;
            }

            match (first.decoder.bit_index(), second.decoder.bit_index()) {
                (Some(a), Some(b)) if a != b => {}
                (Some(bit), Some(_)) => issues.push(TableIssue::BitClash {
                    prefix: prefix.to_vec(),
                    position: first.start_position,
                    bit,
                    first: first.id.clone(),
                    second: second.id.clone(),
                }),
                _ => issues.push(TableIssue::ByteOverlap {
                    prefix: prefix.to_vec(),
                    first: first.id.clone(),
                    second: second.id.clone(),
                }),
            }
        }
    }
}

impl DecoderTable {
    /// Validate the table, failing with every issue found
    pub fn validate(&self) -> Result<()> {
        let issues = validate_table(self);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(DecoderError::InvalidTable(issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDecoder;

    #[test]
    fn test_distinct_bits_share_a_byte() {
        let table = DecoderTable::from_pages(vec![(
            vec![3, 64, 16],
            vec![
                CommandDecoder::unlabelled(4, FieldDecoder::Bit(7), 23),
                CommandDecoder::unlabelled(4, FieldDecoder::Bit(6), 24),
                CommandDecoder::unlabelled(5, FieldDecoder::BYTE, 25),
            ],
        )]);
        assert!(validate_table(&table).is_empty());
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_bit_clash() {
        let table = DecoderTable::from_pages(vec![(
            vec![3, 64, 16],
            vec![
                CommandDecoder::unlabelled(4, FieldDecoder::Bit(2), 1),
                CommandDecoder::unlabelled(4, FieldDecoder::Bit(2), 2),
            ],
        )]);
        let issues = validate_table(&table);
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            issues[0],
            TableIssue::BitClash { position: 4, bit: 2, .. }
        ));
    }

    #[test]
    fn test_bit_and_byte_overlap() {
        let table = DecoderTable::from_pages(vec![(
            vec![3, 64, 16],
            vec![
                CommandDecoder::unlabelled(4, FieldDecoder::Bit(0), 1),
                CommandDecoder::unlabelled(3, FieldDecoder::WORD_10, 2),
            ],
        )]);
        let issues = validate_table(&table);
        assert_eq!(
            issues,
            vec![TableIssue::ByteOverlap {
                prefix: vec![3, 64, 16],
                first: VariableId::from(1),
                second: VariableId::from(2),
            }]
        );
    }

    #[test]
    fn test_adjacent_words_do_not_overlap() {
        let table = DecoderTable::from_pages(vec![(
            vec![3, 64, 97],
            vec![
                CommandDecoder::unlabelled(5, FieldDecoder::WORD_10, 144),
                CommandDecoder::unlabelled(7, FieldDecoder::WORD_10, 145),
            ],
        )]);
        assert!(validate_table(&table).is_empty());
    }

    #[test]
    fn test_duplicate_identifier_across_pages() {
        let table = DecoderTable::from_pages(vec![
            (vec![3, 64, 33], vec![CommandDecoder::unlabelled(7, FieldDecoder::BYTE, 65)]),
            (vec![3, 64, 32], vec![CommandDecoder::unlabelled(3, FieldDecoder::BYTE, 65)]),
        ]);
        let issues = validate_table(&table);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], TableIssue::DuplicateIdentifier { .. }));
    }

    #[test]
    fn test_ambiguous_prefix() {
        let table = DecoderTable::from_pages(vec![
            (vec![3, 64], vec![CommandDecoder::unlabelled(3, FieldDecoder::BYTE, 1)]),
            (vec![3, 64, 33], vec![CommandDecoder::unlabelled(7, FieldDecoder::BYTE, 2)]),
        ]);
        let issues = validate_table(&table);
        assert_eq!(
            issues,
            vec![TableIssue::AmbiguousPrefix {
                shorter: vec![3, 64],
                longer: vec![3, 64, 33],
            }]
        );

        match table.validate() {
            Err(DecoderError::InvalidTable(found)) => assert_eq!(found.len(), 1),
            other => panic!("expected InvalidTable, got {:?}", other),
        }
    }

    #[test]
    fn test_issue_display() {
        let issue = TableIssue::BitClash {
            prefix: vec![3, 64, 98],
            position: 5,
            bit: 4,
            first: VariableId::from(156),
            second: VariableId::from(157),
        };
        assert_eq!(
            issue.to_string(),
            "[03 40 62] decoders 156 and 157 both read bit 4 of byte 5"
        );
    }
}
