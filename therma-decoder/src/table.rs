//! Decoder tables
//!
//! A decoder table maps command prefixes to the field decoders that apply to
//! the response of any command starting with that prefix. Tables are built
//! once, either from literal definitions or from imported definition files,
//! and are not modified afterwards.

use crate::field::FieldDecoder;
use crate::types::VariableId;
use std::collections::HashMap;

/// Decoder for one register in the response to a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDecoder {
    /// Offset of the first response byte this decoder reads
    pub start_position: usize,
    /// How to interpret the bytes
    pub decoder: FieldDecoder,
    /// Key of the decoded value
    pub id: VariableId,
    /// Human readable description
    pub label: Option<String>,
}

impl CommandDecoder {
    /// Create a decoder with a label
    pub fn new(
        start_position: usize,
        decoder: FieldDecoder,
        id: impl Into<VariableId>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            start_position,
            decoder,
            id: id.into(),
            label: Some(label.into()),
        }
    }

    /// Create a decoder without a label
    pub fn unlabelled(start_position: usize, decoder: FieldDecoder, id: impl Into<VariableId>) -> Self {
        Self {
            start_position,
            decoder,
            id: id.into(),
            label: None,
        }
    }

    /// Offset one past the last response byte this decoder reads
    pub fn end_position(&self) -> usize {
        self.start_position + self.decoder.decode_len()
    }

    /// Label, or the identifier when there is none
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.id.to_string(),
        }
    }
}

/// Ordered mapping of command prefix to decoders
#[derive(Debug, Clone, Default)]
pub struct DecoderTable {
    /// Pages in insertion order
    pages: Vec<(Vec<u8>, Vec<CommandDecoder>)>,
    /// Prefix → index into `pages`
    lookup: HashMap<Vec<u8>, usize>,
}

impl DecoderTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from literal page definitions
    pub fn from_pages<P, I>(pages: I) -> Self
    where
        P: Into<Vec<u8>>,
        I: IntoIterator<Item = (P, Vec<CommandDecoder>)>,
    {
        let mut table = Self::new();
        for (prefix, decoders) in pages {
            table.extend_page(prefix, decoders);
        }
        table
    }

    /// Append a decoder to the list for `prefix`, creating the page if needed
    pub fn insert(&mut self, prefix: impl Into<Vec<u8>>, decoder: CommandDecoder) {
        let index = self.page_index(prefix.into());
        self.pages[index].1.push(decoder);
    }

    /// Append several decoders to the list for `prefix`
    pub fn extend_page(
        &mut self,
        prefix: impl Into<Vec<u8>>,
        decoders: impl IntoIterator<Item = CommandDecoder>,
    ) {
        let index = self.page_index(prefix.into());
        self.pages[index].1.extend(decoders);
    }

    /// Make sure a page exists for `prefix` even if it has no decoders yet
    pub fn ensure_page(&mut self, prefix: impl Into<Vec<u8>>) {
        self.page_index(prefix.into());
    }

    fn page_index(&mut self, prefix: Vec<u8>) -> usize {
        if let Some(&index) = self.lookup.get(&prefix) {
            return index;
        }
        let index = self.pages.len();
        self.lookup.insert(prefix.clone(), index);
        self.pages.push((prefix, Vec::new()));
        index
    }

    /// Get the decoders registered for exactly this prefix
    pub fn get(&self, prefix: &[u8]) -> Option<&[CommandDecoder]> {
        self.lookup
            .get(prefix)
            .map(|&index| self.pages[index].1.as_slice())
    }

    /// All prefixes, in insertion order
    pub fn prefixes(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.pages.iter().map(|(prefix, _)| prefix.as_slice())
    }

    /// All pages, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[CommandDecoder])> + '_ {
        self.pages
            .iter()
            .map(|(prefix, decoders)| (prefix.as_slice(), decoders.as_slice()))
    }

    /// Pages whose prefix matches the leading bytes of `command`
    pub fn matching<'a>(
        &'a self,
        command: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [CommandDecoder])> + 'a {
        self.iter().filter(move |(prefix, _)| command.starts_with(prefix))
    }

    /// Find the decoder producing `id`, with its prefix
    pub fn find(&self, id: &VariableId) -> Option<(&[u8], &CommandDecoder)> {
        self.iter().find_map(|(prefix, decoders)| {
            decoders
                .iter()
                .find(|decoder| &decoder.id == id)
                .map(|decoder| (prefix, decoder))
        })
    }

    /// Merge another table's pages into this one
    pub fn merge(&mut self, other: DecoderTable) {
        for (prefix, decoders) in other.pages {
            self.extend_page(prefix, decoders);
        }
    }

    /// Number of pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True if the table has no pages
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Get table statistics
    pub fn stats(&self) -> TableStats {
        TableStats {
            num_prefixes: self.pages.len(),
            num_decoders: self.pages.iter().map(|(_, decoders)| decoders.len()).sum(),
        }
    }
}

/// Table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Number of distinct command prefixes
    pub num_prefixes: usize,
    /// Total number of field decoders
    pub num_decoders: usize,
}
