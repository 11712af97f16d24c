//! Quantization and huffman table registries.
//!
//! Both registries map a table destination identifier to the table that was most recently defined
//! for it. They differ in what happens on redefinition: [`HuffmanTables`] keeps every definition
//! it has seen, while [`QuantizationTables`] only keeps the latest one. This mirrors how the
//! tables have historically been tracked by this parser; it is not yet known whether any consumer
//! needs quantization table history.

use std::collections::BTreeMap;

use crate::segment::{HuffmanTable, QuantizationTable};

/// Current quantization table for each destination (`Tq`), without history.
#[derive(Debug, Default, Clone)]
pub struct QuantizationTables {
    current: BTreeMap<u8, QuantizationTable>,
}

impl QuantizationTables {
    /// Stores `table` as the current table for its destination, discarding the previous one.
    pub fn set(&mut self, table: QuantizationTable) {
        if let Some(old) = self.current.insert(table.Tq(), table) {
            log::trace!("quantization table {} redefined", old.Tq());
        }
    }

    pub fn get(&self, id: u8) -> Option<&QuantizationTable> {
        self.current.get(&id)
    }

    /// Returns the current tables in order of their destination identifier.
    pub fn iter(&self) -> impl Iterator<Item = &QuantizationTable> {
        self.current.values()
    }
}

/// Huffman tables by destination (`Th`), with every definition retained.
///
/// Tables are keyed by their destination only, so a DC and an AC table sharing a destination
/// replace each other as the current table. Both remain available via [`HuffmanTables::history`].
#[derive(Debug, Default, Clone)]
pub struct HuffmanTables {
    /// Never contains empty lists; the current table is the last entry.
    history: BTreeMap<u8, Vec<HuffmanTable>>,
}

impl HuffmanTables {
    /// Makes `table` the current table for its destination and appends it to the history.
    pub fn set(&mut self, table: HuffmanTable) {
        self.history.entry(table.Th()).or_default().push(table);
    }

    pub fn get(&self, id: u8) -> Option<&HuffmanTable> {
        self.history.get(&id).and_then(|tables| tables.last())
    }

    /// Returns all tables defined for destination `id`, oldest first.
    pub fn history(&self, id: u8) -> Option<&[HuffmanTable]> {
        self.history.get(&id).map(Vec::as_slice)
    }

    /// Returns the current tables in order of their destination identifier.
    pub fn iter(&self) -> impl Iterator<Item = &HuffmanTable> {
        self.history.values().filter_map(|tables| tables.last())
    }
}

/// All tables defined so far in a JPEG stream.
#[derive(Debug, Default, Clone)]
pub struct TableRegistry {
    quantization: QuantizationTables,
    huffman: HuffmanTables,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_quantization(&mut self, table: QuantizationTable) {
        self.quantization.set(table);
    }

    #[inline]
    pub fn set_huffman(&mut self, table: HuffmanTable) {
        self.huffman.set(table);
    }

    #[inline]
    pub fn current_quantization(&self, id: u8) -> Option<&QuantizationTable> {
        self.quantization.get(id)
    }

    #[inline]
    pub fn current_huffman(&self, id: u8) -> Option<&HuffmanTable> {
        self.huffman.get(id)
    }

    #[inline]
    pub fn huffman_history(&self, id: u8) -> Option<&[HuffmanTable]> {
        self.huffman.history(id)
    }

    #[inline]
    pub fn quantization(&self) -> &QuantizationTables {
        &self.quantization
    }

    #[inline]
    pub fn huffman(&self) -> &HuffmanTables {
        &self.huffman
    }
}
