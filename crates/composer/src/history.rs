use dreamer_core::generation::ImageResult;

use crate::error::ComposerError;

/// One generated image and the prompt that produced it. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRecord {
    pub prompt: String,
    pub image: ImageResult,
}

/// Append-only list of generations plus the displayed selection.
///
/// `active`, when set, is always a valid index.
#[derive(Debug, Default)]
pub struct GenerationHistory {
    records: Vec<GenerationRecord>,
    active: Option<usize>,
}

impl GenerationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and select a record. An image already present is ignored
    /// and `None` is returned.
    pub fn append(&mut self, record: GenerationRecord) -> Option<usize> {
        if self
            .records
            .iter()
            .any(|r| r.image.same_image(&record.image))
        {
            return None;
        }
        self.records.push(record);
        let index = self.records.len() - 1;
        self.active = Some(index);
        Some(index)
    }

    pub fn select(&mut self, index: usize) -> Result<(), ComposerError> {
        if index >= self.records.len() {
            return Err(ComposerError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        self.active = Some(index);
        Ok(())
    }

    pub fn active(&self) -> Option<&GenerationRecord> {
        self.active.and_then(|i| self.records.get(i))
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
