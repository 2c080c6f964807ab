use indexmap::IndexMap;

use crate::section::{FunctionId, Section};

/// A named instrumentation point, e.g. one routine. Functions own their
/// sections, unique by suffix, in insertion order.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    nice: String,
    sections: IndexMap<String, Section>,
}

impl Function {
    pub(crate) fn new(name: &str, nice: &str) -> Self {
        Self {
            name: name.to_string(),
            nice: nice.to_string(),
            sections: IndexMap::new(),
        }
    }

    /// The identity key of this function. For live collection this is
    /// whatever the probe supplied as its stable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display name. This is what the file formats store.
    pub fn nice(&self) -> &str {
        &self.nice
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    pub fn section(&self, suffix: &str) -> Option<&Section> {
        self.sections.get(suffix)
    }

    pub(crate) fn sections_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        self.sections.values_mut()
    }

    pub(crate) fn section_index(&self, suffix: &str) -> Option<usize> {
        self.sections.get_index_of(suffix)
    }

    /// Appends a section with the given id and returns its index. The caller
    /// has checked that no section with this suffix exists yet.
    pub(crate) fn add_section(&mut self, suffix: &str, id: FunctionId) -> usize {
        let entry = self.sections.entry(suffix.to_string());
        let index = entry.index();
        entry.or_insert_with(|| Section::new(suffix, id));
        index
    }

    pub(crate) fn section_at(&self, index: usize) -> &Section {
        &self.sections[index]
    }

    pub(crate) fn section_at_mut(&mut self, index: usize) -> &mut Section {
        &mut self.sections[index]
    }
}
