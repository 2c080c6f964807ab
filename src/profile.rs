use std::num::NonZeroU32;

use indexmap::IndexMap;

use crate::call::{Call, CallFlags, CallId};
use crate::function::Function;
use crate::section::{FunctionId, Section};

/// The location of one call inside a [`Profile`].
///
/// All three containers are append-only, so a site handed out by
/// [`Profile::record_call`] stays valid for the profile's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct CallSite {
    pub(crate) function: usize,
    pub(crate) section: usize,
    pub(crate) call: usize,
}

/// The collection model: the full hierarchy of functions, sections and
/// calls, plus the id counters feeding them.
///
/// Functions are unique by name, sections unique by suffix within their
/// function; both lookups fold to find-or-create. Calls are always appended.
/// Entities are never deleted; a profile only grows.
#[derive(Debug, Clone)]
pub struct Profile {
    functions: IndexMap<String, Function>,
    next_function_id: NonZeroU32,
    next_call_id: NonZeroU32,
}

impl Profile {
    pub fn new() -> Self {
        Self {
            functions: IndexMap::new(),
            next_function_id: NonZeroU32::MIN,
            next_call_id: NonZeroU32::MIN,
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    /// All calls across all sections, in tree order.
    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.functions
            .values()
            .flat_map(|f| f.sections())
            .flat_map(|s| s.calls().iter())
    }

    pub fn call_by_id(&self, id: CallId) -> Option<&Call> {
        self.calls().find(|c| c.id() == id)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn section_by_id(&self, id: FunctionId) -> Option<&Section> {
        self.functions
            .values()
            .flat_map(|f| f.sections())
            .find(|s| s.id() == id)
    }

    /// Locates the function with this name, creating it with the given nice
    /// name if absent. First creation wins: a later call with a different
    /// `nice` still returns the original entry.
    pub fn function(&mut self, name: &str, nice: &str) -> &mut Function {
        self.functions
            .entry(name.to_string())
            .or_insert_with(|| Function::new(name, nice))
    }

    /// The composite find-or-create: locates function and section, appends a
    /// fresh call with a new id, parent unset. Callers that share a profile
    /// across threads must serialize this (see [`Recorder`](crate::Recorder)).
    pub fn record_call(
        &mut self,
        name: &str,
        nice: &str,
        suffix: &str,
        flags: CallFlags,
    ) -> CallSite {
        let entry = self.functions.entry(name.to_string());
        let function = entry.index();
        entry.or_insert_with(|| Function::new(name, nice));

        let section = match self.functions[function].section_index(suffix) {
            Some(index) => index,
            None => {
                let id = self.alloc_function_id();
                self.functions[function].add_section(suffix, id)
            }
        };

        let id = self.alloc_call_id();
        let call = self.functions[function]
            .section_at_mut(section)
            .new_call(id, flags);

        CallSite {
            function,
            section,
            call,
        }
    }

    /// Overwrites the call with the same id under `(name, suffix)`, if it
    /// exists. Only the reconstruction path has a use for this.
    pub fn update_call(&mut self, name: &str, nice: &str, suffix: &str, call: &Call) {
        let section = self.function(name, nice).section_index(suffix);
        if let Some(index) = section {
            if let Some(function) = self.functions.get_mut(name) {
                function.section_at_mut(index).update_call(call);
            }
        }
    }

    pub(crate) fn call_at(&self, site: CallSite) -> &Call {
        &self.functions[site.function].section_at(site.section).calls()[site.call]
    }

    pub(crate) fn call_at_mut(&mut self, site: CallSite) -> &mut Call {
        self.functions[site.function]
            .section_at_mut(site.section)
            .call_at_mut(site.call)
    }

    pub(crate) fn section_by_id_mut(&mut self, id: FunctionId) -> Option<&mut Section> {
        self.functions
            .values_mut()
            .flat_map(|f| f.sections_mut())
            .find(|s| s.id() == id)
    }

    /// Registers a section under a file-supplied id (read path). Find by
    /// suffix wins: a second record with the same name and suffix but a
    /// different id leaves the first registration in place.
    pub(crate) fn add_file_section(&mut self, name: &str, nice: &str, suffix: &str, id: FunctionId) {
        self.next_function_id = bump_past(self.next_function_id, id.0);
        let function = self.function(name, nice);
        if function.section_index(suffix).is_none() {
            function.add_section(suffix, id);
        }
    }

    /// Keeps the call-id counter ahead of ids seen in a file, so recording
    /// into a reconstructed profile cannot hand out duplicates.
    pub(crate) fn note_file_call_id(&mut self, id: CallId) {
        self.next_call_id = bump_past(self.next_call_id, id.0);
    }

    fn alloc_function_id(&mut self) -> FunctionId {
        let id = self.next_function_id;
        self.next_function_id = id.checked_add(1).unwrap_or(NonZeroU32::MAX);
        FunctionId(id)
    }

    fn alloc_call_id(&mut self) -> CallId {
        let id = self.next_call_id;
        self.next_call_id = id.checked_add(1).unwrap_or(NonZeroU32::MAX);
        CallId(id)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

fn bump_past(counter: NonZeroU32, seen: NonZeroU32) -> NonZeroU32 {
    counter.max(seen.checked_add(1).unwrap_or(NonZeroU32::MAX))
}
