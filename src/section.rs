use std::num::NonZeroU32;

use crate::call::{Call, CallFlags, CallId};

/// Identifier of a [`Section`].
///
/// This is the "function id" of the file formats: every leaf recording
/// point, i.e. every function × suffix pair, gets a fresh id from a shared
/// per-profile counter. The on-disk value 0 is reserved.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct FunctionId(pub(crate) NonZeroU32);

impl FunctionId {
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// A named sub-point within a [`Function`](crate::Function), e.g. a tagged
/// call site. Sections own the call records, in chronological (insertion)
/// order, and carry the file-format function id.
#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    id: FunctionId,
    calls: Vec<Call>,
}

impl Section {
    pub(crate) fn new(name: &str, id: FunctionId) -> Self {
        Self {
            name: name.to_string(),
            id,
            calls: Vec::new(),
        }
    }

    /// The suffix this section was tagged with. Empty for plain function
    /// probes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Appends a fresh call with no parent and no duration yet, and returns
    /// its index. Indices stay valid: the call list is append-only.
    pub(crate) fn new_call(&mut self, id: CallId, flags: CallFlags) -> usize {
        self.calls.push(Call::new(id, self.id, flags));
        self.calls.len() - 1
    }

    pub(crate) fn call_at_mut(&mut self, index: usize) -> &mut Call {
        &mut self.calls[index]
    }

    /// Appends a reconstructed call record (read path).
    pub(crate) fn add_call(&mut self, call: Call) {
        self.calls.push(call);
    }

    /// Overwrites the call with the same id, if present.
    pub(crate) fn update_call(&mut self, call: &Call) {
        for existing in &mut self.calls {
            if existing.id() == call.id() {
                *existing = call.clone();
                break;
            }
        }
    }
}
