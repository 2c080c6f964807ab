use crate::call::{Call, CallFlags, CallId};
use crate::error::ReadError;
use crate::profile::Profile;
use crate::read::ReadFlags;
use crate::section::FunctionId;

/// Bridges flat decoded records, from either codec, into the collection
/// model, so the codecs share one find-or-create and one unknown-function
/// policy.
pub(crate) struct Builder<'a> {
    profile: &'a mut Profile,
    flags: ReadFlags,
}

impl<'a> Builder<'a> {
    pub fn new(profile: &'a mut Profile, flags: ReadFlags) -> Self {
        Self { profile, flags }
    }

    /// One function record: registers a section under the file-supplied id.
    pub fn function(&mut self, id: FunctionId, name: &str, suffix: &str) {
        // The file only carries one name per record; it becomes both the
        // identity key and the display name, which keeps a re-written
        // profile identical to its source.
        self.profile.add_file_section(name, name, suffix, id);
    }

    /// One call record. A reference to an undeclared function id is either a
    /// hard failure (strict mode) or lands the call under a synthesized
    /// `<unknown-ID>` placeholder; a call is never silently dropped.
    pub fn call(
        &mut self,
        id: CallId,
        parent: Option<CallId>,
        function: FunctionId,
        flags: CallFlags,
        duration: u64,
    ) -> Result<(), ReadError> {
        if self.profile.section_by_id_mut(function).is_none() {
            if self.flags.contains(ReadFlags::FAIL_UNKNOWN_FUNCTION) {
                return Err(ReadError::UnknownFunction(function.get()));
            }
            log::warn!(
                "call {} references undeclared function {}; attaching it to a placeholder",
                id.get(),
                function.get()
            );
            let name = format!("<unknown-{}>", function.get());
            self.profile.add_file_section(&name, &name, "", function);
        }

        self.profile.note_file_call_id(id);
        match self.profile.section_by_id_mut(function) {
            Some(section) => {
                section.add_call(Call::from_record(id, parent, function, flags, duration));
                Ok(())
            }
            // Placeholder registration cannot miss; this is belt and braces.
            None => Err(ReadError::UnknownFunction(function.get())),
        }
    }
}
