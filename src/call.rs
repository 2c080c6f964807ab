use std::num::NonZeroU32;

use bitflags::bitflags;

use crate::section::FunctionId;

/// Identifier of a single [`Call`] record.
///
/// Call ids are drawn from a per-profile monotonic counter, are strictly
/// positive and are never reused within a run. The on-disk value 0 is
/// reserved and maps to "no call" ([`Call::parent`] returns `None` for it).
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct CallId(pub(crate) NonZeroU32);

impl CallId {
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

bitflags! {
    /// Flags recorded on a call.
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    pub struct CallFlags: u32 {
        /// Set on calls which cross into the system / library boundary.
        const SYSCALL = 0b00000001;
    }
}

/// One dynamic activation record: something a probe entered and left.
///
/// The parent link is set once, when the probe opens, to the innermost call
/// that was active on the same thread, and is never mutated afterwards. The
/// duration is in raw ticks, gross (including callees).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    id: CallId,
    parent: Option<CallId>,
    function: FunctionId,
    flags: CallFlags,
    duration: u64,
}

impl Call {
    pub(crate) fn new(id: CallId, function: FunctionId, flags: CallFlags) -> Self {
        Self {
            id,
            parent: None,
            function,
            flags,
            duration: 0,
        }
    }

    /// A fully-specified record, as reconstructed from a stats file.
    pub fn from_record(
        id: CallId,
        parent: Option<CallId>,
        function: FunctionId,
        flags: CallFlags,
        duration: u64,
    ) -> Self {
        Self {
            id,
            parent,
            function,
            flags,
            duration,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn parent(&self) -> Option<CallId> {
        self.parent
    }

    /// The id of the section this call was recorded under.
    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn flags(&self) -> CallFlags {
        self.flags
    }

    pub fn is_syscall(&self) -> bool {
        self.flags.contains(CallFlags::SYSCALL)
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub(crate) fn set_parent(&mut self, parent: CallId) {
        self.parent = Some(parent);
    }

    pub(crate) fn set_duration(&mut self, duration: u64) {
        self.duration = duration;
    }
}
