use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use crate::call::{CallFlags, CallId};
use crate::profile::{CallSite, Profile};
use crate::timebase::Timebase;

/// The process-wide recording context: the live [`Profile`], the per-thread
/// active-call stacks, and the tick source.
///
/// There is one lazily-created global instance behind [`Recorder::global`],
/// which is what the probe macros use. Tests and embedders can just as well
/// construct their own recorders; nothing in the crate depends on the
/// global one.
#[derive(Debug)]
pub struct Recorder {
    profile: Mutex<Profile>,
    threads: Mutex<ThreadRegistry>,
    timebase: Timebase,
}

/// One slot per thread ever observed. The registry is append-only and
/// scanned linearly; the set of instrumented threads is expected to stay
/// small.
#[derive(Debug, Default)]
struct ThreadRegistry {
    slots: Vec<ThreadSlot>,
}

#[derive(Debug)]
struct ThreadSlot {
    thread: ThreadId,
    /// Ids of the calls currently open on this thread, innermost last.
    stack: Vec<CallId>,
}

impl ThreadRegistry {
    fn slot_mut(&mut self, thread: ThreadId) -> &mut ThreadSlot {
        let index = match self.slots.iter().position(|s| s.thread == thread) {
            Some(index) => index,
            None => {
                self.slots.push(ThreadSlot {
                    thread,
                    stack: Vec::new(),
                });
                self.slots.len() - 1
            }
        };
        &mut self.slots[index]
    }
}

/// What a live probe holds on to between enter and exit.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveCall {
    pub(crate) site: CallSite,
    pub(crate) id: CallId,
    pub(crate) start: u64,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            profile: Mutex::new(Profile::new()),
            threads: Mutex::new(ThreadRegistry::default()),
            timebase: Timebase::new(),
        }
    }

    pub fn global() -> &'static Recorder {
        static GLOBAL: OnceLock<Recorder> = OnceLock::new();
        GLOBAL.get_or_init(Recorder::new)
    }

    pub fn timebase(&self) -> &Timebase {
        &self.timebase
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.timebase.ticks_per_second()
    }

    /// Locks and returns the profile. The codecs expect a quiescent profile,
    /// i.e. no probe still open while writing.
    pub fn profile(&self) -> MutexGuard<'_, Profile> {
        lock(&self.profile)
    }

    pub(crate) fn begin_call(
        &self,
        name: &str,
        nice: &str,
        suffix: &str,
        flags: CallFlags,
    ) -> ActiveCall {
        let mut profile = lock(&self.profile);
        let site = profile.record_call(name, nice, suffix, flags);
        let id = profile.call_at(site).id();

        // Lock order is always profile, then threads.
        let mut threads = lock(&self.threads);
        let slot = threads.slot_mut(thread::current().id());
        if let Some(&parent) = slot.stack.last() {
            profile.call_at_mut(site).set_parent(parent);
        }
        slot.stack.push(id);
        drop(threads);
        drop(profile);

        ActiveCall {
            site,
            id,
            start: self.timebase.now(),
        }
    }

    pub(crate) fn end_call(&self, active: ActiveCall) {
        let duration = self.timebase.now().saturating_sub(active.start);
        {
            let mut threads = lock(&self.threads);
            let slot = threads.slot_mut(thread::current().id());
            slot.stack.pop();
        }
        lock(&self.profile).call_at_mut(active.site).set_duration(duration);
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

// Instrumentation is best-effort: a panic on some other thread must not
// take the recorder down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
