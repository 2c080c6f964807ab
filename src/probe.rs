use std::marker::PhantomData;

use crate::call::{CallFlags, CallId};
use crate::recorder::{ActiveCall, Recorder};

/// A scope-lifetime recorder: opens a call on construction and closes it on
/// drop, including on the unwind path.
///
/// The probe links its call to the innermost call that was open on the same
/// thread when it entered; the native stack of probes is the call tree.
/// Probes never fail, and a probe's lifetime is exactly one lexical scope:
/// there is no cancellation and no restart.
///
/// The [`probe_function!`](crate::probe_function),
/// [`probe_syscall!`](crate::probe_syscall) and
/// [`probe_section!`](crate::probe_section) macros are the intended way to
/// plant probes against the global recorder.
#[derive(Debug)]
pub struct Probe<'a> {
    recorder: &'a Recorder,
    active: ActiveCall,
    // A probe must close on the thread that opened it.
    _not_send: PhantomData<*const ()>,
}

impl Probe<'static> {
    /// Opens a call on the global recorder.
    pub fn enter(name: &str, nice: &str, suffix: &str, flags: CallFlags) -> Self {
        Self::enter_in(Recorder::global(), name, nice, suffix, flags)
    }
}

impl<'a> Probe<'a> {
    /// Opens a call on the given recorder.
    pub fn enter_in(
        recorder: &'a Recorder,
        name: &str,
        nice: &str,
        suffix: &str,
        flags: CallFlags,
    ) -> Self {
        let active = recorder.begin_call(name, nice, suffix, flags);
        Self {
            recorder,
            active,
            _not_send: PhantomData,
        }
    }

    /// The id of the call this probe opened.
    pub fn call_id(&self) -> CallId {
        self.active.id
    }
}

impl Drop for Probe<'_> {
    fn drop(&mut self) {
        self.recorder.end_call(self.active);
    }
}

/// The path of the enclosing function, e.g. `my_crate::parser::parse`.
#[doc(hidden)]
#[macro_export]
macro_rules! __current_function {
    () => {{
        fn probe_anchor() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(probe_anchor);
        &name[..name.len() - "::probe_anchor".len()]
    }};
}

/// Plants a probe covering the rest of the enclosing scope, named after the
/// enclosing function.
#[macro_export]
macro_rules! probe_function {
    () => {
        let __probe = $crate::Probe::enter(
            $crate::__current_function!(),
            $crate::__current_function!(),
            "",
            $crate::CallFlags::empty(),
        );
    };
}

/// Like [`probe_function!`], but marks the call as a system/library call.
#[macro_export]
macro_rules! probe_syscall {
    () => {
        let __probe = $crate::Probe::enter(
            $crate::__current_function!(),
            $crate::__current_function!(),
            "",
            $crate::CallFlags::SYSCALL,
        );
    };
}

/// Plants a named probe with an explicit suffix, so one function can carry
/// several distinct sections. The first argument is the binding for the
/// probe, which allows multiple probes in one scope.
///
/// ```
/// # use probe_profile::probe_section;
/// fn checksum(data: &[u8]) -> u32 {
///     probe_section!(probe, "checksum");
///     data.iter().map(|&b| b as u32).sum()
/// }
/// # checksum(&[1, 2, 3]);
/// ```
#[macro_export]
macro_rules! probe_section {
    ($probe:ident, $suffix:expr) => {
        let $probe = $crate::Probe::enter(
            $crate::__current_function!(),
            $crate::__current_function!(),
            $suffix,
            $crate::CallFlags::empty(),
        );
    };
}
