//! Record nested call timings with scope-based probes, and save or load
//! them as a compact binary or XML stats file.
//!
//! A [`Probe`] opens a call record when it is constructed and closes it
//! when it is dropped; the native stack of live probes on each thread *is*
//! the call tree, so nesting comes for free. The recorded hierarchy of
//! functions, sections and calls lives in a [`Profile`], usually the one
//! owned by the global [`Recorder`]. The [`probe_function!`],
//! [`probe_syscall!`] and [`probe_section!`] macros plant probes against
//! the global recorder; [`StatsWriter`] dumps its profile on drop.
//!
//! ## Example
//!
//! ```
//! use probe_profile::{CallFlags, OutputFormat, Probe, ReadFlags, Recorder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = Recorder::new();
//! {
//!     let _work = Probe::enter_in(&recorder, "app::work", "app::work", "", CallFlags::empty());
//!     let _step = Probe::enter_in(&recorder, "app::step", "app::step", "io", CallFlags::SYSCALL);
//!     // ... the work being measured ...
//! }
//!
//! let mut bytes = Vec::new();
//! probe_profile::write(
//!     &mut bytes,
//!     OutputFormat::Binary,
//!     &recorder.profile(),
//!     recorder.ticks_per_second(),
//! )?;
//!
//! let contents = probe_profile::read(std::io::Cursor::new(bytes), ReadFlags::empty())?;
//! assert_eq!(contents.profile().calls().count(), 2);
//! # Ok(())
//! # }
//! ```

mod binary;
mod builder;
mod call;
mod error;
mod fast_hash_map;
mod function;
mod probe;
mod profile;
mod read;
mod recorder;
mod section;
mod string_table;
mod timebase;
mod write;
mod xml;

pub use call::{Call, CallFlags, CallId};
pub use error::ReadError;
pub use function::Function;
pub use probe::Probe;
pub use profile::{CallSite, Profile};
pub use read::{read, read_file, FileContents, ReadFlags};
pub use recorder::Recorder;
pub use section::{FunctionId, Section};
pub use timebase::{Timebase, TICKS_PER_SECOND};
pub use write::{write, write_file, OutputFormat, StatsWriter};
