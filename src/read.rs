use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use bitflags::bitflags;

use crate::binary;
use crate::call::CallId;
use crate::error::ReadError;
use crate::profile::Profile;
use crate::xml;

bitflags! {
    /// Policy flags for the read path.
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    pub struct ReadFlags: u32 {
        /// Treat a call that references an undeclared function id as a
        /// malformed file, instead of synthesizing an `<unknown-ID>`
        /// placeholder for it.
        const FAIL_UNKNOWN_FUNCTION = 0b00000001;
    }
}

/// A profile reconstructed from a stats file, plus the tick frequency it
/// was recorded with. Independent of any live recording.
#[derive(Debug)]
pub struct FileContents {
    profile: Profile,
    second: u64,
}

impl FileContents {
    pub(crate) fn new(profile: Profile, second: u64) -> Self {
        Self { profile, second }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn into_profile(self) -> Profile {
        self.profile
    }

    /// Ticks per second of the recording clock. Never zero: a file that
    /// stored 0 reads back as 1, so duration conversions cannot divide by
    /// zero.
    pub fn second(&self) -> u64 {
        self.second
    }

    /// The call's duration minus the durations of its direct children, in
    /// ticks. Saturates at zero when children overlap oddly.
    pub fn own_duration(&self, id: CallId) -> Option<u64> {
        let call = self.profile.call_by_id(id)?;
        let children: u64 = self
            .profile
            .calls()
            .filter(|c| c.parent() == Some(id))
            .map(|c| c.duration())
            .sum();
        Some(call.duration().saturating_sub(children))
    }
}

/// Peeks the leading 8 bytes and restores the read position, so the XML
/// parser sees the stream untouched if the magic does not match.
fn is_binary<R: Read + Seek>(input: &mut R) -> Result<bool, ReadError> {
    let position = input.stream_position()?;
    let mut magic = [0u8; 8];
    let matches = match input.read_exact(&mut magic) {
        Ok(()) => u64::from_le_bytes(magic) == binary::MAGIC,
        // Too short for the magic: cannot be a binary file.
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => false,
        Err(err) => return Err(err.into()),
    };
    input.seek(SeekFrom::Start(position))?;
    Ok(matches)
}

/// Reads a stats stream in either format, auto-detected by the leading
/// binary magic.
pub fn read<R: Read + Seek>(mut input: R, flags: ReadFlags) -> Result<FileContents, ReadError> {
    if is_binary(&mut input)? {
        binary::read(input, flags)
    } else {
        let mut profile = Profile::new();
        let second = xml::read(input, &mut profile, flags)?;
        Ok(FileContents::new(profile, second))
    }
}

/// Opens and reads a stats file. An unopenable file surfaces on the same
/// failure channel as a malformed one; distinguishing them is the caller's
/// concern.
pub fn read_file<P: AsRef<Path>>(path: P, flags: ReadFlags) -> Result<FileContents, ReadError> {
    let file = File::open(path)?;
    read(BufReader::new(file), flags)
}
