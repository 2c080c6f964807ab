//! The binary stats codec.
//!
//! A stats file is a fixed-layout flat file, all fields little-endian:
//!
//! ```text
//! u64 magic            "PROFILE\x1A"
//! u32 version          0x0001_0000
//! u32 function_count
//! u32 call_count
//! u32 function_offset  absolute offset of the function array
//! u32 string_offset    absolute offset of the string table (= 40)
//! u32 string_size      unpadded byte size of the string table
//! u64 second           ticks per second; 0 is read as 1
//! ```
//!
//! followed by the deduplicated string table padded to a 4-byte boundary,
//! `function_count` records of `{u32 id, u32 name, u32 suffix}` (string
//! fields are table-relative offsets, suffix 0 meaning none), and
//! `call_count` records of `{u32 id, u32 parent, u32 function, u32 flags,
//! u64 duration}`.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::call::{Call, CallFlags, CallId};
use crate::error::ReadError;
use crate::profile::Profile;
use crate::read::{FileContents, ReadFlags};
use crate::builder::Builder;
use crate::section::FunctionId;
use crate::string_table::StringTable;

/// ASCII "PROFILE" plus 0x1A, read little-endian as one u64.
pub(crate) const MAGIC: u64 = 0x1A45_4C49_464F_5250;
pub(crate) const VERSION: u32 = 0x0001_0000;

/// Magic plus header fields.
const HEADER_SIZE: u32 = 40;

struct Header {
    version: u32,
    function_count: u32,
    call_count: u32,
    function_offset: u32,
    string_offset: u32,
    string_size: u32,
    second: u64,
}

impl Header {
    fn parse<R: Read>(input: &mut R) -> Result<Self, ReadError> {
        Ok(Header {
            version: input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?,
            function_count: input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?,
            call_count: input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?,
            function_offset: input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?,
            string_offset: input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?,
            string_size: input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?,
            second: input.read_u64::<LittleEndian>().map_err(ReadError::from_read)?,
        })
    }
}

fn align4(n: u32) -> u32 {
    (n + 3) & !3
}

pub(crate) fn write<W: Write>(mut out: W, profile: &Profile, second: u64) -> std::io::Result<()> {
    let mut strings = StringTable::new();
    let mut functions = Vec::new();

    for function in profile.functions() {
        for section in function.sections() {
            let name = strings.offset_for(function.nice());
            let suffix = if section.name().is_empty() {
                0
            } else {
                strings.offset_for(section.name())
            };
            functions.push((section.id(), name, suffix));
        }
    }

    // Tree traversal does not guarantee id order once concurrent probes
    // have interleaved; the file always stores calls sorted by id.
    let mut calls: Vec<&Call> = profile.calls().collect();
    calls.sort_by_key(|c| c.id());

    let string_offset = HEADER_SIZE;
    let function_offset = string_offset + align4(strings.size());

    out.write_u64::<LittleEndian>(MAGIC)?;
    out.write_u32::<LittleEndian>(VERSION)?;
    out.write_u32::<LittleEndian>(functions.len() as u32)?;
    out.write_u32::<LittleEndian>(calls.len() as u32)?;
    out.write_u32::<LittleEndian>(function_offset)?;
    out.write_u32::<LittleEndian>(string_offset)?;
    out.write_u32::<LittleEndian>(strings.size())?;
    out.write_u64::<LittleEndian>(second)?;

    out.write_all(strings.bytes())?;
    let padding = function_offset - string_offset - strings.size();
    out.write_all(&[0xFF, 0xFF, 0xFF][..padding as usize])?;

    for (id, name, suffix) in functions {
        out.write_u32::<LittleEndian>(id.get())?;
        out.write_u32::<LittleEndian>(name)?;
        out.write_u32::<LittleEndian>(suffix)?;
    }

    for call in calls {
        out.write_u32::<LittleEndian>(call.id().get())?;
        out.write_u32::<LittleEndian>(call.parent().map_or(0, CallId::get))?;
        out.write_u32::<LittleEndian>(call.function().get())?;
        out.write_u32::<LittleEndian>(call.flags().bits())?;
        out.write_u64::<LittleEndian>(call.duration())?;
    }

    Ok(())
}

/// Resolves a table-relative string offset. Offsets pointing outside the
/// table fold to the empty string, like the defensively-terminated table of
/// the original format.
fn str_at(strings: &[u8], offset: u32) -> String {
    let offset = offset as usize;
    if offset >= strings.len() {
        return String::new();
    }
    let end = strings[offset..]
        .iter()
        .position(|&b| b == 0)
        .map_or(strings.len(), |p| offset + p);
    String::from_utf8_lossy(&strings[offset..end]).into_owned()
}

pub(crate) fn read<R: Read>(mut input: R, flags: ReadFlags) -> Result<FileContents, ReadError> {
    let magic = input.read_u64::<LittleEndian>().map_err(ReadError::from_read)?;
    if magic != MAGIC {
        return Err(ReadError::BadMagic);
    }

    let header = Header::parse(&mut input)?;
    if header.version != VERSION {
        return Err(ReadError::BadVersion(header.version));
    }
    // The alignment check runs in u64: string_size comes from the file and
    // must not be trusted not to overflow.
    let padded_table = (u64::from(header.string_size) + 3) & !3;
    if header.string_offset != HEADER_SIZE
        || header.function_offset % 4 != 0
        || u64::from(header.function_offset) != u64::from(header.string_offset) + padded_table
    {
        return Err(ReadError::BadHeader);
    }
    let second = if header.second == 0 { 1 } else { header.second };

    let mut blob = Vec::new();
    input
        .by_ref()
        .take(padded_table)
        .read_to_end(&mut blob)
        .map_err(ReadError::from_read)?;
    if blob.len() as u64 != padded_table {
        return Err(ReadError::Truncated);
    }
    let strings = &blob[..header.string_size as usize];

    let mut profile = Profile::new();
    let mut builder = Builder::new(&mut profile, flags);

    for _ in 0..header.function_count {
        let id = input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?;
        let name = input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?;
        let suffix = input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?;

        let id = FunctionId::from_raw(id).ok_or(ReadError::ZeroId)?;
        builder.function(id, &str_at(strings, name), &str_at(strings, suffix));
    }

    for _ in 0..header.call_count {
        let id = input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?;
        let parent = input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?;
        let function = input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?;
        let call_flags = input.read_u32::<LittleEndian>().map_err(ReadError::from_read)?;
        let duration = input.read_u64::<LittleEndian>().map_err(ReadError::from_read)?;

        let id = CallId::from_raw(id).ok_or(ReadError::ZeroId)?;
        let function = FunctionId::from_raw(function).ok_or(ReadError::ZeroId)?;
        builder.call(
            id,
            CallId::from_raw(parent),
            function,
            CallFlags::from_bits_retain(call_flags),
            duration,
        )?;
    }

    Ok(FileContents::new(profile, second))
}
