//! The XML stats codec.
//!
//! The schema mirrors the binary layout:
//!
//! ```xml
//! <stats second="TICKS_PER_SECOND">
//!     <functions>
//!         <fn id="1" name="app::work" suffix="io"/>
//!     </functions>
//!     <calls>
//!         <call id="1" parent="0" function="1" duration="250" syscall="true"/>
//!     </calls>
//! </stats>
//! ```
//!
//! The writer always emits `<functions>` before `<calls>`; the reader
//! accepts either order, driving off element names rather than position.

use std::io::{Read, Write};

use xml_rs::attribute::OwnedAttribute;
use xml_rs::reader::{EventReader, XmlEvent};

use crate::builder::Builder;
use crate::call::{CallFlags, CallId};
use crate::error::ReadError;
use crate::profile::Profile;
use crate::read::ReadFlags;
use crate::section::FunctionId;

// Ampersand first, so the other entities don't get double-escaped.
fn escape(attr: &str) -> String {
    attr.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub(crate) fn write<W: Write>(mut out: W, profile: &Profile, second: u64) -> std::io::Result<()> {
    writeln!(out, "<stats second=\"{second}\">")?;

    writeln!(out, "\t<functions>")?;
    for function in profile.functions() {
        for section in function.sections() {
            write!(
                out,
                "\t\t<fn id=\"{}\" name=\"{}\"",
                section.id().get(),
                escape(function.nice())
            )?;
            if !section.name().is_empty() {
                write!(out, " suffix=\"{}\"", escape(section.name()))?;
            }
            writeln!(out, "/>")?;
        }
    }
    writeln!(out, "\t</functions>")?;

    writeln!(out, "\t<calls>")?;
    for function in profile.functions() {
        for section in function.sections() {
            for call in section.calls() {
                write!(out, "\t\t<call id=\"{}\"", call.id().get())?;
                if let Some(parent) = call.parent() {
                    write!(out, " parent=\"{}\"", parent.get())?;
                }
                write!(out, " function=\"{}\"", call.function().get())?;
                write!(out, " duration=\"{}\"", call.duration())?;
                if call.is_syscall() {
                    write!(out, " syscall=\"true\"")?;
                }
                writeln!(out, " />")?;
            }
        }
    }
    writeln!(out, "\t</calls>")?;

    writeln!(out, "</stats>")?;
    Ok(())
}

fn parse_u64(value: &str, attr: &'static str) -> Result<u64, ReadError> {
    value.parse().map_err(|_| ReadError::BadNumber(attr))
}

fn parse_u32(value: &str, attr: &'static str) -> Result<u32, ReadError> {
    value.parse().map_err(|_| ReadError::BadNumber(attr))
}

fn attr<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.as_str())
}

fn read_stats(attributes: &[OwnedAttribute]) -> Result<u64, ReadError> {
    let second = match attr(attributes, "second") {
        Some(value) => parse_u64(value, "second")?,
        None => 0,
    };
    Ok(if second == 0 { 1 } else { second })
}

fn read_function(builder: &mut Builder, attributes: &[OwnedAttribute]) -> Result<(), ReadError> {
    let id = attr(attributes, "id").ok_or(ReadError::MissingAttribute("id"))?;
    let id = FunctionId::from_raw(parse_u32(id, "id")?).ok_or(ReadError::ZeroId)?;
    let name = attr(attributes, "name").unwrap_or("");
    let suffix = attr(attributes, "suffix").unwrap_or("");
    builder.function(id, name, suffix);
    Ok(())
}

fn read_call(builder: &mut Builder, attributes: &[OwnedAttribute]) -> Result<(), ReadError> {
    let id = attr(attributes, "id").ok_or(ReadError::MissingAttribute("id"))?;
    let id = CallId::from_raw(parse_u32(id, "id")?).ok_or(ReadError::ZeroId)?;

    let function = attr(attributes, "function").ok_or(ReadError::MissingAttribute("function"))?;
    let function = FunctionId::from_raw(parse_u32(function, "function")?).ok_or(ReadError::ZeroId)?;

    let parent = match attr(attributes, "parent") {
        Some(value) => CallId::from_raw(parse_u32(value, "parent")?),
        None => None,
    };

    let duration = match attr(attributes, "duration") {
        Some(value) => parse_u64(value, "duration")?,
        None => 0,
    };

    // The flag bits travel either as a raw `flags` number or as the
    // friendlier `syscall="true"`; both spellings are accepted.
    let mut flags = match attr(attributes, "flags") {
        Some(value) => CallFlags::from_bits_retain(parse_u32(value, "flags")?),
        None => CallFlags::empty(),
    };
    if attr(attributes, "syscall") == Some("true") {
        flags |= CallFlags::SYSCALL;
    }

    builder.call(id, parent, function, flags, duration)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Outside,
    Stats,
    Functions,
    Calls,
    AllRead,
}

/// Single-pass, forward-only parse into `profile`. Returns the tick
/// frequency. Any unexpected tag, missing required attribute or zero id
/// aborts the whole read; nothing is salvaged.
pub(crate) fn read<R: Read>(
    input: R,
    profile: &mut Profile,
    flags: ReadFlags,
) -> Result<u64, ReadError> {
    let mut builder = Builder::new(profile, flags);
    let mut stage = Stage::Outside;
    let mut seen_functions = false;
    let mut seen_calls = false;
    let mut second = 1u64;

    for event in EventReader::new(input) {
        match event? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let name = name.local_name.as_str();
                match (stage, name) {
                    (Stage::Outside, "stats") => {
                        second = read_stats(&attributes)?;
                        stage = Stage::Stats;
                    }
                    (Stage::Stats, "functions") if !seen_functions => {
                        seen_functions = true;
                        stage = Stage::Functions;
                    }
                    (Stage::Stats, "calls") if !seen_calls => {
                        seen_calls = true;
                        stage = Stage::Calls;
                    }
                    (Stage::Functions, "fn") => read_function(&mut builder, &attributes)?,
                    (Stage::Calls, "call") => read_call(&mut builder, &attributes)?,
                    _ => return Err(ReadError::UnexpectedElement(name.to_string())),
                }
            }
            XmlEvent::EndElement { name } => {
                let name = name.local_name.as_str();
                match (stage, name) {
                    (Stage::Functions, "fn") | (Stage::Calls, "call") => {}
                    (Stage::Functions, "functions") | (Stage::Calls, "calls") => {
                        stage = Stage::Stats;
                    }
                    (Stage::Stats, "stats") => {
                        if !seen_functions {
                            return Err(ReadError::MissingElement("functions"));
                        }
                        if !seen_calls {
                            return Err(ReadError::MissingElement("calls"));
                        }
                        stage = Stage::AllRead;
                    }
                    _ => return Err(ReadError::UnexpectedElement(name.to_string())),
                }
            }
            // Text, comments and processing instructions carry no data in
            // this schema.
            _ => {}
        }
    }

    if stage != Stage::AllRead {
        return Err(ReadError::MissingElement("stats"));
    }

    Ok(second)
}
