//! Mapping archive positions onto the working log.
//!
//! The working log ends with the last `tail_len` archived messages verbatim.
//! A position in the archive either lands in that tail, in which case it has
//! the same offset from the end in both logs, or it lies in the condensed
//! region that only the summary represents.

use tale_ai::{Error, Result};

/// Where an archive position falls in the working log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Present verbatim at this offset from the end (always `<= 0`)
    Verbatim(isize),
    /// Folded into the summary
    Condensed,
}

fn reverse_offset(raw: isize, archived_len: usize) -> isize {
    if raw >= 0 {
        raw - archived_len as isize
    } else {
        raw
    }
}

fn place(reverse: isize, tail_len: usize) -> Placement {
    if reverse >= -(tail_len as isize) {
        Placement::Verbatim(reverse)
    } else {
        Placement::Condensed
    }
}

/// Translate the position of an existing archived message
pub fn translate_index(raw: isize, archived_len: usize, tail_len: usize) -> Result<Placement> {
    let reverse = reverse_offset(raw, archived_len);
    if reverse < -(archived_len as isize) || reverse >= 0 {
        return Err(Error::IndexOutOfRange {
            index: raw,
            len: archived_len,
        });
    }
    Ok(place(reverse, tail_len))
}

/// Translate an insertion point or range end. `Verbatim(0)` is the end of the log.
pub fn translate_boundary(raw: isize, archived_len: usize, tail_len: usize) -> Result<Placement> {
    let reverse = reverse_offset(raw, archived_len);
    if reverse < -(archived_len as isize) || reverse > 0 {
        return Err(Error::IndexOutOfRange {
            index: raw,
            len: archived_len,
        });
    }
    Ok(place(reverse, tail_len))
}
