//! # tarla-id
//!
//! Typed identifiers for pilots, missions, subscriptions and the records
//! around them.
//!
//! Every id renders as `{prefix}_{ulid}`, for example
//! `msn_01HV4Z3MXNKPQR9HSTZ7WCLD4E`. Parsing checks the prefix, so a pilot id
//! never deserializes into a mission id field.
//!
//! ULIDs sort by creation time. The dispatcher relies on that ordering to
//! break reliability ties the same way on every run.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

pub use ulid::Ulid;

/// Shared parser behind every `define_id!` type.
#[doc(hidden)]
pub fn split_prefixed(raw: &str, prefix: &'static str) -> Result<Ulid, IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty);
    }

    let (found, ulid) = raw
        .split_once('_')
        .ok_or_else(|| IdError::NoSeparator(raw.to_string()))?;

    if found != prefix {
        return Err(IdError::WrongPrefix {
            expected: prefix,
            found: found.to_string(),
        });
    }

    Ulid::from_string(ulid).map_err(|e| IdError::BadUlid {
        ulid: ulid.to_string(),
        reason: e.to_string(),
    })
}
