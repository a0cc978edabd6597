//! Extraction of a single named member from a ZIP archive.

use std::io::{self, Cursor, Read};

use thiserror::Error;
use zip::{ZipArchive, result::ZipError};

/// Failures while extracting an archive member.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// The bytes are not a readable archive.
    #[error("malformed archive: {message}")]
    Malformed { message: String },
    /// The requested member is absent.
    #[error("{member} not found in archive; available: {available:?}")]
    MemberNotFound {
        member: String,
        /// Every member name the archive holds, sorted.
        available: Vec<String>,
    },
    /// The member could not be decompressed.
    #[error("failed to read {member}: {source}")]
    Read { member: String, source: io::Error },
}

/// Upper bound on how far a member may be assumed to expand relative to its
/// archive when sizing the output buffer up front.
const PREALLOCATION_RATIO: usize = 16;

/// Pull one member's bytes out of an in-memory archive.
pub trait ArchiveReader {
    /// Extract `member` from `archive`.
    ///
    /// # Errors
    /// Returns [`ExtractError`] when the archive is malformed, the member is
    /// missing, or decompression fails.
    fn extract(&self, archive: &[u8], member: &str) -> Result<Vec<u8>, ExtractError>;
}

impl<R: ArchiveReader + ?Sized> ArchiveReader for &R {
    fn extract(&self, archive: &[u8], member: &str) -> Result<Vec<u8>, ExtractError> {
        (**self).extract(archive, member)
    }
}

/// [`ArchiveReader`] backed by the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
    fn extract(&self, archive: &[u8], member: &str) -> Result<Vec<u8>, ExtractError> {
        let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(|err| {
            ExtractError::Malformed {
                message: err.to_string(),
            }
        })?;
        let mut available: Vec<String> = zip.file_names().map(str::to_owned).collect();
        available.sort();

        let mut entry = match zip.by_name(member) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(ExtractError::MemberNotFound {
                    member: member.to_owned(),
                    available,
                });
            }
            Err(err) => {
                return Err(ExtractError::Malformed {
                    message: err.to_string(),
                });
            }
        };
        let mut bytes = Vec::with_capacity(preallocation(entry.size(), archive.len()));
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| ExtractError::Read {
                member: member.to_owned(),
                source,
            })?;
        Ok(bytes)
    }
}

/// Initial buffer size for a member declaring `declared` uncompressed bytes.
///
/// The declared size comes from the archive header and is only a hint; it is
/// capped so a forged header cannot force a huge allocation.
fn preallocation(declared: u64, archive_len: usize) -> usize {
    let cap = archive_len.saturating_mul(PREALLOCATION_RATIO);
    usize::try_from(declared).map_or(cap, |declared| declared.min(cap))
}
