use ipnet::Ipv4Net;
use thiserror::Error;

use super::{SignatureEntry, SignatureIndex};
use crate::Category;

impl<C: Category> SignatureIndex<C> {
    /// Builds an index from raw `(start, end, code)` rows as shipped in a signature table.
    ///
    /// Rows must already be sorted by `start` and must not overlap.
    pub fn new<I>(rows: I) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = (u32, u32, u16)>,
    {
        let entries = rows
            .into_iter()
            .map(|(start, end, code)| {
                let category = C::from_code(code).ok_or(SignatureError::UnknownCategory { code })?;
                Ok(SignatureEntry {
                    start,
                    end,
                    category,
                })
            })
            .collect::<Result<Vec<_>, SignatureError>>()?;

        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<SignatureEntry<C>>) -> Result<Self, SignatureError> {
        validate(&entries)?;
        Ok(Self {
            entries: entries.into_boxed_slice(),
        })
    }

    /// Builds an index from networks in any order; each network covers its
    /// whole address block.
    pub fn from_networks<I>(networks: I) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = (Ipv4Net, C)>,
    {
        let mut entries: Vec<_> = networks
            .into_iter()
            .map(|(net, category)| SignatureEntry {
                start: u32::from(net.network()),
                end: u32::from(net.broadcast()),
                category,
            })
            .collect();
        entries.sort_by_key(|e| e.start);

        Self::from_entries(entries)
    }
}

fn validate<C: Category>(entries: &[SignatureEntry<C>]) -> Result<(), SignatureError> {
    let mut previous: Option<&SignatureEntry<C>> = None;
    for entry in entries {
        if entry.category == C::NONE {
            return Err(SignatureError::UnknownCategory {
                code: entry.category.code(),
            });
        }
        if entry.end < entry.start {
            return Err(SignatureError::InvertedRange {
                start: entry.start,
                end: entry.end,
            });
        }
        if let Some(previous) = previous {
            if entry.start < previous.start {
                return Err(SignatureError::Unsorted { start: entry.start });
            }
            if entry.start <= previous.end {
                return Err(SignatureError::Overlapping {
                    start: entry.start,
                    previous_end: previous.end,
                });
            }
        }
        previous = Some(entry);
    }

    Ok(())
}

/// Load-time violations of the signature table invariants.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("category code {code} is not a valid signature category")]
    UnknownCategory { code: u16 },
    #[error("range {start}-{end} ends before it starts")]
    InvertedRange { start: u32, end: u32 },
    #[error("range starting at {start} is out of order")]
    Unsorted { start: u32 },
    #[error("range starting at {start} overlaps the previous range ending at {previous_end}")]
    Overlapping { start: u32, previous_end: u32 },
}
