//! Sequence-cursor reads of a member's metrics journal.
//!
//! Each member keeps a bounded, append-only journal of opaque metric
//! records. Reads are addressed to one member and start at a caller-owned
//! cursor. Every read ends in one of three [`ReadOutcome`]s:
//!
//! - **Drained**: nothing new; retry later from `next_sequence`
//! - **Progress**: entries returned; continue from the slice's `next_sequence`
//! - **Gap**: the requested position was already evicted; the caller decides
//!   how to resynchronise
//!
//! [`MetricsJournalReader`] holds no per-cursor state, so independent
//! cursors can share one reader concurrently. A single [`JournalCursor`]
//! must not be advanced from two tasks at once.

pub mod tail;

use serde::{Deserialize, Serialize};

use crate::cluster::Member;
use crate::error::{DecodeError, Result};
use crate::invocation::{Dispatcher, PendingResult, Target};
use crate::protocol::codec::{Codec, ReadMetricsCodec, ReadMetricsRequest};
use crate::protocol::OperationKind;

pub use tail::tail;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsEntry {
    pub sequence: u64,
    pub record: Vec<u8>,
}

/// Contiguous run of journal entries as returned by a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsJournalSlice {
    pub entries: Vec<MetricsEntry>,
    /// Sequence to pass to the next read
    pub next_sequence: u64,
    /// Oldest sequence the member still retains
    pub oldest_sequence: u64,
}

impl MetricsJournalSlice {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first_sequence(&self) -> Option<u64> {
        self.entries.first().map(|e| e.sequence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Drained {
        next_sequence: u64,
    },
    Progress(MetricsJournalSlice),
    /// Entries in `requested..oldest_available` were evicted before they
    /// could be read. `slice` holds whatever the member returned from
    /// `oldest_available` onwards and may be empty.
    Gap {
        requested: u64,
        oldest_available: u64,
        slice: MetricsJournalSlice,
    },
}

impl ReadOutcome {
    pub fn entries(&self) -> &[MetricsEntry] {
        match self {
            ReadOutcome::Drained { .. } => &[],
            ReadOutcome::Progress(slice) | ReadOutcome::Gap { slice, .. } => &slice.entries,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, ReadOutcome::Gap { .. })
    }
}

/// Classify the slice returned for a read at `start`, validating that it
/// continues exactly where the read asked.
pub fn classify(
    start: u64,
    slice: MetricsJournalSlice,
) -> std::result::Result<ReadOutcome, DecodeError> {
    let invalid = |reason: String| DecodeError::new(OperationKind::ReadMetrics, reason);

    if slice.oldest_sequence > slice.next_sequence {
        return Err(invalid(format!(
            "oldest sequence {} is past next sequence {}",
            slice.oldest_sequence, slice.next_sequence
        )));
    }

    let expected_first = start.max(slice.oldest_sequence);
    for (offset, entry) in slice.entries.iter().enumerate() {
        let expected = expected_first + offset as u64;
        if entry.sequence != expected {
            return Err(invalid(format!(
                "expected entry {} but found {}",
                expected, entry.sequence
            )));
        }
    }

    let expected_next = expected_first + slice.entries.len() as u64;
    if slice.entries.is_empty() {
        if slice.next_sequence < expected_first {
            return Err(invalid(format!(
                "next sequence {} rewinds before {}",
                slice.next_sequence, expected_first
            )));
        }
        // Nothing was evicted, so an empty read cannot move the cursor
        if slice.oldest_sequence <= start && slice.next_sequence != start {
            return Err(invalid(format!(
                "empty read at {} advances to {} without a gap",
                start, slice.next_sequence
            )));
        }
    } else if slice.next_sequence != expected_next {
        return Err(invalid(format!(
            "next sequence {} does not follow last entry {}",
            slice.next_sequence,
            expected_next - 1
        )));
    }

    if slice.oldest_sequence > start {
        return Ok(ReadOutcome::Gap {
            requested: start,
            oldest_available: slice.oldest_sequence,
            slice,
        });
    }

    if slice.entries.is_empty() {
        Ok(ReadOutcome::Drained {
            next_sequence: slice.next_sequence,
        })
    } else {
        Ok(ReadOutcome::Progress(slice))
    }
}

/// Issues journal reads against individual members.
#[derive(Debug, Clone)]
pub struct MetricsJournalReader {
    dispatcher: Dispatcher,
}

impl MetricsJournalReader {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Read `member`'s journal from `start_sequence`.
    pub fn read(&self, member: &Member, start_sequence: u64) -> PendingResult<ReadOutcome> {
        let request = ReadMetricsRequest {
            member_id: member.id,
            start_sequence,
        };
        match ReadMetricsCodec::encode_request(&request) {
            Ok(encoded) => self.dispatcher.invoke(
                encoded,
                Target::Member(member.clone()),
                move |payload| {
                    let slice = ReadMetricsCodec::decode_response(payload)?;
                    classify(start_sequence, slice)
                },
            ),
            Err(e) => PendingResult::failed(e),
        }
    }
}

/// Caller-owned read position in one member's journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalCursor {
    member: Member,
    position: u64,
}

impl JournalCursor {
    pub fn new(member: Member, start_sequence: u64) -> Self {
        Self {
            member,
            position: start_sequence,
        }
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read at the cursor and advance it. A gap leaves the cursor in place;
    /// follow up with [`resync`](Self::resync) or
    /// [`accept_gap`](Self::accept_gap).
    pub async fn poll(&mut self, reader: &MetricsJournalReader) -> Result<ReadOutcome> {
        let outcome = reader.read(&self.member, self.position).await?;
        self.advance(&outcome);
        Ok(outcome)
    }

    pub fn advance(&mut self, outcome: &ReadOutcome) {
        match outcome {
            ReadOutcome::Progress(slice) => self.position = slice.next_sequence,
            ReadOutcome::Drained { next_sequence } => self.position = *next_sequence,
            ReadOutcome::Gap { .. } => {}
        }
    }

    pub fn resync(&mut self, sequence: u64) {
        self.position = sequence;
    }

    /// Accept the loss reported by a gap and move past it, keeping any
    /// entries the gap slice carried. Returns the number of skipped entries.
    pub fn accept_gap(&mut self, outcome: &ReadOutcome) -> Option<u64> {
        match outcome {
            ReadOutcome::Gap {
                requested,
                oldest_available,
                slice,
            } => {
                self.position = if slice.is_empty() {
                    *oldest_available
                } else {
                    slice.next_sequence
                };
                Some(oldest_available.saturating_sub(*requested))
            }
            _ => None,
        }
    }
}
