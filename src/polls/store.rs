//! Poll Store
//!
//! In-memory registry of active polls. Owns all poll state and enforces the
//! mutation invariants: one vote per identity, one-time codes, bounded poll
//! and participant counts, and single destruction (explicit end or expiry
//! sweep, never both).

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Cap on consecutive collisions before the id token is widened by a byte.
const MAX_ID_ATTEMPTS: usize = 64;

/// Cap on code generation attempts. Codes are fixed-length, so exhausting
/// this means the code space is effectively saturated for the poll.
const MAX_CODE_ATTEMPTS: usize = 4096;

/// Result type for poll store operations
pub type PollResult<T> = Result<T, PollError>;

/// Errors reported by poll operations.
///
/// All of these are expected, recoverable conditions surfaced to the
/// requester as a chat reply or HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("A poll with id {id} does not exist")]
    NotFound { id: String },

    #[error("Invalid option: {option}")]
    InvalidOption { option: String },

    #[error("Wrong code")]
    InvalidCode,

    #[error("Already voted in this poll")]
    AlreadyVoted,

    #[error("Only the poll creator may do that")]
    NotCreator,

    #[error("The maximum amount of started polls is exceeded")]
    CapacityExceeded,

    #[error("The maximum amount of participants of this poll is exceeded")]
    TooManyParticipants,

    #[error("Random source unavailable: {0}")]
    RandomSource(String),
}

/// One option's share of an ended poll's votes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEntry {
    /// Option text
    pub option: String,
    /// Number of votes received
    pub votes: usize,
    /// Share of total votes, rendered as `"NN.NN%"`
    pub percentage: String,
}

/// Vote distribution produced when a poll ends.
///
/// Options with zero votes are omitted; entries are ordered by vote count
/// descending, then option text ascending for stable output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    /// Total number of votes cast
    pub total_votes: usize,
    /// Per-option results, best first
    pub distribution: Vec<TallyEntry>,
}

/// Resource limits applied by the store, fixed at construction
#[derive(Debug, Clone)]
pub struct StoreLimits {
    /// Maximum number of concurrently active polls
    pub max_polls: usize,
    /// Maximum outstanding codes per poll
    pub max_codes_per_poll: usize,
    /// Issued code length in hex characters
    pub code_length: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_polls: 1024,
            max_codes_per_poll: 1024,
            code_length: 4,
        }
    }
}

/// A single voting round. Owned exclusively by the store.
#[derive(Debug)]
struct Poll {
    /// Chat identity that started the poll; only this identity may end it
    creator: String,
    /// Creation time, used by the expiry sweep
    created_at: Instant,
    /// Ordered, distinct option texts; always at least two
    options: Vec<String>,
    /// Outstanding one-time codes, each bound to an option
    codes: HashMap<String, String>,
    /// Recorded votes: voter identity -> chosen option
    answers: HashMap<String, String>,
}

/// In-memory registry of active polls.
///
/// A single write lock serializes every check-then-mutate sequence, so a
/// code cannot be double-spent, an identity cannot vote twice under
/// concurrent requests, and the sweep cannot remove a poll mid-operation.
#[derive(Debug)]
pub struct PollStore {
    polls: RwLock<HashMap<String, Poll>>,
    limits: StoreLimits,
}

impl PollStore {
    /// Create a store with the given limits
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            polls: RwLock::new(HashMap::new()),
            limits,
        }
    }

    /// Create a new poll and return its id.
    ///
    /// A single-option input is normalized into a two-option poll by
    /// appending the negation (`"not <option>"`). Option texts must be
    /// non-empty and distinct.
    pub fn create(&self, creator: &str, options: Vec<String>) -> PollResult<String> {
        if options.is_empty() {
            return Err(PollError::InvalidOption {
                option: String::new(),
            });
        }
        let mut seen = HashSet::new();
        for option in &options {
            if option.trim().is_empty() {
                return Err(PollError::InvalidOption {
                    option: option.clone(),
                });
            }
            if !seen.insert(option.as_str()) {
                return Err(PollError::InvalidOption {
                    option: option.clone(),
                });
            }
        }
        let mut options = options;
        if options.len() == 1 {
            options.push(format!("not {}", options[0]));
        }

        let mut polls = self.polls.write();
        if polls.len() >= self.limits.max_polls {
            return Err(PollError::CapacityExceeded);
        }

        let mut token_bytes = id_token_bytes(self.limits.max_polls);
        let mut attempts = 0;
        let id = loop {
            let candidate = random_hex(token_bytes * 2)?;
            if !polls.contains_key(&candidate) {
                break candidate;
            }
            attempts += 1;
            if attempts % MAX_ID_ATTEMPTS == 0 {
                token_bytes += 1;
            }
        };

        polls.insert(
            id.clone(),
            Poll {
                creator: creator.to_string(),
                created_at: Instant::now(),
                options: options.clone(),
                codes: HashMap::new(),
                answers: HashMap::new(),
            },
        );
        tracing::debug!(poll = %id, options = ?options, "poll created");
        Ok(id)
    }

    /// Option list of an active poll
    pub fn options(&self, id: &str) -> PollResult<Vec<String>> {
        let polls = self.polls.read();
        let poll = polls.get(id).ok_or_else(|| PollError::NotFound {
            id: id.to_string(),
        })?;
        Ok(poll.options.clone())
    }

    /// Mint a fresh anonymous code bound to `option`.
    ///
    /// Only outstanding, unconsumed codes count toward the participant
    /// limit and toward collision checks.
    pub fn issue_code(&self, id: &str, option: &str) -> PollResult<String> {
        let mut polls = self.polls.write();
        let poll = polls.get_mut(id).ok_or_else(|| PollError::NotFound {
            id: id.to_string(),
        })?;
        if !poll.options.iter().any(|o| o == option) {
            return Err(PollError::InvalidOption {
                option: option.to_string(),
            });
        }
        let capacity = self
            .limits
            .max_codes_per_poll
            .min(code_space(self.limits.code_length));
        if poll.codes.len() >= capacity {
            return Err(PollError::TooManyParticipants);
        }

        let mut attempts = 0;
        let code = loop {
            let candidate = random_hex(self.limits.code_length)?;
            if !poll.codes.contains_key(&candidate) {
                break candidate;
            }
            attempts += 1;
            if attempts >= MAX_CODE_ATTEMPTS {
                return Err(PollError::TooManyParticipants);
            }
        };
        poll.codes.insert(code.clone(), option.to_string());
        tracing::debug!(poll = %id, outstanding = poll.codes.len(), "code issued");
        Ok(code)
    }

    /// Redeem a code for a vote and return the chosen option.
    ///
    /// On success the code is consumed and the voter's answer recorded in
    /// the same critical section. On failure nothing changes: a rejected
    /// vote leaves the code outstanding.
    pub fn vote(&self, id: &str, code: &str, voter: &str) -> PollResult<String> {
        let mut polls = self.polls.write();
        let poll = polls.get_mut(id).ok_or_else(|| PollError::NotFound {
            id: id.to_string(),
        })?;
        if !poll.codes.contains_key(code) {
            return Err(PollError::InvalidCode);
        }
        if poll.answers.contains_key(voter) {
            return Err(PollError::AlreadyVoted);
        }
        let option = match poll.codes.remove(code) {
            Some(option) => option,
            None => return Err(PollError::InvalidCode),
        };
        poll.answers.insert(voter.to_string(), option.clone());
        tracing::debug!(poll = %id, votes = poll.answers.len(), "vote recorded");
        Ok(option)
    }

    /// End a poll: compute the tally and remove the poll.
    ///
    /// Only the creator may end a poll; a rejected request leaves the poll
    /// active and queryable.
    pub fn end(&self, id: &str, requester: &str) -> PollResult<Tally> {
        let mut polls = self.polls.write();
        match polls.get(id) {
            None => {
                return Err(PollError::NotFound {
                    id: id.to_string(),
                })
            }
            Some(poll) if poll.creator != requester => return Err(PollError::NotCreator),
            Some(_) => {}
        }
        let poll = polls.remove(id).ok_or_else(|| PollError::NotFound {
            id: id.to_string(),
        })?;
        let tally = compute_tally(&poll);
        tracing::debug!(poll = %id, total_votes = tally.total_votes, "poll ended");
        Ok(tally)
    }

    /// Remove every poll whose age meets or exceeds `timeout`.
    ///
    /// Returns the number of polls evicted. Safe to call repeatedly; a
    /// no-op when nothing has expired.
    pub fn sweep_expired(&self, now: Instant, timeout: Duration) -> usize {
        let mut polls = self.polls.write();
        let before = polls.len();
        polls.retain(|_, poll| now.saturating_duration_since(poll.created_at) < timeout);
        before - polls.len()
    }

    /// Number of currently active polls
    pub fn active_polls(&self) -> usize {
        self.polls.read().len()
    }
}

/// Per-option counts and percentages over the recorded answers
fn compute_tally(poll: &Poll) -> Tally {
    let total_votes = poll.answers.len();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for option in poll.answers.values() {
        *counts.entry(option.as_str()).or_insert(0) += 1;
    }
    let mut distribution: Vec<TallyEntry> = counts
        .into_iter()
        .map(|(option, votes)| TallyEntry {
            option: option.to_string(),
            votes,
            percentage: format!("{:.2}%", votes as f64 * 100.0 / total_votes as f64),
        })
        .collect();
    distribution.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.option.cmp(&b.option)));
    Tally {
        total_votes,
        distribution,
    }
}

/// Bytes needed for a poll id token so the configured poll count keeps
/// collision probability negligible (ceil(log2(max_polls) / 8), min 1).
fn id_token_bytes(max_polls: usize) -> usize {
    let bits = (max_polls.max(2) as f64).log2().ceil() as usize;
    bits.div_ceil(8).max(1)
}

/// Number of distinct codes of the given hex length, saturating
fn code_space(code_length: usize) -> usize {
    16usize
        .checked_pow(code_length.min(15) as u32)
        .unwrap_or(usize::MAX)
}

/// Random lowercase-hex token of exactly `chars` characters.
///
/// Odd lengths drop the leading nibble of the generated bytes.
fn random_hex(chars: usize) -> PollResult<String> {
    let mut buf = vec![0u8; chars.div_ceil(2)];
    getrandom::fill(&mut buf).map_err(|e| PollError::RandomSource(e.to_string()))?;
    let mut token = hex::encode(buf);
    if token.len() > chars {
        token.remove(0);
    }
    Ok(token)
}
