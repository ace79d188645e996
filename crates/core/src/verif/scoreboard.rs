//! In-order scoreboard for monitor output.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, error};

use crate::common::TbError;

use super::frame::{SpiResponse, Status};

/// What the next response should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// `Ok` status with this data.
    Data(u16),
    /// `Error` status; data is not compared.
    Unsupported,
}

impl Expected {
    /// Returns `true` if `got` satisfies this expectation.
    pub fn matches(self, got: &SpiResponse) -> bool {
        match self {
            Self::Data(v) => got.status == Status::Ok && got.data == v,
            Self::Unsupported => got.status == Status::Error,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(v) => write!(f, "Data={v:#06x} : Status=Ok"),
            Self::Unsupported => f.write_str("Status=Error"),
        }
    }
}

/// A failed comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Position of the response in the output stream.
    pub index: usize,
    /// Expectation at the head of the queue.
    pub expected: Expected,
    /// Observed response.
    pub got: SpiResponse,
}

/// Totals of a passing scoreboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Responses compared.
    pub compared: usize,
    /// Responses that matched.
    pub matched: usize,
}

/// FIFO of expectations checked against monitor output.
#[derive(Debug, Default)]
pub struct Scoreboard {
    expected: VecDeque<Expected>,
    mismatches: Vec<Mismatch>,
    unexpected: Vec<SpiResponse>,
    compared: usize,
}

impl Scoreboard {
    /// Creates an empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an expectation.
    pub fn add_expected(&mut self, expected: Expected) {
        self.expected.push_back(expected);
    }

    /// Checks one response against the head of the queue.
    pub fn compare(&mut self, got: SpiResponse) -> bool {
        let index = self.compared;
        self.compared += 1;
        let Some(expected) = self.expected.pop_front() else {
            error!("Received a transaction but nothing was expected: {got}");
            self.unexpected.push(got);
            return false;
        };
        if expected.matches(&got) {
            debug!("Received expected transaction {got}");
            true
        } else {
            error!("Received transaction differed from expected output");
            error!("Expected: {expected}");
            error!("Received: {got}");
            self.mismatches.push(Mismatch {
                index,
                expected,
                got,
            });
            false
        }
    }

    /// Expectations not yet matched by a response.
    pub fn pending(&self) -> usize {
        self.expected.len()
    }

    /// Recorded mismatches.
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Responses that arrived with nothing expected.
    pub fn unexpected(&self) -> &[SpiResponse] {
        &self.unexpected
    }

    /// Final verdict.
    ///
    /// # Errors
    ///
    /// [`TbError::Scoreboard`] on any mismatch, unexpected response, or leftover expectation.
    pub fn result(&self) -> Result<ScoreSummary, TbError> {
        if self.mismatches.is_empty() && self.unexpected.is_empty() && self.expected.is_empty() {
            return Ok(ScoreSummary {
                compared: self.compared,
                matched: self.compared,
            });
        }
        if !self.expected.is_empty() {
            error!("{} expected transaction(s) never received", self.expected.len());
        }
        Err(TbError::Scoreboard {
            mismatches: self.mismatches.len(),
            unexpected: self.unexpected.len(),
            missing: self.expected.len(),
        })
    }
}
