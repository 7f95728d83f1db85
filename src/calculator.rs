//! Calculator session
//!
//! Drives one user's calculation through its states:
//!
//! ```text
//! Idle -> FileSelected -> Parsing -> Parsed | ParseFailed
//!                                    Parsed -> Estimating -> Estimated | EstimationFailed
//! ```
//!
//! Parsing is split into [`CalculatorSession::start_parse`], which hands out a
//! self-contained [`ParseJob`], and [`CalculatorSession::finish_parse`], which
//! applies its [`ParseOutcome`]. A job may run on another thread. Every file
//! selection bumps a [`FileToken`]; outcomes carrying an older token are
//! discarded, so the last selected file always wins regardless of which parse
//! finishes first.
//!
//! Once a file is parsed its [`MeshAnalysis`] is cached, and changing the
//! print parameters re-prices without touching the geometry again.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::result::ZipError;

use crate::config::{ComplexityThresholds, PricingConfig, UploadLimits};
use crate::error::{Error, Result};
use crate::mesh_ops::{self, MeshAnalysis};
use crate::model::{FileInfo, PrintEstimate, PrintParameters};
use crate::parser;
use crate::pricing;

/// States of a calculator session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculatorState {
    /// No file selected
    Idle,
    /// A file passed the upload gate and awaits parsing
    FileSelected,
    /// A parse job is out
    Parsing,
    /// The mesh was parsed and analyzed
    Parsed,
    /// The file could not be parsed; select another file
    ParseFailed,
    /// Pricing is in progress
    Estimating,
    /// An estimate is available
    Estimated,
    /// Pricing failed; submit different parameters
    EstimationFailed,
}

impl CalculatorState {
    /// Whether [`CalculatorSession::estimate`] may be called
    pub fn can_estimate(&self) -> bool {
        matches!(
            self,
            CalculatorState::Parsed
                | CalculatorState::Estimated
                | CalculatorState::EstimationFailed
        )
    }
}

impl fmt::Display for CalculatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalculatorState::Idle => "idle",
            CalculatorState::FileSelected => "file selected",
            CalculatorState::Parsing => "parsing",
            CalculatorState::Parsed => "parsed",
            CalculatorState::ParseFailed => "parse failed",
            CalculatorState::Estimating => "estimating",
            CalculatorState::Estimated => "estimated",
            CalculatorState::EstimationFailed => "estimation failed",
        };
        f.write_str(name)
    }
}

/// Version of the selected file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileToken(u64);

/// A self-contained parse of one selected file
///
/// Holds everything it needs, so it can be sent to a worker thread.
#[derive(Debug, Clone)]
pub struct ParseJob {
    token: FileToken,
    file: FileInfo,
    bytes: Arc<[u8]>,
    limits: UploadLimits,
    thresholds: ComplexityThresholds,
}

impl ParseJob {
    /// Token of the file this job parses
    pub fn token(&self) -> FileToken {
        self.token
    }

    /// Parse and analyze the file
    pub fn run(self) -> ParseOutcome {
        let result = parser::load_mesh(&self.file.name, &self.bytes, &self.limits)
            .map(|mesh| mesh_ops::analyze(&mesh, &self.thresholds));
        ParseOutcome {
            token: self.token,
            file: self.file,
            result,
        }
    }
}

/// Result of a [`ParseJob`]
#[derive(Debug)]
pub struct ParseOutcome {
    token: FileToken,
    file: FileInfo,
    result: Result<MeshAnalysis>,
}

impl ParseOutcome {
    /// Token of the file that was parsed
    pub fn token(&self) -> FileToken {
        self.token
    }

    /// The analysis, or the parse error
    pub fn result(&self) -> &Result<MeshAnalysis> {
        &self.result
    }
}

struct SelectedFile {
    info: FileInfo,
    bytes: Arc<[u8]>,
}

/// One user's calculation
pub struct CalculatorSession {
    config: PricingConfig,
    state: CalculatorState,
    version: u64,
    file: Option<SelectedFile>,
    analysis: Option<MeshAnalysis>,
    estimate: Option<PrintEstimate>,
    last_error: Option<Error>,
}

impl Default for CalculatorSession {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

impl CalculatorSession {
    /// Create an idle session priced with `config`
    pub fn new(config: PricingConfig) -> Self {
        Self {
            config,
            state: CalculatorState::Idle,
            version: 0,
            file: None,
            analysis: None,
            estimate: None,
            last_error: None,
        }
    }

    /// Current state
    pub fn state(&self) -> CalculatorState {
        self.state
    }

    /// Token of the currently selected file, if any
    pub fn current_token(&self) -> Option<FileToken> {
        self.file.as_ref().map(|_| FileToken(self.version))
    }

    /// Name and size of the selected file
    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref().map(|f| &f.info)
    }

    /// Cached analysis of the parsed file
    pub fn analysis(&self) -> Option<&MeshAnalysis> {
        self.analysis.as_ref()
    }

    /// Latest successful estimate
    pub fn estimate_result(&self) -> Option<&PrintEstimate> {
        self.estimate.as_ref()
    }

    /// Error that moved the session into a failed state
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Pricing configuration
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Select a file, replacing any previous selection
    ///
    /// The upload gate (extension and size) is applied immediately. A rejected
    /// file leaves the session idle. Either way any parse still running for an
    /// earlier file becomes stale.
    pub fn select_file(&mut self, file_name: &str, bytes: impl Into<Arc<[u8]>>) -> Result<FileToken> {
        let bytes = bytes.into();
        self.version += 1;
        self.analysis = None;
        self.estimate = None;
        self.last_error = None;

        if let Err(e) = parser::check_upload(file_name, bytes.len(), &self.config.upload) {
            debug!(file_name, error = %e, "upload rejected");
            self.file = None;
            self.state = CalculatorState::Idle;
            return Err(e);
        }

        self.file = Some(SelectedFile {
            info: FileInfo::new(file_name, bytes.len() as u64),
            bytes,
        });
        self.state = CalculatorState::FileSelected;
        debug!(file_name, token = self.version, "file selected");
        Ok(FileToken(self.version))
    }

    /// Hand out a parse job for the selected file
    ///
    /// Allowed whenever a file is selected; re-parsing an already parsed
    /// file is permitted.
    pub fn start_parse(&mut self) -> Result<ParseJob> {
        let file = self.file.as_ref().ok_or_else(|| {
            Error::InvalidState(format!("cannot parse in state '{}': no file selected", self.state))
        })?;
        let job = ParseJob {
            token: FileToken(self.version),
            file: file.info.clone(),
            bytes: Arc::clone(&file.bytes),
            limits: self.config.upload.clone(),
            thresholds: self.config.complexity_thresholds,
        };
        self.analysis = None;
        self.estimate = None;
        self.last_error = None;
        self.state = CalculatorState::Parsing;
        Ok(job)
    }

    /// Apply a parse outcome
    ///
    /// Returns `false` and leaves the session untouched when the outcome
    /// belongs to a file that is no longer selected.
    pub fn finish_parse(&mut self, outcome: ParseOutcome) -> bool {
        if self.current_token() != Some(outcome.token) || self.state != CalculatorState::Parsing {
            debug!(
                outcome = outcome.token.0,
                current = self.version,
                "discarding stale parse outcome"
            );
            return false;
        }

        match outcome.result {
            Ok(analysis) => {
                info!(
                    file = %outcome.file.name,
                    triangles = analysis.triangle_count,
                    volume_cm3 = analysis.volume_cm3,
                    "parsed upload"
                );
                self.analysis = Some(analysis);
                self.state = CalculatorState::Parsed;
            }
            Err(e) => {
                warn!(file = %outcome.file.name, error = %e, "failed to parse upload");
                self.last_error = Some(e);
                self.state = CalculatorState::ParseFailed;
            }
        }
        true
    }

    /// Parse the selected file synchronously
    ///
    /// On failure the session is in `ParseFailed` and the error is returned.
    pub fn parse(&mut self) -> Result<&MeshAnalysis> {
        let job = self.start_parse()?;
        let outcome = job.run();
        self.finish_parse(outcome);
        match (&self.analysis, &self.last_error) {
            (Some(analysis), _) => Ok(analysis),
            (None, Some(e)) => Err(replay(e)),
            (None, None) => Err(Error::InvalidState("parse produced no result".to_string())),
        }
    }

    /// Price the parsed file with new parameters
    ///
    /// Uses the cached analysis; the file is not parsed again.
    pub fn estimate(&mut self, params: &PrintParameters) -> Result<&PrintEstimate> {
        if !self.state.can_estimate() {
            return Err(Error::InvalidState(format!(
                "cannot estimate in state '{}'",
                self.state
            )));
        }
        let (Some(analysis), Some(file)) = (self.analysis.as_ref(), self.file.as_ref()) else {
            return Err(Error::InvalidState("no parsed mesh is cached".to_string()));
        };

        self.state = CalculatorState::Estimating;
        match pricing::estimate_cost(analysis, &file.info, params, &self.config) {
            Ok(estimate) => {
                info!(
                    file = %estimate.file_name,
                    total = estimate.cost.total_cost,
                    "estimated print"
                );
                self.last_error = None;
                self.state = CalculatorState::Estimated;
                Ok(&*self.estimate.insert(estimate))
            }
            Err(e) => {
                warn!(error = %e, "estimation failed");
                self.estimate = None;
                self.state = CalculatorState::EstimationFailed;
                let returned = replay(&e);
                self.last_error = Some(e);
                Err(returned)
            }
        }
    }

    /// Forget the selected file and return to `Idle`
    pub fn reset(&mut self) {
        self.version += 1;
        self.file = None;
        self.analysis = None;
        self.estimate = None;
        self.last_error = None;
        self.state = CalculatorState::Idle;
    }
}

/// Rebuild an error so it can be both returned and kept in the session
///
/// `Error` is not `Clone` because I/O and ZIP sources are not. Those are
/// rebuilt with the same variant and message, so the returned error and
/// [`CalculatorSession::last_error`] always carry the same code.
fn replay(error: &Error) -> Error {
    match error {
        Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
        Error::Zip(e) => Error::Zip(replay_zip(e)),
        Error::Xml(e) => Error::Xml(e.clone()),
        Error::XmlAttr(m) => Error::XmlAttr(m.clone()),
        Error::InvalidFormat(m) => Error::InvalidFormat(m.clone()),
        Error::Truncated { expected, actual } => Error::Truncated {
            expected: *expected,
            actual: *actual,
        },
        Error::EmptyMesh => Error::EmptyMesh,
        Error::CorruptGeometry(m) => Error::CorruptGeometry(m.clone()),
        Error::InvalidParameter(m) => Error::InvalidParameter(m.clone()),
        Error::FileTooLarge { size, limit } => Error::FileTooLarge {
            size: *size,
            limit: *limit,
        },
        Error::UnsupportedFileType(m) => Error::UnsupportedFileType(m.clone()),
        Error::InvalidRequest(m) => Error::InvalidRequest(m.clone()),
        Error::InvalidState(m) => Error::InvalidState(m.clone()),
        Error::Computation(m) => Error::Computation(m.clone()),
        Error::NotFound(m) => Error::NotFound(m.clone()),
        Error::SessionMismatch => Error::SessionMismatch,
        Error::Serialization(m) => Error::Serialization(m.clone()),
    }
}

fn replay_zip(error: &ZipError) -> ZipError {
    match error {
        ZipError::InvalidArchive(m) => ZipError::InvalidArchive(m.clone()),
        ZipError::UnsupportedArchive(m) => ZipError::UnsupportedArchive(*m),
        ZipError::FileNotFound => ZipError::FileNotFound,
        ZipError::InvalidPassword => ZipError::InvalidPassword,
        ZipError::Io(e) => ZipError::Io(std::io::Error::new(e.kind(), e.to_string())),
        other => ZipError::Io(std::io::Error::other(other.to_string())),
    }
}
