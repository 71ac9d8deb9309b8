//! Interactive Session
//!
//! The prompt flow as an explicit state machine:
//!
//! ```text
//! AwaitingPath -> AwaitingFilterChoice -> AwaitingFilterParameters
//!              -> AwaitingOutputPath -> Processing -> Done | Failed
//! ```
//!
//! Bad input (missing file, non-WAV file, unknown filter, out-of-range
//! parameter) re-prompts in the same state. I/O failures and end of input
//! move straight to `Failed`.

use std::fmt;
use std::io::{BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::LabConfig;
use crate::dsp::{FilterKind, FilterSettings};
use crate::engine::{self, SampleBuffer};
use crate::error::{Result, SoundLabError};

// ============================================================================
// Session State
// ============================================================================

/// Where the session is in the prompt flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingPath,
    AwaitingFilterChoice,
    AwaitingFilterParameters,
    AwaitingOutputPath,
    Processing,
    Done,
    Failed,
}

impl SessionState {
    /// `Done` and `Failed` end the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }

    /// Exit code for a terminal state
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionState::Done => 0,
            _ => 1,
        }
    }

    /// State to re-enter after a recoverable error
    fn retry_state(self) -> Self {
        match self {
            // Parameters that only fail against the actual sample rate
            SessionState::Processing => SessionState::AwaitingFilterParameters,
            other => other,
        }
    }
}

// ============================================================================
// Processing Report
// ============================================================================

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub filter: FilterKind,
    pub params: Value,
    pub input_frames: usize,
    pub output_frames: usize,
    pub sample_rate: u32,
    pub channels: usize,
}

impl fmt::Display for ProcessingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pre-filtered file name: {}", self.input_path.display())?;
        writeln!(f, "Data size: {} -> {} frames", self.input_frames, self.output_frames)?;
        writeln!(f, "Sample frequency: {} Hz", self.sample_rate)?;
        writeln!(f, "Channels: {}", self.channels)?;
        writeln!(f, "Filter applied: {}", self.filter)?;
        writeln!(f, "Filter parameters: {}", self.params)?;
        write!(f, "Output file: {}", self.output_path.display())
    }
}

// ============================================================================
// Session
// ============================================================================

struct LoadedInput {
    path: PathBuf,
    buffer: SampleBuffer,
}

/// One interactive run over a prompt stream
///
/// Generic over its streams so the binary can drive it with stdin/stdout and
/// tests with in-memory buffers.
pub struct Session<R, W> {
    input: R,
    output: W,
    config: LabConfig,
    state: SessionState,
    loaded: Option<LoadedInput>,
    settings: Option<FilterSettings>,
    output_path: Option<PathBuf>,
    report: Option<ProcessingReport>,
    failure: Option<SoundLabError>,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, output: W, config: LabConfig) -> Self {
        Self {
            input,
            output,
            config,
            state: SessionState::AwaitingPath,
            loaded: None,
            settings: None,
            output_path: None,
            report: None,
            failure: None,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run to a terminal state
    ///
    /// # Returns
    /// * `Ok(ProcessingReport)` - when the session reached `Done`
    /// * `Err(SoundLabError)` - the unrecoverable error that caused `Failed`
    pub fn run(mut self) -> Result<ProcessingReport> {
        writeln!(self.output, "\nWelcome to Sound Processing Lab!")?;

        while !self.state.is_terminal() {
            self.step();
        }

        match (self.state, self.report.take(), self.failure.take()) {
            (SessionState::Done, Some(report), _) => Ok(report),
            (_, _, Some(err)) => Err(err),
            _ => Err(SoundLabError::Io(std::io::Error::new(
                ErrorKind::Other,
                "session ended without a result",
            ))),
        }
    }

    /// Handle one prompt (or the processing stage) and transition
    pub fn step(&mut self) -> SessionState {
        let current = self.state;
        let result = match current {
            SessionState::AwaitingPath => self.handle_path(),
            SessionState::AwaitingFilterChoice => self.handle_filter_choice(),
            SessionState::AwaitingFilterParameters => self.handle_parameters(),
            SessionState::AwaitingOutputPath => self.handle_output_path(),
            SessionState::Processing => self.handle_processing(),
            SessionState::Done | SessionState::Failed => return current,
        };

        let next = match result {
            Ok(next) => next,
            Err(err) if err.is_recoverable() => {
                warn!("{} [{}]", err, err.error_code());
                if let Err(e) = writeln!(self.output, "\n{}", err.friendly_message()) {
                    self.failure = Some(e.into());
                    SessionState::Failed
                } else {
                    current.retry_state()
                }
            }
            Err(err) => {
                debug!("Unrecoverable error in {:?}: {:?}", current, err);
                self.failure = Some(err);
                SessionState::Failed
            }
        };

        if next != current {
            debug!("Session: {:?} -> {:?}", current, next);
        }
        self.state = next;
        next
    }

    // ------------------------------------------------------------------------
    // State handlers
    // ------------------------------------------------------------------------

    fn handle_path(&mut self) -> Result<SessionState> {
        let line = self.prompt(
            "\nPlease enter the name of the WAV file you want to process.\n\
             If it is in another folder, include the path (e.g. /Users/me/Music/sound.wav).\n\
             File name: ",
        )?;
        let path = PathBuf::from(unquote(&line));

        if !has_wav_extension(&path) {
            return Err(SoundLabError::UnsupportedFormat {
                format: format!("'{}' does not end in .wav", path.display()),
            });
        }

        let buffer = engine::read(&path)?;
        self.loaded = Some(LoadedInput { path, buffer });
        Ok(SessionState::AwaitingFilterChoice)
    }

    fn handle_filter_choice(&mut self) -> Result<SessionState> {
        let mut menu = String::from("\nPlease choose one of the following sound effects:\n");
        for kind in FilterKind::ALL {
            menu.push_str(&format!("  {} {}\n", kind.menu_number(), kind));
        }
        menu.push_str("Your choice: ");

        let kind: FilterKind = self.prompt(&menu)?.parse()?;
        info!("Selected filter: {}", kind);

        self.settings = Some(self.config.settings_for(kind));
        Ok(SessionState::AwaitingFilterParameters)
    }

    fn handle_parameters(&mut self) -> Result<SessionState> {
        let mut settings = self.settings.take().ok_or_else(|| missing("filter choice"))?;

        writeln!(
            self.output,
            "\n{} settings (press Enter to keep the value in brackets):",
            settings.as_filter().display_name()
        )?;

        for spec in settings.as_filter().param_specs() {
            loop {
                let current = settings.as_filter().to_json()?;
                let shown = display_value(&current[spec.name]);
                let line = self.prompt(&format!("  {} - {} [{}]: ", spec.name, spec.description, shown))?;
                if line.is_empty() {
                    break;
                }

                match settings.as_filter_mut().set_param(spec.name, &parse_value(&line)) {
                    Ok(()) => break,
                    Err(err) if err.is_recoverable() => {
                        warn!("{}", err);
                        writeln!(self.output, "  {}", err.friendly_message())?;
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        let validation = settings.as_filter().validate();
        self.settings = Some(settings);
        validation?;

        Ok(SessionState::AwaitingOutputPath)
    }

    fn handle_output_path(&mut self) -> Result<SessionState> {
        let input_path = &self.loaded.as_ref().ok_or_else(|| missing("input file"))?.path;
        let kind = self.settings.as_ref().ok_or_else(|| missing("filter choice"))?.kind();
        let default = default_output_path(input_path, kind);

        let line = self.prompt(&format!("\nOutput file [{}]: ", default.display()))?;
        let path = if line.is_empty() {
            default
        } else {
            PathBuf::from(unquote(&line))
        };

        if !has_wav_extension(&path) {
            return Err(SoundLabError::invalid_param(
                "output file",
                format!("'{}' does not end in .wav", path.display()),
            ));
        }

        self.output_path = Some(path);
        Ok(SessionState::Processing)
    }

    fn handle_processing(&mut self) -> Result<SessionState> {
        let loaded = self.loaded.as_ref().ok_or_else(|| missing("input file"))?;
        let settings = self.settings.as_ref().ok_or_else(|| missing("filter choice"))?;
        let output_path = self.output_path.clone().ok_or_else(|| missing("output file"))?;

        writeln!(self.output, "\nProcessing sound...")?;

        let source = if self.config.normalize_input {
            loaded.buffer.normalized()
        } else {
            loaded.buffer.clone()
        };

        let filtered = settings.apply(&source)?;
        let filtered = if self.config.normalize_output {
            filtered.normalized()
        } else {
            filtered
        };

        engine::write(&output_path, &filtered)?;

        let report = ProcessingReport {
            input_path: loaded.path.clone(),
            output_path,
            filter: settings.kind(),
            params: settings.as_filter().to_json()?,
            input_frames: loaded.buffer.len(),
            output_frames: filtered.len(),
            sample_rate: filtered.sample_rate(),
            channels: filtered.channels(),
        };

        writeln!(self.output, "Processing completed.\n\n{}", report)?;
        writeln!(
            self.output,
            "\nThank you for using Sound Processing Lab. To process another file, please restart."
        )?;

        self.report = Some(report);
        Ok(SessionState::Done)
    }

    // ------------------------------------------------------------------------
    // Prompt helpers
    // ------------------------------------------------------------------------

    /// Print a prompt and read one trimmed line
    ///
    /// End of input is an I/O error: there is nobody left to re-prompt.
    fn prompt(&mut self, message: &str) -> Result<String> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SoundLabError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "input closed before the session finished",
            )));
        }

        Ok(line.trim().to_string())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn missing(what: &str) -> SoundLabError {
    SoundLabError::Io(std::io::Error::new(
        ErrorKind::Other,
        format!("session reached processing without {}", what),
    ))
}

/// Strip a pair of quotes left by drag-and-drop into a terminal
fn unquote(line: &str) -> &str {
    let line = line.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = line.strip_prefix(quote).and_then(|l| l.strip_suffix(quote)) {
            return inner;
        }
    }
    line
}

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// `<input_dir>/<input_basename>_<filter>.wav`
pub fn default_output_path(input: &Path, filter: FilterKind) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_{}.wav", stem, filter))
}

/// Numbers become JSON numbers, anything else a JSON string
fn parse_value(line: &str) -> Value {
    match line.parse::<f64>() {
        Ok(v) => serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(line.to_string())),
        Err(_) => Value::String(line.to_string()),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
