//! Invocation of the untwister seed recovery tool

pub mod command;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use backend_storage::queue::UntwisterBlock;
use strum::{Display, EnumString};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use self::command::{CommandOutput, CommandRunner};

/// Generator families untwister can brute-force
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum Prng {
    /// glibc `rand()`
    #[strum(serialize = "glibc-rand")]
    GlibcRand,
    /// `java.util.Random`
    #[strum(serialize = "java")]
    Java,
    /// Mersenne Twister
    #[strum(serialize = "mt19937")]
    Mt19937,
    /// PHP `mt_rand()`
    #[strum(serialize = "php-mt_rand")]
    PhpMtRand,
    /// Ruby `rand`
    #[strum(serialize = "ruby-rand")]
    RubyRand,
}

/// Result of one recovery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The tool reported an error, or the block was rejected before running it
    Failed(String),
    /// The tool ran but did not finish cleanly; carries its (possibly empty) stderr
    ErrorButAttempted(String),
    /// The tool finished; carries the recovered seed output
    Recovered(String),
}

impl RecoveryOutcome {
    /// Short label for logs and metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::ErrorButAttempted(_) => "error_but_attempted",
            Self::Recovered(_) => "recovered",
        }
    }
}

impl From<CommandOutput> for RecoveryOutcome {
    /// Anything on stderr is a failure, even when the exit status was 0. A
    /// launch or exit error without stderr still counts as an attempt.
    fn from(output: CommandOutput) -> Self {
        if !output.stderr.is_empty() {
            return Self::Failed(output.stderr);
        }

        if output.error.is_some() {
            return Self::ErrorButAttempted(output.stderr);
        }

        Self::Recovered(output.stdout.trim().to_string())
    }
}

/// Builds the untwister command line for a block
///
/// Quiet mode and brute-force mode are always on; the observed outputs are
/// read from `input_path`.
#[must_use]
pub fn build_args(block: &UntwisterBlock, input_path: &Path) -> Vec<String> {
    vec![
        "-q".to_string(),
        "-b".to_string(),
        "-r".to_string(),
        block.prng.clone(),
        "-D".to_string(),
        block.depth.to_string(),
        "-s".to_string(),
        block.min_seed.to_string(),
        "-S".to_string(),
        block.max_seed.to_string(),
        "-i".to_string(),
        input_path.display().to_string(),
    ]
}

/// Runs untwister against work blocks
pub struct UntwisterInvoker<R> {
    runner: R,
    untwister_path: PathBuf,
}

impl<R: CommandRunner> UntwisterInvoker<R> {
    /// Creates an invoker running the binary at `untwister_path` through `runner`
    pub fn new(runner: R, untwister_path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            untwister_path: untwister_path.into(),
        }
    }

    /// Attempts to recover the seed for one block
    ///
    /// Never fails: every problem is folded into the returned outcome.
    pub async fn invoke(&self, block: &UntwisterBlock) -> RecoveryOutcome {
        let outputs = match validate(block) {
            Ok(outputs) => outputs,
            Err(reason) => {
                warn!("Rejecting block without running untwister: {}", reason);
                return RecoveryOutcome::Failed(reason);
            }
        };

        // Removed when dropped at the end of this call
        let input_file = match stage_inputs(&outputs) {
            Ok(file) => file,
            Err(e) => return RecoveryOutcome::Failed(format!("Failed to stage inputs: {e}")),
        };

        info!(
            "Running untwister for {} over seeds {}..={}",
            block.prng, block.min_seed, block.max_seed
        );
        let args = build_args(block, input_file.path());
        let output = self.runner.run(&self.untwister_path, &args).await;

        if let Some(e) = &output.error {
            warn!("untwister did not finish cleanly: {}", e);
        }

        RecoveryOutcome::from(output)
    }
}

/// Maps an observation onto the tool's `uint32_t` outputs
///
/// Negative values in `i32` range are reinterpreted as two's complement.
fn observed_output(value: i64) -> Option<u32> {
    u32::try_from(value).ok().or_else(|| {
        i32::try_from(value)
            .ok()
            .map(|signed| u32::from_ne_bytes(signed.to_ne_bytes()))
    })
}

/// Checks a block before launching the tool, returning its observed outputs
fn validate(block: &UntwisterBlock) -> Result<Vec<u32>, String> {
    if Prng::from_str(&block.prng).is_err() {
        return Err(format!("Unsupported prng: {}", block.prng));
    }

    if block.min_seed > block.max_seed {
        return Err(format!(
            "Empty seed range: min_seed {} > max_seed {}",
            block.min_seed, block.max_seed
        ));
    }

    block
        .inputs
        .iter()
        .map(|&value| {
            observed_output(value).ok_or_else(|| format!("Observation out of 32-bit range: {value}"))
        })
        .collect()
}

/// Writes the observed outputs one per line, the format untwister reads
fn stage_inputs(outputs: &[u32]) -> std::io::Result<NamedTempFile> {
    let contents: String = outputs.iter().map(|value| format!("{value}\n")).collect();

    let mut file = tempfile::Builder::new()
        .prefix("untwister-inputs-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;

    Ok(file)
}
