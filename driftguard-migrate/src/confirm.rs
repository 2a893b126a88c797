//! Interactive confirmation gate for `reset`

use driftguard::Environment;
use std::io::{self, BufRead, Write};

/// The operator must type this word to proceed
pub const CONFIRMATION_WORD: &str = "reset";

/// Ask the operator to confirm a reset
///
/// Returns `true` only if the answer, trimmed, is exactly `reset`. End of
/// input counts as a refusal.
///
/// # Errors
///
/// Returns an I/O error if the prompt cannot be written or the answer read.
pub fn confirm_reset<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    environment: Environment,
    database: &str,
) -> io::Result<bool> {
    writeln!(
        output,
        "⚠️  This rolls back EVERY applied migration on {database} ({environment}) and re-applies them."
    )?;
    writeln!(output, "   All data in migrated tables will be lost.")?;
    write!(output, "Type '{CONFIRMATION_WORD}' to continue: ")?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(answer.trim() == CONFIRMATION_WORD)
}
