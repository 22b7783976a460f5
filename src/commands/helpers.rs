//! Shared command helpers.

use crate::errors::Result;
use crate::io::Transaction;

/// Runs a transaction, or lists its actions when `dry_run` is set.
///
/// `verb` is used for display (e.g. "split", "merge").
pub fn run_transaction(transaction: &Transaction, dry_run: bool, verb: &str) -> Result<()> {
    if transaction.is_empty() {
        tracing::info!("Nothing to {}.", verb);
        return Ok(());
    }

    if dry_run {
        println!("Would perform {} actions:", transaction.len());
        for desc in transaction.describe() {
            println!("  {}", desc);
        }
        return Ok(());
    }

    transaction.execute()?;
    tracing::debug!("{}: {} actions executed", verb, transaction.len());
    Ok(())
}
