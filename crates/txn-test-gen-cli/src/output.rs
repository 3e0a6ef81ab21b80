//! Output formatting for the run summary.

use anyhow::Result;
use txn_test_gen::GenerationSummary;

/// Print a value as JSON (pretty-printed).
pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a key-value pair in human-readable format.
pub fn print_kv(key: &str, value: &str) {
    println!("  {key}: {value}");
}

/// Print a section header.
pub fn print_header(title: &str) {
    println!("\n--- {title} ---");
}

pub fn print_summary(summary: &GenerationSummary) {
    print_header("Generation");
    print_kv("elapsed", &format!("{} ms", summary.elapsed_ms));
    print_kv("executed", &summary.transactions_executed.to_string());
    print_kv("rejected", &summary.transactions_rejected.to_string());
    print_kv("tps", &format!("{:.0}", summary.tps));
    print_kv(
        "billed cpu",
        &format!("{:.1} us/transaction", summary.billed_cpu_us_per_transaction),
    );

    print_header("Blocks");
    print_kv("blocks", &summary.chain.blocks.to_string());
    print_kv(
        "transactions",
        &format!(
            "{} ({} accepted, {} rejected)",
            summary.chain.txns, summary.chain.accepted_txns, summary.chain.rejected_txns
        ),
    );
    print_kv("block tps", &format!("{:.0}", summary.block_tps));
    print_kv(
        "process_transaction",
        &format!("{:.2} ms/block", summary.process_ms_per_block),
    );
    print_kv(
        "sig_transaction",
        &format!("{:.2} ms/block", summary.sig_ms_per_block),
    );
}
