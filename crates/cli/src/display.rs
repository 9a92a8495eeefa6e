use std::io::{self, Write};

use messages_core::domain::{MessageRecord, Retrieval};
use messages_core::utils::format_ts_local;

/// Numbered listing of the retrieved messages
pub fn print_messages(
    out: &mut impl Write,
    records: &[MessageRecord],
    user_id: &str,
) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No messages found for user {user_id}.");
    }

    writeln!(out, "Messages from user {user_id} ({}):\n", records.len())?;
    for (i, record) in records.iter().enumerate() {
        writeln!(out, "{}. User: {}", i + 1, record.author_id)?;
        writeln!(
            out,
            "   Time: {} ({})",
            format_ts_local(&record.timestamp),
            record.timestamp
        )?;
        writeln!(out, "   Text: {}", record.text)?;
        writeln!(out, "{}", "-".repeat(70))?;
    }
    Ok(())
}

/// Per-author counts over everything the retriever scanned.
pub fn print_statistics(
    out: &mut impl Write,
    retrieval: &Retrieval,
    user_id: &str,
) -> io::Result<()> {
    writeln!(out, "\n=== Statistics ===")?;
    writeln!(
        out,
        "{} messages scanned over {} page(s).",
        retrieval.scanned, retrieval.pages
    )?;
    writeln!(out, "Messages per user:")?;
    for (author, count) in retrieval.ranked_authors() {
        if author == user_id {
            writeln!(out, "  {author}: {count} <- target")?;
        } else {
            writeln!(out, "  {author}: {count}")?;
        }
    }
    Ok(())
}
