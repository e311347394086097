//! CSV export of processed leads.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::models::ProcessedLead;

/// Column order of exported files.
pub const CSV_HEADERS: [&str; 14] = [
    "name",
    "phone",
    "email",
    "address",
    "sector",
    "location",
    "source",
    "website",
    "credit_potential",
    "extracted_at",
    "data_completeness",
    "preferred_contact",
    "contact_urgency",
    "final_score",
];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// One row per lead, absent fields as empty cells.
pub fn lead_row(lead: &ProcessedLead) -> Vec<String> {
    let l = &lead.lead;
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    vec![
        text(&l.name),
        text(&l.phone),
        text(&l.email),
        text(&l.address),
        text(&l.sector),
        text(&l.location),
        text(&l.source),
        text(&l.website),
        text(&l.credit_potential),
        text(&l.extracted_at),
        lead.data_completeness.to_string(),
        lead.preferred_contact.as_str().to_string(),
        lead.contact_urgency.as_str().to_string(),
        lead.final_score.to_string(),
    ]
}

/// Write header plus leads to `w`. Nothing is written for an empty batch.
pub fn write_leads<W: Write>(mut w: W, leads: &[ProcessedLead]) -> io::Result<()> {
    if leads.is_empty() {
        return Ok(());
    }

    let header: Vec<String> = CSV_HEADERS.iter().map(|h| h.to_string()).collect();
    write_row(&mut w, &header)?;
    for lead in leads {
        write_row(&mut w, &lead_row(lead))?;
    }
    Ok(())
}

pub fn to_csv_string(leads: &[ProcessedLead]) -> String {
    let mut buf: Vec<u8> = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_leads(&mut buf, leads);

    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}

/// Save leads to `path`. Returns `false` without creating a file when there is nothing to save.
pub fn write_csv(path: &Path, leads: &[ProcessedLead]) -> io::Result<bool> {
    if leads.is_empty() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    write_leads(&mut writer, leads)?;
    writer.flush()?;

    tracing::info!("✓ {} leads saved to CSV: {}", leads.len(), path.display());
    Ok(true)
}
