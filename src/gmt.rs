use std::io::{self, Write};

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmtRecord {
    pub term: String,
    pub description: String,
    pub genes: Vec<String>,
}

pub fn parse_line(line: &str) -> Result<GmtRecord, SyncError> {
    let mut fields = line.split('\t');
    let (Some(term), Some(description)) = (fields.next(), fields.next()) else {
        let snippet: String = line.chars().take(64).collect();
        return Err(SyncError::MalformedGmtLine(snippet));
    };
    Ok(GmtRecord {
        term: term.to_string(),
        description: description.to_string(),
        genes: fields.map(|gene| gene.to_string()).collect(),
    })
}

pub fn write_record<W: Write>(writer: &mut W, record: &GmtRecord) -> io::Result<()> {
    write!(writer, "{}\t{}", record.term, record.description)?;
    for gene in &record.genes {
        write!(writer, "\t{gene}")?;
    }
    writeln!(writer)
}
