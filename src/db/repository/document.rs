use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::*;

const RECORD_COLUMNS: &str = "id, filename, metadata, path, status, prompt, raw_response,
     missing, sources, suggested_path, created_path, confirmed, chat_history,
     review_comment, created_at";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Full replace by primary key. Denormalized lookup columns are rewritten
/// from the embedded metadata on every call.
pub fn upsert_record(conn: &Connection, record: &DocumentRecord) -> Result<(), DatabaseError> {
    let meta = &record.metadata;
    conn.execute(
        "REPLACE INTO files (id, filename, metadata, tags_ru, tags_en, person, date_of_birth,
         expiration_date, passport_number, path, status, prompt, raw_response, missing, sources,
         suggested_path, created_path, confirmed, chat_history, review_comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
         ?18, ?19, ?20, ?21)",
        params![
            record.id,
            record.filename,
            serde_json::to_string(meta)?,
            serde_json::to_string(meta.localized("ru"))?,
            serde_json::to_string(meta.localized("en"))?,
            meta.person,
            meta.date_of_birth,
            meta.expiration_date,
            meta.passport_number,
            record.path,
            record.status.as_str(),
            record.prompt,
            record.raw_response,
            serde_json::to_string(&record.missing)?,
            serde_json::to_string(&record.sources)?,
            record.suggested_path,
            record.created_path,
            record.confirmed as i32,
            serde_json::to_string(&record.chat_history)?,
            record.review_comment,
            record.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_record(conn: &Connection, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM files WHERE id = ?1"))?;

    let result = stmt.query_row(params![id], read_row);

    match result {
        Ok(row) => Ok(Some(record_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Returns `true` if a row was removed.
pub fn delete_record(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let rows = conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub fn list_records(conn: &Connection) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM files ORDER BY created_at, id"
    ))?;
    let rows = stmt.query_map([], read_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

/// Substring match over the serialized metadata, the canonical person and
/// the passport number. SQLite `LIKE` is case-insensitive for ASCII.
pub fn search_records(conn: &Connection, query: &str) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return list_records(conn);
    }
    let pattern = format!("%{}%", escape_like(query));

    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM files
         WHERE metadata LIKE ?1 ESCAPE '\\'
            OR person LIKE ?1 ESCAPE '\\'
            OR passport_number LIKE ?1 ESCAPE '\\'
         ORDER BY created_at, id"
    ))?;
    let rows = stmt.query_map(params![pattern], read_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

pub fn update_chat_history(
    conn: &Connection,
    id: &str,
    history: &[ChatMessage],
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE files SET chat_history = ?2 WHERE id = ?1",
        params![id, serde_json::to_string(history)?],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "DocumentRecord".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_status(conn: &Connection, id: &str, status: RecordStatus) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE files SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "DocumentRecord".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Internal row type for DocumentRecord mapping
struct RecordRow {
    id: String,
    filename: String,
    metadata: String,
    path: String,
    status: String,
    prompt: Option<String>,
    raw_response: Option<String>,
    missing: String,
    sources: String,
    suggested_path: Option<String>,
    created_path: Option<String>,
    confirmed: i32,
    chat_history: String,
    review_comment: Option<String>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        metadata: row.get(2)?,
        path: row.get(3)?,
        status: row.get(4)?,
        prompt: row.get(5)?,
        raw_response: row.get(6)?,
        missing: row.get(7)?,
        sources: row.get(8)?,
        suggested_path: row.get(9)?,
        created_path: row.get(10)?,
        confirmed: row.get(11)?,
        chat_history: row.get(12)?,
        review_comment: row.get(13)?,
        created_at: row.get(14)?,
    })
}

fn record_from_row(row: RecordRow) -> Result<DocumentRecord, DatabaseError> {
    Ok(DocumentRecord {
        id: row.id,
        filename: row.filename,
        metadata: serde_json::from_str(&row.metadata)?,
        path: row.path,
        status: RecordStatus::from_str(&row.status)?,
        prompt: row.prompt,
        raw_response: row.raw_response,
        missing: serde_json::from_str(&row.missing)?,
        sources: serde_json::from_str(&row.sources)?,
        suggested_path: row.suggested_path,
        created_path: row.created_path,
        confirmed: row.confirmed != 0,
        chat_history: serde_json::from_str(&row.chat_history)?,
        review_comment: row.review_comment,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
    })
}
