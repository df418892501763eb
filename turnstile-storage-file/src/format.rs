//! Line codec for the user store.
//!
//! Each record is one line, `<id>,<role>`, terminated by `\n`. Lines that do
//! not split into exactly two comma-separated fields, or whose id is empty,
//! are skipped on read.
use turnstile_core::{StorageError, UserId, UserRecord};

/// A parsed store plus the lines that were skipped.
#[derive(Debug, Default)]
pub struct ParsedStore {
    pub records: Vec<UserRecord>,
    /// 1-based line number and why the line was rejected.
    pub skipped: Vec<(usize, StorageError)>,
}

/// Parse one line.
///
/// Fails with [`StorageError::Corrupt`] unless the line holds exactly two
/// comma-separated fields with a non-empty id.
pub fn parse_line(line: &str) -> Result<UserRecord, StorageError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some((id, role)) = line.split_once(',') else {
        return Err(StorageError::Corrupt("missing role separator".to_string()));
    };
    if id.is_empty() {
        return Err(StorageError::Corrupt("empty user id".to_string()));
    }
    if role.contains(',') {
        return Err(StorageError::Corrupt("too many fields".to_string()));
    }
    Ok(UserRecord::new(UserId::new(id), role))
}

/// Parse a whole store. Blank lines are ignored silently.
///
/// Works on raw bytes so one undecodable line does not take the rest of
/// the store down with it.
pub fn parse(contents: &[u8]) -> ParsedStore {
    let mut parsed = ParsedStore::default();

    for (index, raw) in contents.split(|&b| b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }
        let result = std::str::from_utf8(raw)
            .map_err(|e| StorageError::Corrupt(format!("invalid UTF-8: {e}")))
            .and_then(parse_line);
        match result {
            Ok(record) => parsed.records.push(record),
            Err(e) => parsed.skipped.push((index + 1, e)),
        }
    }

    parsed
}

/// Encode the full user set.
pub fn encode(users: &[UserRecord]) -> String {
    let mut out = String::new();
    for user in users {
        out.push_str(user.id().as_str());
        out.push(',');
        out.push_str(user.role());
        out.push('\n');
    }
    out
}
