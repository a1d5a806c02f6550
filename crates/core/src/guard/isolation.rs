//! Tenant isolation predicate check.

/// Column every tenant-owned table carries.
pub const ISOLATION_COLUMN: &str = "tenant_id";

/// Whether `query` contains the literal predicate `tenant_id = '<tenant_id>'`.
///
/// The column and operator match case-insensitively, with any whitespace
/// around `=`, and the column may be table-qualified (`u.tenant_id`). The
/// quoted value must equal `tenant_id` exactly and the literal must close
/// right after it. The reversed form (`'<id>' = tenant_id`) is not accepted.
///
/// Presence of the predicate is necessary, not sufficient: this does not know
/// which table the predicate applies to or whether it sits under an `OR`.
pub fn has_isolation(query: &str, tenant_id: &str) -> bool {
    if tenant_id.is_empty() {
        return false;
    }

    // ASCII lowering keeps byte offsets aligned with `query`.
    let lower = query.to_ascii_lowercase();
    let bytes = query.as_bytes();

    let mut from = 0;
    while let Some(found) = lower[from..].find(ISOLATION_COLUMN) {
        let start = from + found;
        let end = start + ISOLATION_COLUMN.len();
        from = end;

        if start > 0 && is_ident_byte(bytes[start - 1]) {
            continue;
        }
        if predicate_matches(query, end, tenant_id) {
            return true;
        }
    }

    false
}

fn predicate_matches(query: &str, mut pos: usize, tenant_id: &str) -> bool {
    let bytes = query.as_bytes();

    pos = skip_whitespace(bytes, pos);
    if bytes.get(pos) != Some(&b'=') {
        return false;
    }
    pos = skip_whitespace(bytes, pos + 1);
    if bytes.get(pos) != Some(&b'\'') {
        return false;
    }
    pos += 1;

    if !query[pos..].starts_with(tenant_id) {
        return false;
    }
    pos += tenant_id.len();

    // Closing quote, and not the first half of an escaped `''`.
    bytes.get(pos) == Some(&b'\'') && bytes.get(pos + 1) != Some(&b'\'')
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
        pos += 1;
    }
    pos
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
