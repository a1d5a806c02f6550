//! Read-only safety policy.

use super::{DenyReason, Verdict};

/// The single statement kind allowed to execute.
pub const ALLOWED_KEYWORD: &str = "SELECT";

/// Substrings that deny a query wherever they appear (upper-cased text).
///
/// Mutation, schema change, privilege change, code execution (including
/// functions that evaluate a query string), set-combination, session locks
/// and server administration functions. `EXECUTE` precedes `EXEC` so the
/// reported keyword is the longer one.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "TRUNCATE",
    "ALTER",
    "CREATE",
    "GRANT",
    "REVOKE",
    "EXECUTE",
    "EXEC",
    "UNION",
    "INTERSECT",
    "EXCEPT",
    "MERGE",
    "COPY",
    "CALL",
    "INTO",
    "VACUUM",
    "REINDEX",
    "REFRESH",
    "LISTEN",
    "NOTIFY",
    "PG_SLEEP",
    "PG_READ_FILE",
    "PG_READ_BINARY_FILE",
    "LO_IMPORT",
    "LO_EXPORT",
    "DBLINK",
    "SET_CONFIG",
    // Functions that run a query string built at runtime.
    "QUERY_TO_XML",
    "TABLE_TO_XML",
    "SCHEMA_TO_XML",
    "DATABASE_TO_XML",
    "CURSOR_TO_XML",
    "TS_STAT",
    "TS_REWRITE",
    // Session locks and server administration.
    "PG_ADVISORY",
    "PG_TRY_ADVISORY",
    "PG_TERMINATE_BACKEND",
    "PG_CANCEL_BACKEND",
    "PG_RELOAD_CONF",
    "PG_ROTATE_LOGFILE",
    "PG_SWITCH_WAL",
    "PG_PROMOTE",
    "PG_LOGICAL_",
    "PG_LS_",
    "PG_STAT_FILE",
    "NEXTVAL",
    "SETVAL",
];

/// Comment openers. A comment can hide the rest of a line from the store
/// while still satisfying a textual check.
pub const COMMENT_MARKERS: &[&str] = &["--", "/*"];

/// Decide whether `query` may be executed.
///
/// Upper-cases and trims, then checks (in order): emptiness, the keyword
/// denylist over the whole text, the `SELECT` prefix, comment markers and
/// statement separators. A single trailing `;` is tolerated.
pub fn evaluate(query: &str) -> Verdict {
    let normalized = query.trim().to_uppercase();
    if normalized.is_empty() {
        return Verdict::Denied(DenyReason::Empty);
    }

    if let Some(keyword) = FORBIDDEN_KEYWORDS
        .iter()
        .copied()
        .find(|k| normalized.contains(k))
    {
        return Verdict::Denied(DenyReason::ForbiddenKeyword(keyword));
    }

    if !starts_with_keyword(&normalized, ALLOWED_KEYWORD) {
        return Verdict::Denied(DenyReason::NotReadOnly);
    }

    if let Some(marker) = COMMENT_MARKERS
        .iter()
        .copied()
        .find(|m| normalized.contains(m))
    {
        return Verdict::Denied(DenyReason::Comment(marker));
    }

    let body = normalized
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(&normalized);
    if body.contains(';') {
        return Verdict::Denied(DenyReason::MultipleStatements);
    }

    Verdict::Allowed
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    match text.strip_prefix(keyword) {
        Some(rest) => !rest
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn denied_with(query: &str) -> DenyReason {
        match evaluate(query) {
            Verdict::Denied(r) => r,
            Verdict::Allowed => panic!("expected denial for {query:?}"),
        }
    }

    #[test]
    fn plain_select_is_allowed() {
        assert!(evaluate("SELECT COUNT(*) FROM users WHERE tenant_id = 't1'").is_allowed());
    }

    #[test]
    fn lower_case_and_padding_are_normalized() {
        assert!(evaluate("   select name from users where tenant_id = 't1'  \n").is_allowed());
    }

    #[test]
    fn single_trailing_semicolon_is_tolerated() {
        assert!(evaluate("SELECT 1 FROM users WHERE tenant_id = 't1';").is_allowed());
        assert!(evaluate("SELECT 1 FROM users WHERE tenant_id = 't1' ;  ").is_allowed());
    }

    #[test]
    fn stacked_statements_are_denied_by_keyword() {
        assert_eq!(
            denied_with("SELECT * FROM users; DROP TABLE users;"),
            DenyReason::ForbiddenKeyword("DROP")
        );
    }

    #[test]
    fn interior_separator_is_denied() {
        assert_eq!(
            denied_with("SELECT 1; SELECT 2"),
            DenyReason::MultipleStatements
        );
        assert_eq!(denied_with("SELECT 1;;"), DenyReason::MultipleStatements);
    }

    #[test]
    fn non_select_statement_reports_keyword() {
        assert_eq!(
            denied_with("DROP TABLE users"),
            DenyReason::ForbiddenKeyword("DROP")
        );
        assert_eq!(denied_with("WITH x AS (SELECT 1) SELECT * FROM x"), DenyReason::NotReadOnly);
        assert_eq!(denied_with("SHOW search_path"), DenyReason::NotReadOnly);
    }

    #[test]
    fn empty_query_is_denied() {
        assert_eq!(denied_with(""), DenyReason::Empty);
        assert_eq!(denied_with(" \t\n"), DenyReason::Empty);
    }

    #[test]
    fn prefix_must_be_a_whole_word() {
        assert_eq!(denied_with("SELECTED_ROWS"), DenyReason::NotReadOnly);
        assert!(evaluate("SELECT*FROM users WHERE tenant_id = 't1'").is_allowed());
    }

    #[test]
    fn set_operators_are_denied() {
        assert_eq!(
            denied_with("SELECT id FROM users UNION SELECT id FROM tenants"),
            DenyReason::ForbiddenKeyword("UNION")
        );
        assert_eq!(
            denied_with("select id from users except select id from tenants"),
            DenyReason::ForbiddenKeyword("EXCEPT")
        );
    }

    #[test]
    fn execute_is_reported_before_exec() {
        assert_eq!(
            denied_with("SELECT 1; EXECUTE plan"),
            DenyReason::ForbiddenKeyword("EXECUTE")
        );
    }

    #[test]
    fn comments_are_denied() {
        assert_eq!(
            denied_with("SELECT * FROM users -- tenant_id = 't1'"),
            DenyReason::Comment("--")
        );
        assert_eq!(
            denied_with("SELECT * FROM users /* x */ WHERE tenant_id = 't1'"),
            DenyReason::Comment("/*")
        );
    }

    #[test]
    fn dynamic_query_functions_are_denied() {
        assert_eq!(
            denied_with(
                "SELECT query_to_xml('SEL' || 'ECT name, tenant_id FROM users', true, false, '') \
                 AS x FROM users WHERE tenant_id = 't1'"
            ),
            DenyReason::ForbiddenKeyword("QUERY_TO_XML")
        );
        for f in [
            "table_to_xml('users', true, false, '')",
            "schema_to_xml('public', true, false, '')",
            "database_to_xml(true, false, '')",
            "cursor_to_xml('c', 10, true, false, '')",
            "query_to_xml_and_xmlschema('x', true, false, '')",
            "ts_stat('x')",
        ] {
            let q = format!("SELECT {f} FROM users WHERE tenant_id = 't1'");
            assert!(!evaluate(&q).is_allowed(), "{q}");
        }
    }

    #[test]
    fn session_lock_and_admin_functions_are_denied() {
        assert_eq!(
            denied_with("SELECT pg_advisory_lock(42) AS l FROM users WHERE tenant_id = 't1'"),
            DenyReason::ForbiddenKeyword("PG_ADVISORY")
        );
        for f in [
            "pg_try_advisory_lock(42)",
            "pg_advisory_xact_lock(1)",
            "pg_terminate_backend(123)",
            "pg_cancel_backend(123)",
            "pg_reload_conf()",
            "pg_rotate_logfile()",
            "pg_switch_wal()",
            "pg_ls_dir('.')",
            "nextval('users_id_seq')",
        ] {
            let q = format!("SELECT {f} FROM users WHERE tenant_id = 't1'");
            assert!(!evaluate(&q).is_allowed(), "{q}");
        }
    }

    #[test]
    fn keyword_inside_identifier_is_a_known_false_rejection() {
        // Substring scanning cannot tell a column name from a statement.
        assert_eq!(
            denied_with("SELECT created_at FROM users WHERE tenant_id = 't1'"),
            DenyReason::ForbiddenKeyword("CREATE")
        );
    }

    fn keyword() -> impl Strategy<Value = &'static str> {
        prop::sample::select(FORBIDDEN_KEYWORDS)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: anything not starting with SELECT (after trim, any case) is denied.
        #[test]
        fn non_select_prefix_is_always_denied(q in "\\PC{0,80}") {
            prop_assume!(!q.trim().to_uppercase().starts_with(ALLOWED_KEYWORD));
            prop_assert!(!evaluate(&q).is_allowed());
        }

        /// Property: a denylisted keyword anywhere denies, even after a leading SELECT.
        #[test]
        fn denylisted_keyword_anywhere_is_denied(
            head in "[a-z0-9_ ,*()=']{0,40}",
            tail in "[a-z0-9_ ,*()=']{0,40}",
            kw in keyword(),
            lower in any::<bool>(),
        ) {
            let kw = if lower { kw.to_lowercase() } else { kw.to_string() };
            let q = format!("SELECT {head}{kw}{tail}");
            prop_assert!(!evaluate(&q).is_allowed());
        }
    }
}
