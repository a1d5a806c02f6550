//! Prompt text for the usage-analytics model calls.

use usageql_core::TenantId;

/// Schema the generator is told about. Store-wide metadata, not tenant data.
pub const USAGE_SCHEMA: &str = "\
Database Schema for SaaS Product Usage Analytics:

Table: tenants
- id (character varying) - Primary key, tenant identifier
- name (character varying) - Tenant name
- industry (character varying) - Industry classification

Table: users
- id (character varying) - Primary key, user identifier
- tenant_id (character varying) - Foreign key to tenants.id
- name (character varying) - User's full name
- email (character varying) - User's email address
- signup_date (date) - Date when user signed up

Table: features
- id (character varying) - Primary key, feature identifier
- name (character varying) - Feature name
- category (character varying) - Feature category

Table: usage_events
- id (character varying) - Primary key, event identifier
- user_id (character varying) - Foreign key to users.id
- feature_id (character varying) - Foreign key to features.id
- event_type (character varying) - Type of usage event (e.g. 'login', 'feature_used', 'export')
- timestamp (timestamp without time zone) - When the event occurred

Relationships:
- users.tenant_id -> tenants.id (many-to-one)
- usage_events.user_id -> users.id (many-to-one)
- usage_events.feature_id -> features.id (many-to-one)

Business context:
- Multi-tenant SaaS application; each tenant has many users.
- Users interact with features, producing usage events.
- Every query must filter on tenant_id.";

/// System message for SQL generation.
pub fn generation_system(schema: &str, tenant_id: &TenantId) -> String {
    format!(
        "You are a SQL expert specializing in SaaS product usage analytics.

{schema}

CRITICAL RULES:
1. ALWAYS include tenant_id = '{tenant_id}' in the WHERE clause (join through users.tenant_id when querying usage_events).
2. Write exactly one SELECT statement. Never write INSERT, UPDATE, DELETE, DROP, CREATE, ALTER, UNION or comments.
3. Use PostgreSQL syntax.
4. Return only the SQL query, with no explanation and no markdown.
5. Use aggregations (COUNT, SUM, AVG, MAX, MIN) where they answer the question.
6. Handle date ranges with PostgreSQL date functions.
7. Use meaningful column aliases.

Common patterns:
- Active users: users with usage_events in the last 30 days
- Feature adoption: COUNT(DISTINCT user_id) from usage_events
- User growth: COUNT(*) from users with signup_date filters
- Usage frequency: COUNT(*) from usage_events grouped by feature or event_type"
    )
}

pub const EXPLANATION_SYSTEM: &str = "You are a data analyst explaining SQL queries in simple terms. \
Give a brief, business-friendly explanation of what the query does and how it answers the question. \
Use at most 2 sentences.";

pub fn explanation_user(question: &str, query: &str) -> String {
    format!("Question: {question}\n\nSQL Query: {query}\n\nExplain what this query does:")
}

pub const SUMMARY_SYSTEM: &str = "You are a data analyst answering a product-usage question. \
Use only the query results provided. Answer in plain language in at most 3 sentences and \
mention the concrete numbers. If there are no rows, say that no matching data was found.";

pub fn summary_user(
    question: &str,
    query: &str,
    columns: &[String],
    rows_json: &str,
    row_count: usize,
    shown: usize,
) -> String {
    format!(
        "Question: {question}\n\nSQL Query: {query}\n\nColumns: {}\n\n\
         Rows ({row_count} total, showing {shown}):\n{rows_json}",
        columns.join(", ")
    )
}
