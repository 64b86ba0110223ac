//! Postgres-backed store.
//!
//! Uniqueness comes from the `students_identifier_key` constraint and every
//! write is a single statement, so concurrent requests never observe a
//! half-applied record.

use super::CredentialStore;
use crate::identity::error::StoreError;
use crate::identity::record::{NewStudent, Profile, StudentPatch, StudentRecord};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::Query,
    Connection, PgPool, Postgres, Row,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const SELECT_FIND: &str = r"
    SELECT id, revision, identifier, credential, first_name, last_name, email, student_id,
           education, major, degree_start, degree_end, gender
    FROM students
    WHERE identifier = $1
";

const SELECT_LIST: &str = r"
    SELECT id, revision, identifier, credential, first_name, last_name, email, student_id,
           education, major, degree_start, degree_end, gender
    FROM students
    ORDER BY identifier
";

const INSERT_STUDENT: &str = r"
    INSERT INTO students
        (id, identifier, credential, first_name, last_name, email, student_id,
         education, major, degree_start, degree_end, gender)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    RETURNING id, revision, identifier, credential, first_name, last_name, email, student_id,
              education, major, degree_start, degree_end, gender
";

const UPDATE_STUDENT: &str = r"
    UPDATE students SET
        credential = COALESCE($2, credential),
        first_name = COALESCE($3, first_name),
        last_name = COALESCE($4, last_name),
        email = COALESCE($5, email),
        student_id = COALESCE($6, student_id),
        education = COALESCE($7, education),
        major = COALESCE($8, major),
        degree_start = COALESCE($9, degree_start),
        degree_end = COALESCE($10, degree_end),
        gender = COALESCE($11, gender),
        revision = revision + 1,
        updated_at = NOW()
    WHERE identifier = $1
    RETURNING id, revision, identifier, credential, first_name, last_name, email, student_id,
              education, major, degree_start, degree_end, gender
";

const SWAP_CREDENTIAL: &str = r"
    UPDATE students SET
        credential = $2,
        revision = revision + 1,
        updated_at = NOW()
    WHERE identifier = $1 AND credential IS NOT DISTINCT FROM $3
    RETURNING id, revision, identifier, credential, first_name, last_name, email, student_id,
              education, major, degree_start, degree_end, gender
";

const UPSERT_STUDENT: &str = r"
    INSERT INTO students AS s
        (id, identifier, credential, first_name, last_name, email, student_id,
         education, major, degree_start, degree_end, gender)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (identifier) DO UPDATE SET
        credential = COALESCE(EXCLUDED.credential, s.credential),
        first_name = COALESCE(EXCLUDED.first_name, s.first_name),
        last_name = COALESCE(EXCLUDED.last_name, s.last_name),
        email = COALESCE(EXCLUDED.email, s.email),
        student_id = COALESCE(EXCLUDED.student_id, s.student_id),
        education = COALESCE(EXCLUDED.education, s.education),
        major = COALESCE(EXCLUDED.major, s.major),
        degree_start = COALESCE(EXCLUDED.degree_start, s.degree_start),
        degree_end = COALESCE(EXCLUDED.degree_end, s.degree_end),
        gender = COALESCE(EXCLUDED.gender, s.gender),
        revision = s.revision + 1,
        updated_at = NOW()
    RETURNING id, revision, identifier, credential, first_name, last_name, email, student_id,
              education, major, degree_start, degree_end, gender
";

const DELETE_STUDENT: &str = "DELETE FROM students WHERE identifier = $1";

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `students` table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let span = info_span!("db.migrate", db.system = "postgresql");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Binds identifier, credential and the profile columns in table order.
fn bind_fields<'q>(
    query: Query<'q, Postgres, PgArguments>,
    identifier: &'q str,
    credential: Option<&'q str>,
    profile: &'q Profile,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(identifier)
        .bind(credential)
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .bind(profile.email.as_deref())
        .bind(profile.student_id.as_deref())
        .bind(profile.education.as_deref())
        .bind(profile.major.as_deref())
        .bind(profile.degree_start.as_deref())
        .bind(profile.degree_end.as_deref())
        .bind(profile.gender.as_deref())
}

fn record_from_row(row: &PgRow) -> Result<StudentRecord, sqlx::Error> {
    Ok(StudentRecord {
        id: row.try_get("id")?,
        revision: row.try_get("revision")?,
        identifier: row.try_get("identifier")?,
        credential: row.try_get("credential")?,
        profile: Profile {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            student_id: row.try_get("student_id")?,
            education: row.try_get("education")?,
            major: row.try_get("major")?,
            degree_start: row.try_get("degree_start")?,
            degree_end: row.try_get("degree_end")?,
            gender: row.try_get("gender")?,
        },
    })
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let row = sqlx::query(SELECT_FIND)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", SELECT_FIND))
            .await?;

        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    async fn insert(&self, record: NewStudent) -> Result<StudentRecord, StoreError> {
        let query = bind_fields(
            sqlx::query(INSERT_STUDENT).bind(Uuid::new_v4()),
            &record.identifier,
            record.credential.as_deref(),
            &record.profile,
        );

        match query
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", INSERT_STUDENT))
            .await
        {
            Ok(row) => Ok(record_from_row(&row)?),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Duplicate(record.identifier.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_by_identifier(
        &self,
        identifier: &str,
        patch: &StudentPatch,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let row = bind_fields(
            sqlx::query(UPDATE_STUDENT),
            identifier,
            patch.credential.as_deref(),
            &patch.profile,
        )
        .fetch_optional(&self.pool)
        .instrument(query_span("UPDATE", UPDATE_STUDENT))
        .await?;

        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    async fn swap_credential(
        &self,
        identifier: &str,
        expected: Option<&str>,
        credential: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let row = sqlx::query(SWAP_CREDENTIAL)
            .bind(identifier)
            .bind(credential)
            .bind(expected)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", SWAP_CREDENTIAL))
            .await?;

        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    async fn upsert(
        &self,
        identifier: &str,
        patch: &StudentPatch,
    ) -> Result<StudentRecord, StoreError> {
        let row = bind_fields(
            sqlx::query(UPSERT_STUDENT).bind(Uuid::new_v4()),
            identifier,
            patch.credential.as_deref(),
            &patch.profile,
        )
        .fetch_one(&self.pool)
        .instrument(query_span("UPSERT", UPSERT_STUDENT))
        .await?;

        Ok(record_from_row(&row)?)
    }

    async fn list(&self) -> Result<Vec<StudentRecord>, StoreError> {
        let rows = sqlx::query(SELECT_LIST)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", SELECT_LIST))
            .await?;

        Ok(rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete_by_identifier(&self, identifier: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(DELETE_STUDENT)
            .bind(identifier)
            .execute(&self.pool)
            .instrument(query_span("DELETE", DELETE_STUDENT))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;

        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn schema_declares_unique_identifier() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS students"));
        assert!(SCHEMA_SQL.contains("UNIQUE (identifier)"));
    }

    #[test]
    fn credential_swap_is_conditional() {
        assert!(SWAP_CREDENTIAL.contains("credential IS NOT DISTINCT FROM $3"));
        assert!(!SWAP_CREDENTIAL.contains("COALESCE"));
    }

    #[test]
    fn upsert_merges_with_coalesce() {
        for column in [
            "credential",
            "first_name",
            "last_name",
            "email",
            "student_id",
            "education",
            "major",
            "degree_start",
            "degree_end",
            "gender",
        ] {
            let merge = format!("{column} = COALESCE(EXCLUDED.{column}, s.{column})");
            assert!(UPSERT_STUDENT.contains(&merge), "missing merge for {column}");
        }
    }
}
