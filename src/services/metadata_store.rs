//! DocumentRepository — the `documents` table in SQLite.

use super::{DocumentError, DocumentResult};
use crate::models::document::{Document, NewDocument};
use sqlx::SqlitePool;
use std::sync::Arc;

const DOCUMENT_COLUMNS: &str =
    "id, name, file_name, description, file_type, file_size, file_path, upload_date";

#[derive(Clone)]
pub struct DocumentRepository {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl DocumentRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a document and return the stored row with its assigned id.
    ///
    /// Blank `name`/`file_name` values are rejected by the table's CHECK
    /// constraints and reported as `DocumentError::Validation`.
    pub async fn insert(&self, doc: &NewDocument) -> DocumentResult<Document> {
        let sql = format!(
            "INSERT INTO documents (
                name, file_name, description, file_type, file_size, file_path, upload_date
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {DOCUMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Document>(&sql)
            .bind(&doc.name)
            .bind(&doc.file_name)
            .bind(&doc.description)
            .bind(&doc.file_type)
            .bind(doc.file_size)
            .bind(&doc.file_path)
            .bind(doc.upload_date)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| {
                if is_constraint_violation(&err) {
                    DocumentError::Validation(err.to_string())
                } else {
                    DocumentError::Sqlx(err)
                }
            })
    }

    /// Point lookup; a missing id is `Ok(None)`.
    pub async fn get_by_id(&self, id: i64) -> DocumentResult<Option<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?");
        let doc = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(doc)
    }

    pub async fn list_all(&self) -> DocumentResult<Vec<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id ASC");
        let docs = sqlx::query_as::<_, Document>(&sql)
            .fetch_all(&*self.db)
            .await?;
        Ok(docs)
    }

    /// Case-insensitive substring match on `name`. An empty query matches
    /// every row.
    pub async fn search_by_name(&self, query: &str) -> DocumentResult<Vec<Document>> {
        self.search_by(query, |doc| Some(doc.name.as_str())).await
    }

    /// Case-insensitive substring match on `file_type`. Rows without a file
    /// type only match the empty query.
    pub async fn search_by_file_type(&self, query: &str) -> DocumentResult<Vec<Document>> {
        self.search_by(query, |doc| doc.file_type.as_deref()).await
    }

    /// Returns `true` when a row was removed.
    pub async fn delete_by_id(&self, id: i64) -> DocumentResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lightweight connectivity check (`SELECT 1`).
    pub async fn ping(&self) -> DocumentResult<()> {
        let value: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&*self.db).await?;
        if value != 1 {
            return Err(DocumentError::Sqlx(sqlx::Error::Protocol(format!(
                "unexpected result: {}",
                value
            ))));
        }
        Ok(())
    }

    /// Filter every row on a Unicode-folded substring of `field`.
    ///
    /// SQLite's `lower()` folds ASCII only, so the comparison happens here.
    async fn search_by<F>(&self, query: &str, field: F) -> DocumentResult<Vec<Document>>
    where
        F: Fn(&Document) -> Option<&str>,
    {
        let docs = self.list_all().await?;
        if query.is_empty() {
            return Ok(docs);
        }

        let needle = query.to_lowercase();
        Ok(docs
            .into_iter()
            .filter(|doc| field(doc).is_some_and(|value| value.to_lowercase().contains(&needle)))
            .collect())
    }
}

/// Return true if SQLx error is a CHECK or NOT NULL constraint violation.
fn is_constraint_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.is_check_violation() || db_err.message().contains("NOT NULL constraint")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    async fn setup_repo() -> DocumentRepository {
        DocumentRepository::new(Arc::new(memory_pool().await))
    }

    fn new_doc(name: &str, file_name: &str, file_type: Option<&str>) -> NewDocument {
        NewDocument::new(
            name,
            file_name,
            format!("{}_{}", uuid::Uuid::new_v4(), file_name),
            42,
        )
        .with_file_type(file_type.map(str::to_string))
    }

    #[tokio::test]
    async fn insert_assigns_id_and_round_trips_fields() {
        let repo = setup_repo().await;
        let doc = new_doc("Q1 Report", "report.pdf", Some("application/pdf"))
            .with_description(Some("quarterly".into()));

        let stored = repo.insert(&doc).await.unwrap();
        assert!(stored.id > 0);
        assert_eq!(stored.name, "Q1 Report");
        assert_eq!(stored.file_name, "report.pdf");
        assert_eq!(stored.description.as_deref(), Some("quarterly"));
        assert_eq!(stored.file_type.as_deref(), Some("application/pdf"));
        assert_eq!(stored.file_size, 42);
        assert_eq!(stored.file_path, doc.file_path);
        assert_eq!(stored.upload_date, doc.upload_date);

        let fetched = repo.get_by_id(stored.id).await.unwrap();
        assert_eq!(fetched, Some(stored));
    }

    #[tokio::test]
    async fn insert_rejects_blank_name() {
        let repo = setup_repo().await;

        let result = repo.insert(&new_doc("   ", "a.txt", None)).await;
        assert!(matches!(result, Err(DocumentError::Validation(_))));

        let result = repo.insert(&new_doc("name", "", None)).await;
        assert!(matches!(result, Err(DocumentError::Validation(_))));

        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_id_missing_is_none() {
        let repo = setup_repo().await;
        assert_eq!(repo.get_by_id(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_all_is_insertion_ordered() {
        let repo = setup_repo().await;
        let first = repo.insert(&new_doc("b", "b.txt", None)).await.unwrap();
        let second = repo.insert(&new_doc("a", "a.txt", None)).await.unwrap();

        let ids: Vec<i64> = repo.list_all().await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn search_by_name_is_case_insensitive() {
        let repo = setup_repo().await;
        let invoice = repo.insert(&new_doc("Invoice", "inv.pdf", None)).await.unwrap();
        repo.insert(&new_doc("Receipt", "r.pdf", None)).await.unwrap();

        let hits = repo.search_by_name("invoice").await.unwrap();
        assert_eq!(hits, vec![invoice.clone()]);

        let hits = repo.search_by_name("VOI").await.unwrap();
        assert_eq!(hits, vec![invoice]);

        assert!(repo.search_by_name("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_by_name_folds_non_ascii_case() {
        let repo = setup_repo().await;
        let doc = repo
            .insert(&new_doc("Ärger Rechnung", "r.pdf", None))
            .await
            .unwrap();
        repo.insert(&new_doc("Quittung", "q.pdf", None)).await.unwrap();

        assert_eq!(repo.search_by_name("ärger").await.unwrap(), vec![doc.clone()]);
        assert_eq!(repo.search_by_name("ÄRGER").await.unwrap(), vec![doc.clone()]);
        assert_eq!(repo.search_by_name("rechnung").await.unwrap(), vec![doc]);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let repo = setup_repo().await;
        repo.insert(&new_doc("plain", "p.txt", None)).await.unwrap();
        let percent = repo.insert(&new_doc("100% done", "d.txt", None)).await.unwrap();

        assert_eq!(repo.search_by_name("%").await.unwrap(), vec![percent]);
        assert!(repo.search_by_name("_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_search_returns_everything() {
        let repo = setup_repo().await;
        repo.insert(&new_doc("one", "1.txt", None)).await.unwrap();
        repo.insert(&new_doc("two", "2.txt", Some("text/plain"))).await.unwrap();

        assert_eq!(
            repo.search_by_name("").await.unwrap(),
            repo.list_all().await.unwrap()
        );
    }

    #[tokio::test]
    async fn search_by_file_type_skips_untyped_rows() {
        let repo = setup_repo().await;
        let pdf = repo
            .insert(&new_doc("a", "a.pdf", Some("application/PDF")))
            .await
            .unwrap();
        repo.insert(&new_doc("b", "b.bin", None)).await.unwrap();

        assert_eq!(repo.search_by_file_type("pdf").await.unwrap(), vec![pdf]);
        assert_eq!(repo.search_by_file_type("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_by_id_reports_whether_a_row_was_removed() {
        let repo = setup_repo().await;
        let doc = repo.insert(&new_doc("x", "x.txt", None)).await.unwrap();

        assert!(repo.delete_by_id(doc.id).await.unwrap());
        assert!(!repo.delete_by_id(doc.id).await.unwrap());
        assert_eq!(repo.get_by_id(doc.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = setup_repo().await;
        let first = repo.insert(&new_doc("x", "x.txt", None)).await.unwrap();
        repo.delete_by_id(first.id).await.unwrap();

        let second = repo.insert(&new_doc("y", "y.txt", None)).await.unwrap();
        assert!(second.id > first.id);
    }
}
