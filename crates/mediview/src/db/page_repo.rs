//! Page and item rows: the extracted document body of a job.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A page row together with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub page_index: i64,
    pub width: i64,
    pub height: i64,
    pub items: Vec<ItemRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub text: String,
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    pub confidence: f64,
    pub is_sensitive: bool,
    pub masked_text: Option<String>,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            text: row.get("text")?,
            x: row.get("x")?,
            y: row.get("y")?,
            w: row.get("w")?,
            h: row.get("h")?,
            confidence: row.get("confidence")?,
            is_sensitive: row.get("is_sensitive")?,
            masked_text: row.get("masked_text")?,
        })
    }
}

/// Writes all pages and items of a job in one transaction.
///
/// Either every row lands or none does.
pub fn insert_document(db: &Database, job_id: &str, pages: &[PageRow]) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        {
            let mut page_stmt = tx.prepare(
                "INSERT INTO pages (job_id, page_index, width, height) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut item_stmt = tx.prepare(
                "INSERT INTO items (page_id, text, x, y, w, h, confidence, is_sensitive, masked_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for page in pages {
                let page_id = page_stmt.insert(params![
                    job_id,
                    page.page_index,
                    page.width,
                    page.height
                ])?;
                for item in &page.items {
                    item_stmt.execute(params![
                        page_id,
                        item.text,
                        item.x,
                        item.y,
                        item.w,
                        item.h,
                        item.confidence,
                        item.is_sensitive,
                        item.masked_text,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    })
}

/// Loads a job's pages ordered by index, items in insertion order.
pub fn find_by_job(db: &Database, job_id: &str) -> Result<Vec<PageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut page_stmt = conn.prepare(
            "SELECT id, page_index, width, height FROM pages WHERE job_id = ?1 ORDER BY page_index",
        )?;
        let pages: Vec<(i64, i64, i64, i64)> = page_stmt
            .query_map(params![job_id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut item_stmt = conn.prepare("SELECT * FROM items WHERE page_id = ?1 ORDER BY id")?;
        let mut result = Vec::with_capacity(pages.len());
        for (page_id, page_index, width, height) in pages {
            let items = item_stmt
                .query_map(params![page_id], ItemRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            result.push(PageRow {
                page_index,
                width,
                height,
                items,
            });
        }
        Ok(result)
    })
}
