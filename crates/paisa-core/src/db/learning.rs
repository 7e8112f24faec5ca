//! Learned keyword operations

use std::collections::BTreeMap;

use rusqlite::params;

use super::Database;
use crate::error::Result;

impl Database {
    pub fn get_learned_keywords(&self, user_id: &str) -> Result<BTreeMap<String, String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT keyword, category FROM learned_keywords WHERE user_id = ?")?;
        let pairs = stmt
            .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<String, String>>>()?;
        Ok(pairs)
    }

    /// Insert or re-point a keyword; keywords are stored lower-cased
    pub fn upsert_learned_keyword(&self, user_id: &str, keyword: &str, category: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO learned_keywords (user_id, keyword, category) VALUES (?, ?, ?)
            ON CONFLICT(user_id, keyword) DO UPDATE SET category = excluded.category
            "#,
            params![user_id, keyword.trim().to_lowercase(), category.trim()],
        )?;
        Ok(())
    }

    pub fn delete_learned_keyword(&self, user_id: &str, keyword: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM learned_keywords WHERE user_id = ? AND keyword = ?",
            params![user_id, keyword.trim().to_lowercase()],
        )?;
        Ok(deleted > 0)
    }
}
