//! Expense operations

use rusqlite::{params, Row, ToSql};

use super::{format_timestamp, parse_decimal, parse_timestamp, stored_instant, Database};
use crate::error::Result;
use crate::models::{ExpenseChange, ParsedTransaction, StoredExpense};
use crate::store::ExpenseQuery;

fn row_to_expense(row: &Row) -> rusqlite::Result<StoredExpense> {
    let id: i64 = row.get(0)?;
    let amount: String = row.get(1)?;
    let timestamp: String = row.get(4)?;
    Ok(StoredExpense {
        id: id.to_string(),
        amount: parse_decimal(1, &amount)?,
        category: row.get(2)?,
        note: row.get(3)?,
        timestamp: parse_timestamp(4, &timestamp)?,
    })
}

impl Database {
    /// Append an expense and notify subscribers
    pub fn insert_expense(&self, user_id: &str, tx: &ParsedTransaction) -> Result<StoredExpense> {
        let timestamp = stored_instant(tx.timestamp);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (user_id, amount, category, note, timestamp) VALUES (?, ?, ?, ?, ?)",
            params![
                user_id,
                tx.amount.to_string(),
                tx.category,
                tx.note,
                format_timestamp(timestamp)
            ],
        )?;

        let expense = StoredExpense {
            id: conn.last_insert_rowid().to_string(),
            amount: tx.amount,
            category: tx.category.clone(),
            note: tx.note.clone(),
            timestamp,
        };

        self.publish(
            user_id,
            ExpenseChange {
                added_or_changed: vec![expense.clone()],
                removed: Vec::new(),
            },
        );
        Ok(expense)
    }

    /// Expenses matching the query, newest first
    pub fn list_expenses(&self, user_id: &str, query: &ExpenseQuery) -> Result<Vec<StoredExpense>> {
        let mut sql = String::from(
            "SELECT id, amount, category, note, timestamp FROM expenses WHERE user_id = ?",
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(ref category) = query.category {
            sql.push_str(" AND category = ?");
            values.push(Box::new(category.clone()));
        }
        if let Some(since) = query.since {
            sql.push_str(" AND timestamp >= ?");
            values.push(Box::new(format_timestamp(since)));
        }
        if let Some(until) = query.until {
            sql.push_str(" AND timestamp < ?");
            values.push(Box::new(format_timestamp(until)));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let expenses = stmt
            .query_map(refs.as_slice(), row_to_expense)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(expenses)
    }

    pub fn get_expense(&self, user_id: &str, id: &str) -> Result<Option<StoredExpense>> {
        let Ok(id) = id.parse::<i64>() else {
            return Ok(None);
        };
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, amount, category, note, timestamp FROM expenses WHERE user_id = ? AND id = ?",
        )?;
        let mut rows = stmt.query_map(params![user_id, id], row_to_expense)?;
        Ok(rows.next().transpose()?)
    }

    /// Remove an expense (admin surface only; the pipeline never deletes)
    pub fn delete_expense(&self, user_id: &str, id: &str) -> Result<bool> {
        let Ok(row_id) = id.parse::<i64>() else {
            return Ok(false);
        };
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM expenses WHERE user_id = ? AND id = ?",
            params![user_id, row_id],
        )?;

        if deleted > 0 {
            self.publish(
                user_id,
                ExpenseChange {
                    added_or_changed: Vec::new(),
                    removed: vec![id.to_string()],
                },
            );
        }
        Ok(deleted > 0)
    }
}
