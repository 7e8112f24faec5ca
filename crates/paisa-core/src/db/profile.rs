//! Baseline, alert and budget operations

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{format_timestamp, parse_decimal, parse_timestamp, Database};
use crate::error::Result;
use crate::models::{AlertRecord, BaselineStats};

fn row_to_alert(row: &Row) -> rusqlite::Result<AlertRecord> {
    let alert_type: String = row.get(1)?;
    let amount: String = row.get(2)?;
    let count: i64 = row.get(3)?;
    let timestamp: String = row.get(4)?;
    Ok(AlertRecord {
        category: row.get(0)?,
        alert_type: alert_type.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?,
        amount: parse_decimal(2, &amount)?,
        count: u32::try_from(count).unwrap_or(0),
        timestamp: parse_timestamp(4, &timestamp)?,
    })
}

impl Database {
    /// None when no averages have been written for the user
    pub fn get_baseline(&self, user_id: &str) -> Result<Option<BaselineStats>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT category, average FROM baselines WHERE user_id = ?")?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                let category: String = row.get(0)?;
                let average: String = row.get(1)?;
                Ok((category, parse_decimal(1, &average)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(BaselineStats {
            category_averages: rows.into_iter().collect::<HashMap<_, _>>(),
        }))
    }

    /// Replace the user's baseline wholesale
    pub fn replace_baseline(&self, user_id: &str, stats: &BaselineStats) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM baselines WHERE user_id = ?", params![user_id])?;
        for (category, average) in &stats.category_averages {
            tx.execute(
                "INSERT INTO baselines (user_id, category, average) VALUES (?, ?, ?)",
                params![user_id, category, average.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_alert(&self, user_id: &str, category: &str) -> Result<Option<AlertRecord>> {
        let conn = self.conn()?;
        let alert = conn
            .query_row(
                "SELECT category, alert_type, amount, count, timestamp FROM alerts WHERE user_id = ? AND category = ?",
                params![user_id, category],
                row_to_alert,
            )
            .optional()?;
        Ok(alert)
    }

    pub fn list_alerts(&self, user_id: &str) -> Result<Vec<AlertRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, alert_type, amount, count, timestamp FROM alerts WHERE user_id = ? ORDER BY timestamp DESC",
        )?;
        let alerts = stmt
            .query_map(params![user_id], row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(alerts)
    }

    /// Last writer wins
    pub fn upsert_alert(&self, user_id: &str, alert: &AlertRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO alerts (user_id, category, alert_type, amount, count, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, category) DO UPDATE SET
                alert_type = excluded.alert_type,
                amount = excluded.amount,
                count = excluded.count,
                timestamp = excluded.timestamp
            "#,
            params![
                user_id,
                alert.category,
                alert.alert_type.as_str(),
                alert.amount.to_string(),
                alert.count,
                format_timestamp(alert.timestamp)
            ],
        )?;
        Ok(())
    }

    pub fn get_monthly_budget(&self, user_id: &str) -> Result<Option<Decimal>> {
        let conn = self.conn()?;
        let budget: Option<Option<String>> = conn
            .query_row(
                "SELECT monthly_budget FROM profiles WHERE user_id = ?",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        match budget.flatten() {
            Some(text) => Ok(Some(parse_decimal(0, &text)?)),
            None => Ok(None),
        }
    }

    pub fn set_budget(&self, user_id: &str, budget: Decimal) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO profiles (user_id, monthly_budget) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET monthly_budget = excluded.monthly_budget
            "#,
            params![user_id, budget.to_string()],
        )?;
        Ok(())
    }
}
