use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, params_from_iter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::models::{COLUMNS, StoredJob};
use crate::silver::read_silver;

pub struct SilverStore {
    conn: Connection,
    path: PathBuf,
}

#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub city: Option<String>,
    pub country: Option<String>,
    pub remote_only: bool,
    pub limit: Option<usize>,
}

const STORED_COLUMNS: &str = "job_id, slug_title, company_name, title, description,
    description_length, remote, url, city, region, country, created_at, loaded_at";

impl SilverStore {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.path.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        // created_year/created_month hold integers, or 'unknown' as text
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS silver_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL,
                slug_title TEXT NOT NULL,
                company_name TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                description_length INTEGER NOT NULL,
                remote INTEGER NOT NULL CHECK (remote IN (0, 1)),
                url TEXT NOT NULL,
                city TEXT NOT NULL,
                region TEXT NOT NULL,
                country TEXT NOT NULL,
                created_at TEXT NOT NULL,
                created_date TEXT NOT NULL,
                created_year INTEGER NOT NULL,
                created_month INTEGER NOT NULL,
                loaded_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_silver_job_id
                ON silver_jobs(job_id) WHERE job_id <> 'unknown';
            CREATE INDEX IF NOT EXISTS idx_silver_city ON silver_jobs(city);
            CREATE INDEX IF NOT EXISTS idx_silver_created ON silver_jobs(created_date);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='silver_jobs'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'jobetl load' or 'jobetl run' first."
            ));
        }
        Ok(())
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM silver_jobs", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Loading ---

    /// Inserts silver rows in one transaction. Rows with a known `job_id`
    /// replace the stored row with the same id; rows without one are
    /// appended. Returns the table size afterwards.
    pub fn load_rows(&mut self, header: &[String], rows: &[Vec<String>], replace: bool) -> Result<i64> {
        let positions = column_positions(header)?;

        let tx = self.conn.transaction()?;
        if replace {
            let removed = tx.execute("DELETE FROM silver_jobs", [])?;
            debug!(removed, "cleared silver_jobs");
        }
        {
            let mut stmt = tx.prepare(&upsert_sql())?;
            for (line, row) in rows.iter().enumerate() {
                if row.len() != header.len() {
                    bail!(
                        "Silver row {} has {} cells, expected {}",
                        line + 2,
                        row.len(),
                        header.len()
                    );
                }
                let values: Vec<rusqlite::types::Value> = positions
                    .iter()
                    .zip(COLUMNS)
                    .map(|(&idx, name)| cell_value(name, &row[idx]))
                    .collect::<Result<_>>()
                    .with_context(|| format!("Invalid silver row {}", line + 2))?;
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        let total = self.count()?;
        info!(rows = rows.len(), total, "silver rows loaded");
        Ok(total)
    }

    // --- Queries ---

    pub fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<StoredJob>> {
        let mut sql = format!("SELECT {} FROM silver_jobs WHERE 1=1", STORED_COLUMNS);
        let mut params: Vec<String> = vec![];

        if let Some(city) = &filter.city {
            params.push(city.clone());
            sql.push_str(&format!(" AND LOWER(city) = LOWER(?{})", params.len()));
        }
        if let Some(country) = &filter.country {
            params.push(country.clone());
            sql.push_str(&format!(" AND LOWER(country) = LOWER(?{})", params.len()));
        }
        if filter.remote_only {
            sql.push_str(" AND remote = 1");
        }
        // undated rows ('unknown') go last
        sql.push_str(" ORDER BY created_at = 'unknown', created_at DESC, id");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), Self::row_to_job)?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list jobs")
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<StoredJob>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM silver_jobs WHERE job_id = ?1", STORED_COLUMNS),
            [job_id],
            Self::row_to_job,
        );
        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<StoredJob> {
        Ok(StoredJob {
            job_id: row.get(0)?,
            slug_title: row.get(1)?,
            company_name: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            description_length: row.get(5)?,
            remote: row.get(6)?,
            url: row.get(7)?,
            city: row.get(8)?,
            region: row.get(9)?,
            country: row.get(10)?,
            created_at: row.get(11)?,
            loaded_at: row.get(12)?,
        })
    }
}

/// Reads a silver CSV and loads it. Returns the table size afterwards.
pub fn load_silver_csv(store: &mut SilverStore, path: &Path, replace: bool) -> Result<i64> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open silver file: {}", path.display()))?;
    let (header, rows) = read_silver(file)
        .with_context(|| format!("Failed to read silver file: {}", path.display()))?;
    if header.iter().all(|h| h.is_empty()) {
        bail!("Silver file is empty: {}", path.display());
    }
    store.load_rows(&header, &rows, replace)
}

fn upsert_sql() -> String {
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = COLUMNS
        .iter()
        .filter(|c| **c != "job_id")
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();
    format!(
        "INSERT INTO silver_jobs ({}) VALUES ({})
         ON CONFLICT(job_id) WHERE job_id <> 'unknown'
         DO UPDATE SET {}, loaded_at = datetime('now')",
        COLUMNS.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

/// Index of each schema column within the file header.
fn column_positions(header: &[String]) -> Result<Vec<usize>> {
    COLUMNS
        .iter()
        .map(|name| {
            header
                .iter()
                .position(|h| h.trim() == *name)
                .ok_or_else(|| anyhow!("Silver header is missing column '{}'", name))
        })
        .collect()
}

fn cell_value(column: &str, cell: &str) -> Result<rusqlite::types::Value> {
    use rusqlite::types::Value;

    match column {
        "description_length" | "remote" => {
            let n: i64 = cell
                .parse()
                .with_context(|| format!("Column '{}' is not an integer: {:?}", column, cell))?;
            Ok(Value::Integer(n))
        }
        "created_year" | "created_month" => Ok(match cell.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Text(cell.to_string()),
        }),
        _ => Ok(Value::Text(cell.to_string())),
    }
}
