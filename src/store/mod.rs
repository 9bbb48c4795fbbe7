use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;
pub mod models;

use crate::error::ServiceError;
use migrations::run_migrations;

pub use models::{Ledger, RecordOutcome, XP_PER_VIEW};

const TOTAL_XP_META_KEY: &str = "total_xp";

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct StorageInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StorageInner {
    fn shutdown(&self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("Failed to send shutdown to storage thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join storage thread: {join_err:?}");
            }
        }
    }
}

impl Drop for StorageInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

/// Handle to the ledger database. All access funnels through one worker
/// thread that executes tasks in arrival order against a single connection,
/// so every operation is a single in-flight critical section; a read from
/// one call never interleaves with the write of another.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
    db_path: Arc<PathBuf>,
}

impl Storage {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create storage directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("watchstreak-store".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run schema migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Storage initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        StoreCommand::Shutdown => break,
                    }
                }

                info!("Storage thread shutting down");
            })
            .with_context(|| "failed to spawn storage worker thread")?;

        ready_rx
            .recv()
            .context("storage worker exited before signaling readiness")??;

        info!("Ledger store initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(StorageInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Stops the worker thread after the queued tasks drain. Subsequent
    /// calls on any clone of this handle fail with `ChannelUnavailable`.
    pub fn close(&self) {
        self.inner.shutdown();
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Storage caller dropped before receiving result");
            }
        }));

        sender.send(command).map_err(|err| {
            ServiceError::ChannelUnavailable(format!(
                "failed to send command to storage thread: {err}"
            ))
        })?;

        reply_rx
            .await
            .map_err(|_| {
                ServiceError::ChannelUnavailable("storage thread terminated unexpectedly".into())
            })?
            .map_err(|err| ServiceError::StorageUnavailable(format!("{err:#}")))
    }

    /// Reads the ledger, folding the legacy per-view log into the aggregated
    /// layout on first read. An empty database yields an empty ledger
    /// without persisting anything.
    pub async fn load(&self) -> Result<Ledger, ServiceError> {
        self.execute(|conn| {
            let tx = conn
                .transaction()
                .context("failed to open load transaction")?;
            let ledger = load_or_migrate(&tx)?;
            tx.commit().context("failed to commit load transaction")?;
            Ok(ledger)
        })
        .await
    }

    /// Replaces the persisted ledger in one transaction; no partial state is
    /// observable by a later `load`.
    pub async fn save(&self, ledger: Ledger) -> Result<(), ServiceError> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open save transaction")?;
            write_ledger(&tx, &ledger)?;
            tx.commit().context("failed to commit save transaction")?;
            Ok(())
        })
        .await
    }

    /// One complete read-modify-write: load (migrating if needed), increment
    /// the entry for `day_key`, recompute the total, persist.
    pub async fn record_view(&self, day_key: String) -> Result<RecordOutcome, ServiceError> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open record transaction")?;
            let mut ledger = load_or_migrate(&tx)?;
            let count = ledger.record(&day_key);
            write_ledger(&tx, &ledger)?;
            tx.commit().context("failed to commit record transaction")?;

            Ok(RecordOutcome {
                key: day_key,
                count,
                gained: XP_PER_VIEW,
                total_xp: ledger.total_xp,
            })
        })
        .await
    }
}

fn read_meta_total_xp(conn: &Connection) -> Result<Option<u64>> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![TOTAL_XP_META_KEY],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read total_xp meta row")?;

    Ok(value.map(|stored| stored.max(0) as u64))
}

fn read_days(conn: &Connection) -> Result<BTreeMap<String, u32>> {
    let mut stmt = conn
        .prepare("SELECT day_key, view_count FROM activity_days")
        .context("failed to prepare activity_days query")?;

    let mut rows = stmt.query([])?;
    let mut days = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let key: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        days.insert(key, count.max(0) as u32);
    }

    Ok(days)
}

fn read_legacy_log(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT day_key FROM activity_log")
        .context("failed to prepare activity_log query")?;

    let mut rows = stmt.query([])?;
    let mut dates = Vec::new();
    while let Some(row) = rows.next()? {
        dates.push(row.get::<_, String>(0)?);
    }

    Ok(dates)
}

fn write_ledger(conn: &Connection, ledger: &Ledger) -> Result<()> {
    conn.execute("DELETE FROM activity_days", [])
        .context("failed to clear activity_days")?;

    {
        let mut stmt = conn
            .prepare("INSERT INTO activity_days (day_key, view_count) VALUES (?1, ?2)")
            .context("failed to prepare activity_days insert")?;
        for (key, count) in &ledger.days {
            stmt.execute(params![key, *count as i64])
                .with_context(|| format!("failed to insert activity day {key}"))?;
        }
    }

    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![TOTAL_XP_META_KEY, to_i64(ledger.total_xp)?],
    )
    .context("failed to write total_xp meta row")?;

    Ok(())
}

/// The aggregated format is present once the total_xp meta row exists; the
/// presence check makes a second migration a no-op, so folding the legacy
/// log can never double-count. The stored total is only a cache: the
/// returned ledger always carries the map-derived sum.
fn load_or_migrate(conn: &Connection) -> Result<Ledger> {
    if let Some(stored_total) = read_meta_total_xp(conn)? {
        let days = read_days(conn)?;
        let mut ledger = Ledger {
            days,
            total_xp: stored_total,
        };

        let recomputed = ledger.recomputed_total_xp();
        if recomputed != stored_total {
            warn!("Stored totalXP {stored_total} drifted from map-derived {recomputed}");
        }
        ledger.total_xp = recomputed;

        return Ok(ledger);
    }

    let legacy = read_legacy_log(conn)?;
    if legacy.is_empty() {
        return Ok(Ledger::default());
    }

    let ledger = Ledger::from_legacy(&legacy);
    write_ledger(conn, &ledger)?;
    conn.execute("DELETE FROM activity_log", [])
        .context("failed to clear legacy activity log")?;

    info!(
        "Migrated {} legacy view entries into {} aggregated days",
        legacy.len(),
        ledger.days.len()
    );

    Ok(ledger)
}
