//! Persistent store for the entitlement ledger (applications, active
//! licenses, migration requests).
//!
//! Backed by a single SQLite file. All timestamps are stored as ISO-8601
//! text; keys and hashes as text. The connection lives behind a mutex so
//! writes are serialized (at-most-one-writer discipline).

use crate::error::{LedgerError, LedgerResult};
use chrono::Utc;
use crewhub_types::{
    ActiveLicense, ApplicationId, ApplicationStatus, LicenseApplication, MachineId, MigrationId,
    MigrationRequest, MigrationStatus, PaymentStatus, Tier,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const APPLICATION_COLUMNS: &str = "id, machine_id, name, company, email, tier, status, \
     payment_status, origin, created_at, processed_at, processed_by, license_key, key_hash, \
     notes, migrated_to, migration_reason";

const LICENSE_COLUMNS: &str = "key_hash, license_key, machine_id, email, company, tier, \
     activated_at, last_validated_at, validation_count, active, application_id";

const MIGRATION_COLUMNS: &str = "id, old_key, old_machine_id, new_machine_id, email, company, \
     reason, status, requested_at, processed_at, processed_by, new_key, new_application_id, notes";

/// Durable repository for the entitlement ledger.
pub struct EntitlementStore {
    conn: Arc<Mutex<Connection>>,
}

impl EntitlementStore {
    /// Opens (or creates) the ledger at the given path.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory ledger (for testing).
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS license_applications (
                id TEXT PRIMARY KEY,
                machine_id TEXT NOT NULL,
                name TEXT NOT NULL,
                company TEXT NOT NULL,
                email TEXT NOT NULL,
                tier TEXT NOT NULL,
                status TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                origin TEXT NOT NULL,
                created_at TEXT NOT NULL,
                processed_at TEXT,
                processed_by TEXT,
                license_key TEXT,
                key_hash TEXT,
                notes TEXT NOT NULL DEFAULT '',
                is_migrated INTEGER NOT NULL DEFAULT 0,
                migrated_to TEXT,
                migration_reason TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_applications_machine
                ON license_applications(machine_id);
            CREATE INDEX IF NOT EXISTS idx_applications_status
                ON license_applications(status);
            CREATE INDEX IF NOT EXISTS idx_applications_key_hash
                ON license_applications(key_hash);

            CREATE TABLE IF NOT EXISTS active_licenses (
                key_hash TEXT PRIMARY KEY,
                license_key TEXT NOT NULL,
                machine_id TEXT NOT NULL,
                email TEXT NOT NULL,
                company TEXT NOT NULL,
                tier TEXT NOT NULL,
                activated_at TEXT NOT NULL,
                last_validated_at TEXT NOT NULL,
                validation_count INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                application_id TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_active_licenses_machine
                ON active_licenses(machine_id);

            CREATE TABLE IF NOT EXISTS license_migrations (
                id TEXT PRIMARY KEY,
                old_key TEXT NOT NULL,
                old_machine_id TEXT NOT NULL,
                new_machine_id TEXT NOT NULL,
                email TEXT NOT NULL,
                company TEXT NOT NULL,
                reason TEXT NOT NULL,
                status TEXT NOT NULL,
                requested_at TEXT NOT NULL,
                processed_at TEXT,
                processed_by TEXT,
                new_key TEXT,
                new_application_id TEXT,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_migrations_status
                ON license_migrations(status);
            ",
        )?;
        Ok(())
    }

    // ── License applications ─────────────────────────────────────

    /// Persists a new license application.
    pub fn create_application(&self, app: &LicenseApplication) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        insert_application(&conn, app)?;
        Ok(())
    }

    /// Returns applications, newest first, optionally filtered by status.
    pub fn applications(
        &self,
        filter: Option<ApplicationStatus>,
    ) -> LedgerResult<Vec<LicenseApplication>> {
        let conn = self.conn.lock().unwrap();
        let mut out = Vec::new();
        match filter {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {APPLICATION_COLUMNS} FROM license_applications \
                     WHERE status = ?1 ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map(params![status.to_string()], read_application)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {APPLICATION_COLUMNS} FROM license_applications \
                     ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map([], read_application)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    /// Looks up one application by id.
    pub fn application(&self, id: ApplicationId) -> LedgerResult<Option<LicenseApplication>> {
        let conn = self.conn.lock().unwrap();
        let app = conn
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM license_applications WHERE id = ?1"),
                params![id.to_string()],
                read_application,
            )
            .optional()?;
        Ok(app)
    }

    /// Looks up the application that was issued the key with this hash.
    pub fn find_application_by_key_hash(
        &self,
        key_hash: &str,
    ) -> LedgerResult<Option<LicenseApplication>> {
        let conn = self.conn.lock().unwrap();
        let app = conn
            .query_row(
                &format!(
                    "SELECT {APPLICATION_COLUMNS} FROM license_applications WHERE key_hash = ?1"
                ),
                params![key_hash],
                read_application,
            )
            .optional()?;
        Ok(app)
    }

    /// Records an administrator review decision. `issued` carries the
    /// generated key and its hash on approval; rejection passes `None` and
    /// any previously issued key is left in place as history.
    pub fn update_review(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        payment: PaymentStatus,
        issued: Option<(&str, &str)>,
        notes: Option<&str>,
        admin: &str,
    ) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let (key, hash) = match issued {
            Some((key, hash)) => (Some(key), Some(hash)),
            None => (None, None),
        };
        let updated = conn.execute(
            "UPDATE license_applications SET
                status = ?1,
                payment_status = ?2,
                license_key = COALESCE(?3, license_key),
                key_hash = COALESCE(?4, key_hash),
                notes = COALESCE(?5, notes),
                processed_at = ?6,
                processed_by = ?7
             WHERE id = ?8",
            params![
                status.to_string(),
                payment.to_string(),
                key,
                hash,
                notes,
                Utc::now().to_rfc3339(),
                admin,
                id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(LedgerError::NotFound(format!("application {id}")));
        }
        Ok(())
    }

    /// Writes a full application row back (admin edit surface).
    pub fn save_application(&self, app: &LicenseApplication) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE license_applications SET
                machine_id = ?1, name = ?2, company = ?3, email = ?4, tier = ?5,
                status = ?6, payment_status = ?7, origin = ?8,
                processed_at = ?9, processed_by = ?10,
                license_key = ?11, key_hash = ?12, notes = ?13,
                is_migrated = ?14, migrated_to = ?15, migration_reason = ?16
             WHERE id = ?17",
            params![
                app.machine_id.as_str(),
                app.name,
                app.company,
                app.email,
                app.tier.to_string(),
                app.status.to_string(),
                app.payment.to_string(),
                app.origin.to_string(),
                app.processed_at.map(|t| t.to_rfc3339()),
                app.processed_by,
                app.license_key,
                app.key_hash,
                app.notes,
                app.is_migrated(),
                app.migrated_to.map(|id| id.to_string()),
                app.migration_reason,
                app.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(LedgerError::NotFound(format!("application {}", app.id)));
        }
        Ok(())
    }

    /// Sets the payment axis only; review status is untouched.
    pub fn set_payment_status(
        &self,
        id: ApplicationId,
        payment: PaymentStatus,
    ) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE license_applications SET payment_status = ?1 WHERE id = ?2",
            params![payment.to_string(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(LedgerError::NotFound(format!("application {id}")));
        }
        Ok(())
    }

    /// True if this machine has ever held a trial-origin application.
    pub fn has_trial_application(&self, machine_id: &MachineId) -> LedgerResult<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM license_applications \
             WHERE machine_id = ?1 AND origin = 'trial')",
            params![machine_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// True if a pending application exists for this machine and tier.
    pub fn has_pending_application(
        &self,
        machine_id: &MachineId,
        tier: Tier,
    ) -> LedgerResult<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM license_applications \
             WHERE machine_id = ?1 AND tier = ?2 AND status = 'pending')",
            params![machine_id.as_str(), tier.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ── Active licenses ──────────────────────────────────────────

    /// Persists a freshly bound active license.
    pub fn create_active_license(&self, license: &ActiveLicense) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        insert_active_license(&conn, license)?;
        Ok(())
    }

    /// Looks up the license record for a key hash, active or retired.
    pub fn find_active_license(&self, key_hash: &str) -> LedgerResult<Option<ActiveLicense>> {
        let conn = self.conn.lock().unwrap();
        let license = conn
            .query_row(
                &format!("SELECT {LICENSE_COLUMNS} FROM active_licenses WHERE key_hash = ?1"),
                params![key_hash],
                read_active_license,
            )
            .optional()?;
        Ok(license)
    }

    /// Looks up the license record for a (key hash, machine) pair.
    pub fn find_active_license_for_machine(
        &self,
        key_hash: &str,
        machine_id: &MachineId,
    ) -> LedgerResult<Option<ActiveLicense>> {
        let conn = self.conn.lock().unwrap();
        let license = conn
            .query_row(
                &format!(
                    "SELECT {LICENSE_COLUMNS} FROM active_licenses \
                     WHERE key_hash = ?1 AND machine_id = ?2"
                ),
                params![key_hash, machine_id.as_str()],
                read_active_license,
            )
            .optional()?;
        Ok(license)
    }

    /// Bumps the validation counter and last-validated timestamp.
    pub fn touch_validation(&self, key_hash: &str) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE active_licenses SET
                validation_count = validation_count + 1,
                last_validated_at = ?1
             WHERE key_hash = ?2",
            params![Utc::now().to_rfc3339(), key_hash],
        )?;
        if updated == 0 {
            return Err(LedgerError::NotFound(format!("active license {key_hash}")));
        }
        Ok(())
    }

    /// Retires a license binding (active flag to false).
    pub fn deactivate(&self, key_hash: &str) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE active_licenses SET active = 0 WHERE key_hash = ?1",
            params![key_hash],
        )?;
        if updated == 0 {
            return Err(LedgerError::NotFound(format!("active license {key_hash}")));
        }
        Ok(())
    }

    // ── Migration requests ───────────────────────────────────────

    /// Persists a new migration request.
    pub fn create_migration_request(&self, request: &MigrationRequest) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO license_migrations ({MIGRATION_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                request.id.to_string(),
                request.old_key,
                request.old_machine_id.as_str(),
                request.new_machine_id.as_str(),
                request.email,
                request.company,
                request.reason,
                request.status.to_string(),
                request.requested_at.to_rfc3339(),
                request.processed_at.map(|t| t.to_rfc3339()),
                request.processed_by,
                request.new_key,
                request.new_application_id.map(|id| id.to_string()),
                request.notes,
            ],
        )?;
        Ok(())
    }

    /// Looks up one migration request by id.
    pub fn migration_request(&self, id: MigrationId) -> LedgerResult<Option<MigrationRequest>> {
        let conn = self.conn.lock().unwrap();
        let request = conn
            .query_row(
                &format!("SELECT {MIGRATION_COLUMNS} FROM license_migrations WHERE id = ?1"),
                params![id.to_string()],
                read_migration_request,
            )
            .optional()?;
        Ok(request)
    }

    /// Returns migration requests, newest first, optionally filtered.
    pub fn migration_requests(
        &self,
        filter: Option<MigrationStatus>,
    ) -> LedgerResult<Vec<MigrationRequest>> {
        let conn = self.conn.lock().unwrap();
        let mut out = Vec::new();
        match filter {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {MIGRATION_COLUMNS} FROM license_migrations \
                     WHERE status = ?1 ORDER BY requested_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map(params![status.to_string()], read_migration_request)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {MIGRATION_COLUMNS} FROM license_migrations \
                     ORDER BY requested_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map([], read_migration_request)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    /// Records an administrator decision on a migration request.
    pub fn update_migration_review(
        &self,
        id: MigrationId,
        status: MigrationStatus,
        admin: &str,
        notes: Option<&str>,
        new_key: Option<&str>,
        new_application_id: Option<ApplicationId>,
    ) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = update_migration_row(&conn, id, status, admin, notes, new_key, new_application_id)?;
        if updated == 0 {
            return Err(LedgerError::NotFound(format!("migration request {id}")));
        }
        Ok(())
    }

    // ── Composite transactional operations ───────────────────────

    /// Creates a trial application and its active license in one
    /// transaction: either both land or neither does.
    pub fn create_trial_entitlement(
        &self,
        app: &LicenseApplication,
        license: &ActiveLicense,
    ) -> LedgerResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        insert_application(&tx, app)?;
        insert_active_license(&tx, license)?;
        tx.commit()?;
        Ok(())
    }

    /// Commits an approved migration atomically: inserts the new
    /// application and active license, retires the old license, marks the
    /// old application migrated with a back-reference, and records the
    /// decision on the request. Any failure rolls the whole transition
    /// back, preserving the one-active-binding-per-key invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_migration(
        &self,
        migration_id: MigrationId,
        new_app: &LicenseApplication,
        new_license: &ActiveLicense,
        old_key_hash: &str,
        old_application_id: ApplicationId,
        reason: &str,
        admin: &str,
        notes: Option<&str>,
    ) -> LedgerResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        insert_application(&tx, new_app)?;
        insert_active_license(&tx, new_license)?;

        let retired = tx.execute(
            "UPDATE active_licenses SET active = 0 WHERE key_hash = ?1 AND active = 1",
            params![old_key_hash],
        )?;
        if retired == 0 {
            return Err(LedgerError::NotFound(format!(
                "active license {old_key_hash}"
            )));
        }

        let marked = tx.execute(
            "UPDATE license_applications SET
                is_migrated = 1, migrated_to = ?1, migration_reason = ?2
             WHERE id = ?3",
            params![new_app.id.to_string(), reason, old_application_id.to_string()],
        )?;
        if marked == 0 {
            return Err(LedgerError::NotFound(format!(
                "application {old_application_id}"
            )));
        }

        let decided = update_migration_row(
            &tx,
            migration_id,
            MigrationStatus::Approved,
            admin,
            notes,
            Some(&new_license.key),
            Some(new_app.id),
        )?;
        if decided == 0 {
            return Err(LedgerError::NotFound(format!(
                "migration request {migration_id}"
            )));
        }

        tx.commit()?;
        Ok(())
    }
}

// ── Row conversion ───────────────────────────────────────────────

fn insert_application(conn: &Connection, app: &LicenseApplication) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO license_applications (
            id, machine_id, name, company, email, tier, status, payment_status, origin,
            created_at, processed_at, processed_by, license_key, key_hash, notes,
            is_migrated, migrated_to, migration_reason
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            app.id.to_string(),
            app.machine_id.as_str(),
            app.name,
            app.company,
            app.email,
            app.tier.to_string(),
            app.status.to_string(),
            app.payment.to_string(),
            app.origin.to_string(),
            app.created_at.to_rfc3339(),
            app.processed_at.map(|t| t.to_rfc3339()),
            app.processed_by,
            app.license_key,
            app.key_hash,
            app.notes,
            app.is_migrated(),
            app.migrated_to.map(|id| id.to_string()),
            app.migration_reason,
        ],
    )?;
    Ok(())
}

fn insert_active_license(conn: &Connection, license: &ActiveLicense) -> LedgerResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO active_licenses ({LICENSE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            license.key_hash,
            license.key,
            license.machine_id.as_str(),
            license.email,
            license.company,
            license.tier.to_string(),
            license.activated_at.to_rfc3339(),
            license.last_validated_at.to_rfc3339(),
            license.validations,
            license.active,
            license.application_id.to_string(),
        ],
    )?;
    Ok(())
}

fn update_migration_row(
    conn: &Connection,
    id: MigrationId,
    status: MigrationStatus,
    admin: &str,
    notes: Option<&str>,
    new_key: Option<&str>,
    new_application_id: Option<ApplicationId>,
) -> LedgerResult<usize> {
    let updated = conn.execute(
        "UPDATE license_migrations SET
            status = ?1, processed_at = ?2, processed_by = ?3,
            notes = COALESCE(?4, notes),
            new_key = COALESCE(?5, new_key),
            new_application_id = COALESCE(?6, new_application_id)
         WHERE id = ?7",
        params![
            status.to_string(),
            Utc::now().to_rfc3339(),
            admin,
            notes,
            new_key,
            new_application_id.map(|a| a.to_string()),
            id.to_string(),
        ],
    )?;
    Ok(updated)
}

fn read_application(row: &Row<'_>) -> rusqlite::Result<LicenseApplication> {
    Ok(LicenseApplication {
        id: parse_text(0, &row.get::<_, String>(0)?)?,
        machine_id: MachineId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        company: row.get(3)?,
        email: row.get(4)?,
        tier: parse_text(5, &row.get::<_, String>(5)?)?,
        status: parse_text(6, &row.get::<_, String>(6)?)?,
        payment: parse_text(7, &row.get::<_, String>(7)?)?,
        origin: parse_text(8, &row.get::<_, String>(8)?)?,
        created_at: parse_text(9, &row.get::<_, String>(9)?)?,
        processed_at: parse_opt(10, row.get::<_, Option<String>>(10)?)?,
        processed_by: row.get(11)?,
        license_key: row.get(12)?,
        key_hash: row.get(13)?,
        notes: row.get(14)?,
        migrated_to: parse_opt(15, row.get::<_, Option<String>>(15)?)?,
        migration_reason: row.get(16)?,
    })
}

fn read_active_license(row: &Row<'_>) -> rusqlite::Result<ActiveLicense> {
    Ok(ActiveLicense {
        key_hash: row.get(0)?,
        key: row.get(1)?,
        machine_id: MachineId::new(row.get::<_, String>(2)?),
        email: row.get(3)?,
        company: row.get(4)?,
        tier: parse_text(5, &row.get::<_, String>(5)?)?,
        activated_at: parse_text(6, &row.get::<_, String>(6)?)?,
        last_validated_at: parse_text(7, &row.get::<_, String>(7)?)?,
        validations: row.get(8)?,
        active: row.get(9)?,
        application_id: parse_text(10, &row.get::<_, String>(10)?)?,
    })
}

fn read_migration_request(row: &Row<'_>) -> rusqlite::Result<MigrationRequest> {
    Ok(MigrationRequest {
        id: parse_text(0, &row.get::<_, String>(0)?)?,
        old_key: row.get(1)?,
        old_machine_id: MachineId::new(row.get::<_, String>(2)?),
        new_machine_id: MachineId::new(row.get::<_, String>(3)?),
        email: row.get(4)?,
        company: row.get(5)?,
        reason: row.get(6)?,
        status: parse_text(7, &row.get::<_, String>(7)?)?,
        requested_at: parse_text(8, &row.get::<_, String>(8)?)?,
        processed_at: parse_opt(9, row.get::<_, Option<String>>(9)?)?,
        processed_by: row.get(10)?,
        new_key: row.get(11)?,
        new_application_id: parse_opt(12, row.get::<_, Option<String>>(12)?)?,
        notes: row.get(13)?,
    })
}

/// Strict text-column parse; a value the domain types reject is surfaced as
/// a conversion failure, never defaulted.
fn parse_text<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt<T>(idx: usize, value: Option<String>) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.map(|s| parse_text(idx, &s)).transpose()
}
