// services/src/storage_engine/postgres_store.rs
// NOTE: Assumes a `users` table, a `medical_records` table and an
// `uploaded_files` table as created by `ensure_schema`.
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use tokio::sync::Mutex;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

use models::errors::{ApiError, ApiResult};
use models::medical::medical_record::{MedicalRecord, MedicalRecordUpdate, NewMedicalRecord};
use models::medical::uploaded_file::{FileType, NewUploadedFile, UploadedFile};
use models::medical::user::{NewUser, Role, User};

use crate::storage_engine::record_store::{FileFilter, RecordStore};

#[derive(Debug)]
pub struct PostgresStore {
    client: Arc<Mutex<Client>>,
}

fn db_err(e: tokio_postgres::Error) -> ApiError {
    if let Some(db) = e.as_db_error() {
        if db.code() == &SqlState::UNIQUE_VIOLATION {
            return ApiError::conflict("Value is already registered");
        }
    }
    ApiError::storage(e.to_string())
}

fn row_to_user(row: &Row) -> ApiResult<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone: row.get("phone"),
        address: row.get("address"),
        role: Role::from_str(&role)
            .map_err(|_| ApiError::storage(format!("Corrupt role value: {}", role)))?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_record(row: &Row) -> MedicalRecord {
    MedicalRecord {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        doctor_id: row.get("doctor_id"),
        title: row.get("title"),
        description: row.get("description"),
        diagnosis: row.get("diagnosis"),
        treatment: row.get("treatment"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_file(row: &Row) -> ApiResult<UploadedFile> {
    let file_type: String = row.get("file_type");
    Ok(UploadedFile {
        id: row.get("id"),
        filename: row.get("filename"),
        original_filename: row.get("original_filename"),
        file_size: row.get("file_size"),
        mime_type: row.get("mime_type"),
        description: row.get("description"),
        file_type: FileType::from_str(&file_type)
            .map_err(|_| ApiError::storage(format!("Corrupt file_type value: {}", file_type)))?,
        user_id: row.get("user_id"),
        patient_id: row.get("patient_id"),
        medical_record_id: row.get("medical_record_id"),
        created_at: row.get("created_at"),
    })
}

const FILE_COLUMNS: &str = "id, filename, original_filename, file_size, mime_type, \
     description, file_type, user_id, patient_id, medical_record_id, created_at";

impl PostgresStore {
    pub async fn connect(connection_string: &str) -> ApiResult<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| ApiError::storage(format!("Failed to connect to Postgres: {}", e)))?;

        // the connection object drives the socket; it must be polled
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("Postgres connection error: {}", e);
            }
        });

        Ok(PostgresStore {
            client: Arc::new(Mutex::new(client)),
        })
    }

    /// Creates the tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let client = self.client.lock().await;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS users (
                    id BIGSERIAL PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    phone TEXT,
                    address TEXT,
                    role TEXT NOT NULL,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ
                );
                CREATE TABLE IF NOT EXISTS medical_records (
                    id BIGSERIAL PRIMARY KEY,
                    patient_id BIGINT NOT NULL REFERENCES users(id),
                    doctor_id BIGINT NOT NULL REFERENCES users(id),
                    title TEXT NOT NULL,
                    description TEXT,
                    diagnosis TEXT,
                    treatment TEXT,
                    notes TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ
                );
                CREATE TABLE IF NOT EXISTS uploaded_files (
                    id BIGSERIAL PRIMARY KEY,
                    filename TEXT NOT NULL,
                    original_filename TEXT NOT NULL,
                    file_size BIGINT NOT NULL,
                    mime_type TEXT NOT NULL,
                    description TEXT,
                    file_type TEXT NOT NULL,
                    user_id BIGINT NOT NULL REFERENCES users(id),
                    patient_id BIGINT NOT NULL REFERENCES users(id),
                    medical_record_id BIGINT REFERENCES medical_records(id) ON DELETE SET NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                );",
            )
            .await
            .map_err(db_err)?;
        info!("Database schema is in place");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn create_user(&self, new: NewUser) -> ApiResult<User> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO users \
                     (username, email, password_hash, first_name, last_name, phone, address, role) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING *",
                &[
                    &new.username,
                    &new.email,
                    &new.password_hash,
                    &new.first_name,
                    &new.last_name,
                    &new.phone,
                    &new.address,
                    &new.role.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;
        row_to_user(&row)
    }

    async fn user_by_id(&self, id: i64) -> ApiResult<Option<User>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("SELECT * FROM users WHERE id = $1", &[&id])
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("SELECT * FROM users WHERE username = $1", &[&username])
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("SELECT * FROM users WHERE email = $1", &[&email])
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_users_by_role(
        &self,
        role: Role,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<User>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT * FROM users WHERE role = $1 ORDER BY id OFFSET $2 LIMIT $3",
                &[&role.as_str(), &skip, &limit],
            )
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_user).collect()
    }

    async fn set_user_active(&self, id: i64, active: bool) -> ApiResult<Option<User>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING *",
                &[&id, &active],
            )
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn create_record(&self, new: NewMedicalRecord) -> ApiResult<MedicalRecord> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO medical_records \
                     (patient_id, doctor_id, title, description, diagnosis, treatment, notes) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING *",
                &[
                    &new.patient_id,
                    &new.doctor_id,
                    &new.title,
                    &new.description,
                    &new.diagnosis,
                    &new.treatment,
                    &new.notes,
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(row_to_record(&row))
    }

    async fn record_by_id(&self, id: i64) -> ApiResult<Option<MedicalRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("SELECT * FROM medical_records WHERE id = $1", &[&id])
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn list_records(
        &self,
        patient_id: Option<i64>,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<MedicalRecord>> {
        let client = self.client.lock().await;
        let rows = match patient_id {
            Some(pid) => {
                client
                    .query(
                        "SELECT * FROM medical_records WHERE patient_id = $1 \
                         ORDER BY id OFFSET $2 LIMIT $3",
                        &[&pid, &skip, &limit],
                    )
                    .await
            }
            None => {
                client
                    .query(
                        "SELECT * FROM medical_records ORDER BY id OFFSET $1 LIMIT $2",
                        &[&skip, &limit],
                    )
                    .await
            }
        }
        .map_err(db_err)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn update_record(
        &self,
        id: i64,
        changes: MedicalRecordUpdate,
    ) -> ApiResult<Option<MedicalRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "UPDATE medical_records SET \
                     title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     diagnosis = COALESCE($4, diagnosis), \
                     treatment = COALESCE($5, treatment), \
                     notes = COALESCE($6, notes), \
                     updated_at = now() \
                 WHERE id = $1 RETURNING *",
                &[
                    &id,
                    &changes.title,
                    &changes.description,
                    &changes.diagnosis,
                    &changes.treatment,
                    &changes.notes,
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn delete_record(&self, id: i64) -> ApiResult<bool> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await.map_err(db_err)?;
        // weak association: detach files, never delete them
        tx.execute(
            "UPDATE uploaded_files SET medical_record_id = NULL WHERE medical_record_id = $1",
            &[&id],
        )
        .await
        .map_err(db_err)?;
        let deleted = tx
            .execute("DELETE FROM medical_records WHERE id = $1", &[&id])
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(deleted > 0)
    }

    async fn file_by_id(&self, id: i64) -> ApiResult<Option<UploadedFile>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM uploaded_files WHERE id = $1", FILE_COLUMNS),
                &[&id],
            )
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_file).transpose()
    }

    async fn list_files(&self, filter: &FileFilter) -> ApiResult<Vec<UploadedFile>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        let file_type = filter.file_type.map(|ft| ft.as_str().to_string());
        if let Some(pid) = &filter.patient_id {
            params.push(pid);
            clauses.push(format!("patient_id = ${}", params.len()));
        }
        if let Some(rid) = &filter.medical_record_id {
            params.push(rid);
            clauses.push(format!("medical_record_id = ${}", params.len()));
        }
        if let Some(ft) = &file_type {
            params.push(ft);
            clauses.push(format!("file_type = ${}", params.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", clauses.join(" AND "))
        };
        params.push(&filter.skip);
        let skip_idx = params.len();
        params.push(&filter.limit);
        let limit_idx = params.len();

        let sql = format!(
            "SELECT {} FROM uploaded_files {}ORDER BY id OFFSET ${} LIMIT ${}",
            FILE_COLUMNS, where_sql, skip_idx, limit_idx
        );

        let client = self.client.lock().await;
        let rows = client.query(&sql, &params).await.map_err(db_err)?;
        rows.iter().map(row_to_file).collect()
    }

    async fn create_files_batch(
        &self,
        rows: Vec<NewUploadedFile>,
        reassociate: Vec<(i64, i64)>,
    ) -> ApiResult<Vec<UploadedFile>> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await.map_err(db_err)?;

        for record_id in rows
            .iter()
            .filter_map(|r| r.medical_record_id)
            .chain(reassociate.iter().map(|(_, rid)| *rid))
        {
            let exists = tx
                .query_opt("SELECT 1 FROM medical_records WHERE id = $1", &[&record_id])
                .await
                .map_err(db_err)?;
            if exists.is_none() {
                return Err(ApiError::not_found(format!(
                    "Medical record {} not found",
                    record_id
                )));
            }
        }

        let mut result = Vec::with_capacity(rows.len() + reassociate.len());
        for new in &rows {
            let row = tx
                .query_one(
                    &format!(
                        "INSERT INTO uploaded_files \
                             (filename, original_filename, file_size, mime_type, description, \
                              file_type, user_id, patient_id, medical_record_id) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                         RETURNING {}",
                        FILE_COLUMNS
                    ),
                    &[
                        &new.filename,
                        &new.original_filename,
                        &new.file_size,
                        &new.mime_type,
                        &new.description,
                        &new.file_type.as_str(),
                        &new.user_id,
                        &new.patient_id,
                        &new.medical_record_id,
                    ],
                )
                .await
                .map_err(db_err)?;
            result.push(row_to_file(&row)?);
        }

        for (file_id, record_id) in &reassociate {
            let row = tx
                .query_opt(
                    &format!(
                        "UPDATE uploaded_files SET medical_record_id = $2 \
                         WHERE id = $1 AND file_type = 'photo' RETURNING {}",
                        FILE_COLUMNS
                    ),
                    &[file_id, record_id],
                )
                .await
                .map_err(db_err)?
                .ok_or_else(|| ApiError::not_found(format!("Photo {} not found", file_id)))?;
            result.push(row_to_file(&row)?);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(result)
    }

    async fn delete_file(&self, id: i64) -> ApiResult<bool> {
        let client = self.client.lock().await;
        let deleted = client
            .execute("DELETE FROM uploaded_files WHERE id = $1", &[&id])
            .await
            .map_err(db_err)?;
        Ok(deleted > 0)
    }

    async fn patients_with_files(&self) -> ApiResult<Vec<User>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT DISTINCT u.* FROM users u \
                 JOIN uploaded_files f ON f.patient_id = u.id \
                 ORDER BY u.id",
                &[],
            )
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_user).collect()
    }
}
