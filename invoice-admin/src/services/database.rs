//! Database service for invoice-admin.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use service_core::error::AppError;
use service_core::retry::{retry_on_conflict, RetryConfig};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Client, ClientInput, Company, CompanyInput, Invoice, InvoiceItem, NewInvoice, Settings,
    UpdateSettings, DEFAULT_SETTINGS_NAME, DEFAULT_SETTINGS_TAGLINE,
};
use crate::services::analytics::{
    AnalyticsInvoice, AnalyticsItem, AnalyticsSnapshot, ClientSnapshot, CompanySnapshot,
};
use crate::services::metrics::{DB_QUERY_DURATION, INVOICE_NUMBER_CONFLICTS_TOTAL};
use crate::services::numbering::{next_invoice_number, year_prefix};
use crate::services::totals::{ComputedInvoice, ComputedItem};

/// Key of the single settings row.
const SETTINGS_ID: Uuid = Uuid::from_u128(1);

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(FromRow)]
struct AnalyticsInvoiceRow {
    invoice_id: Uuid,
    invoice_number: String,
    status: String,
    date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    total: Option<String>,
    balance_due: Option<String>,
    client_id: Uuid,
    client_name: Option<String>,
    client_email: Option<String>,
    client_phone: Option<String>,
    company_id: Option<Uuid>,
    company_name: Option<String>,
}

#[derive(FromRow)]
struct AnalyticsItemRow {
    invoice_id: Uuid,
    quantity: Option<String>,
    cost_price: Option<String>,
    line_total: Option<String>,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-admin"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool, connected or lazy.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Company Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_company(&self, input: &CompanyInput) -> Result<Company, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (company_id, name, address, phone, logo_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING company_id, name, address, phone, logo_path, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.logo_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create company: {}", e)))?;

        timer.observe_duration();

        info!(company_id = %company.company_id, "Company created");

        Ok(company)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT company_id, name, address, phone, logo_path, created_utc, updated_utc
            FROM companies
            WHERE company_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    #[instrument(skip(self))]
    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_companies"])
            .start_timer();

        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT company_id, name, address, phone, logo_path, created_utc, updated_utc
            FROM companies
            WHERE deleted_utc IS NULL
            ORDER BY name, company_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list companies: {}", e)))?;

        timer.observe_duration();

        Ok(companies)
    }

    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn update_company(
        &self,
        company_id: Uuid,
        input: &CompanyInput,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = $2, address = $3, phone = $4,
                logo_path = COALESCE($5, logo_path),
                updated_utc = NOW()
            WHERE company_id = $1 AND deleted_utc IS NULL
            RETURNING company_id, name, address, phone, logo_path, created_utc, updated_utc
            "#,
        )
        .bind(company_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.logo_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    /// Soft delete a company. Returns false when nothing was live to delete.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn delete_company(&self, company_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_company"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE companies SET deleted_utc = NOW() WHERE company_id = $1 AND deleted_utc IS NULL",
        )
        .bind(company_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete company: {}", e)))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(company_id = %company_id, "Company deleted");
        }
        Ok(deleted)
    }

    /// Ids from `company_ids` that do not name a live company.
    #[instrument(skip(self, company_ids), fields(count = company_ids.len()))]
    pub async fn missing_company_ids(&self, company_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if company_ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT company_id FROM companies WHERE company_id = ANY($1) AND deleted_utc IS NULL",
        )
        .bind(company_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check companies: {}", e)))?;

        Ok(company_ids
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect())
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(name = %input.name, companies = input.company_ids.len()))]
    pub async fn create_client(&self, input: &ClientInput) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (client_id, name, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING client_id, name, email, phone, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)))?;

        Self::link_companies(&mut *tx, client.client_id, &input.company_ids).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, name, email, phone, created_utc, updated_utc
            FROM clients
            WHERE client_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, name, email, phone, created_utc, updated_utc
            FROM clients
            WHERE deleted_utc IS NULL
            ORDER BY name, client_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Replace a client's fields and its whole company link set.
    #[instrument(skip(self, input), fields(client_id = %client_id))]
    pub async fn update_client(
        &self,
        client_id: Uuid,
        input: &ClientInput,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = $2, email = $3, phone = $4, updated_utc = NOW()
            WHERE client_id = $1 AND deleted_utc IS NULL
            RETURNING client_id, name, email, phone, created_utc, updated_utc
            "#,
        )
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        let Some(client) = client else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        sqlx::query("DELETE FROM client_company WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to unlink companies: {}", e))
            })?;

        Self::link_companies(&mut *tx, client_id, &input.company_ids).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(client_id = %client_id, "Client updated");

        Ok(Some(client))
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn delete_client(&self, client_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE clients SET deleted_utc = NOW() WHERE client_id = $1 AND deleted_utc IS NULL",
        )
        .bind(client_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete client: {}", e)))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(client_id = %client_id, "Client deleted");
        }
        Ok(deleted)
    }

    /// Live companies linked to a client, by name.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn get_client_companies(&self, client_id: Uuid) -> Result<Vec<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client_companies"])
            .start_timer();

        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT c.company_id, c.name, c.address, c.phone, c.logo_path, c.created_utc, c.updated_utc
            FROM companies c
            JOIN client_company cc ON cc.company_id = c.company_id
            WHERE cc.client_id = $1 AND c.deleted_utc IS NULL
            ORDER BY c.name, c.company_id
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get client companies: {}", e))
        })?;

        timer.observe_duration();

        Ok(companies)
    }

    async fn link_companies(
        conn: &mut PgConnection,
        client_id: Uuid,
        company_ids: &[Uuid],
    ) -> Result<(), AppError> {
        for company_id in company_ids {
            sqlx::query(
                r#"
                INSERT INTO client_company (client_id, company_id)
                VALUES ($1, $2)
                ON CONFLICT (client_id, company_id) DO NOTHING
                "#,
            )
            .bind(client_id)
            .bind(company_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to link company: {}", e)))?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Create an invoice with a freshly generated number.
    ///
    /// Each attempt scans, numbers and inserts inside its own transaction.
    /// A collision on the unique number rolls the attempt back and the
    /// whole attempt is rerun against the updated data.
    #[instrument(skip(self, input, computed, retry), fields(client_id = %input.client_id, year = year))]
    pub async fn create_invoice(
        &self,
        input: &NewInvoice,
        computed: &ComputedInvoice,
        year: i32,
        retry: &RetryConfig,
    ) -> Result<(Invoice, Vec<InvoiceItem>), AppError> {
        retry_on_conflict(retry, "create_invoice", || {
            self.try_create_invoice(input, computed, year)
        })
        .await
    }

    /// One numbering attempt. A lost race surfaces as `AppError::Conflict`.
    #[instrument(skip(self, input, computed), fields(year = year))]
    pub async fn try_create_invoice(
        &self,
        input: &NewInvoice,
        computed: &ComputedInvoice,
        year: i32,
    ) -> Result<(Invoice, Vec<InvoiceItem>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Soft-deleted rows still hold their numbers under the unique
        // constraint, so they take part in the scan.
        let existing = sqlx::query_scalar::<_, String>(
            "SELECT invoice_number FROM invoices WHERE invoice_number LIKE $1",
        )
        .bind(format!("{}%", year_prefix(year)))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to scan invoice numbers: {}", e))
        })?;

        let invoice_number = next_invoice_number(year, existing.iter().map(String::as_str));

        let result = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                invoice_id, company_id, client_id, invoice_number, date, due_date,
                payment_terms, status, subtotal, tax_amount, total, balance_due, note, attachments
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING invoice_id, company_id, client_id, invoice_number, date, due_date,
                payment_terms, status, subtotal, tax_amount, total, balance_due, note, attachments,
                created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(input.client_id)
        .bind(&invoice_number)
        .bind(input.date)
        .bind(input.due_date)
        .bind(input.payment_terms.as_str())
        .bind(input.status.as_str())
        .bind(computed.totals.subtotal)
        .bind(computed.totals.tax_amount)
        .bind(computed.totals.total)
        .bind(input.balance_due)
        .bind(&input.note)
        .bind(Json(input.attachments.clone()))
        .fetch_one(&mut *tx)
        .await;

        let invoice = match result {
            Ok(invoice) => invoice,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                tx.rollback().await.ok();
                INVOICE_NUMBER_CONFLICTS_TOTAL.inc();
                warn!(invoice_number = %invoice_number, "Invoice number taken by a concurrent create");
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Invoice number {} already exists",
                    invoice_number
                )));
            }
            Err(e) => {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to create invoice: {}",
                    e
                )));
            }
        };

        let items = Self::insert_items(&mut *tx, invoice.invoice_id, &computed.items).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );

        Ok((invoice, items))
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, company_id, client_id, invoice_number, date, due_date,
                payment_terms, status, subtotal, tax_amount, total, balance_due, note, attachments,
                created_utc, updated_utc
            FROM invoices
            WHERE invoice_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Items of an invoice in their stored order.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT item_id, invoice_id, description, quantity, cost_price, unit_price,
                line_total, sort_order, created_utc
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY sort_order, item_id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }

    /// Every live invoice with its items, newest first.
    #[instrument(skip(self))]
    pub async fn list_invoices(&self) -> Result<Vec<(Invoice, Vec<InvoiceItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, company_id, client_id, invoice_number, date, due_date,
                payment_terms, status, subtotal, tax_amount, total, balance_due, note, attachments,
                created_utc, updated_utc
            FROM invoices
            WHERE deleted_utc IS NULL
            ORDER BY created_utc DESC, invoice_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        let ids: Vec<Uuid> = invoices.iter().map(|i| i.invoice_id).collect();
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT item_id, invoice_id, description, quantity, cost_price, unit_price,
                line_total, sort_order, created_utc
            FROM invoice_items
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, sort_order, item_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list items: {}", e)))?;

        timer.observe_duration();

        let mut by_invoice: HashMap<Uuid, Vec<InvoiceItem>> = HashMap::new();
        for item in items {
            by_invoice.entry(item.invoice_id).or_default().push(item);
        }

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let items = by_invoice.remove(&invoice.invoice_id).unwrap_or_default();
                (invoice, items)
            })
            .collect())
    }

    /// Replace an invoice's header fields and its whole item set.
    ///
    /// The number is kept. New attachment references are appended to the
    /// stored ones.
    #[instrument(skip(self, input, computed), fields(invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        input: &NewInvoice,
        computed: &ComputedInvoice,
    ) -> Result<Option<(Invoice, Vec<InvoiceItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET company_id = $2, client_id = $3, date = $4, due_date = $5,
                payment_terms = $6, status = $7, subtotal = $8, tax_amount = $9, total = $10,
                balance_due = $11, note = $12, attachments = attachments || $13,
                updated_utc = NOW()
            WHERE invoice_id = $1 AND deleted_utc IS NULL
            RETURNING invoice_id, company_id, client_id, invoice_number, date, due_date,
                payment_terms, status, subtotal, tax_amount, total, balance_due, note, attachments,
                created_utc, updated_utc
            "#,
        )
        .bind(invoice_id)
        .bind(input.company_id)
        .bind(input.client_id)
        .bind(input.date)
        .bind(input.due_date)
        .bind(input.payment_terms.as_str())
        .bind(input.status.as_str())
        .bind(computed.totals.subtotal)
        .bind(computed.totals.tax_amount)
        .bind(computed.totals.total)
        .bind(input.balance_due)
        .bind(&input.note)
        .bind(Json(input.attachments.clone()))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        let Some(invoice) = invoice else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete items: {}", e))
            })?;

        let items = Self::insert_items(&mut *tx, invoice_id, &computed.items).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice_id,
            item_count = items.len(),
            total = %invoice.total,
            "Invoice updated"
        );

        Ok(Some((invoice, items)))
    }

    /// Soft delete an invoice. Its number stays reserved.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE invoices SET deleted_utc = NOW() WHERE invoice_id = $1 AND deleted_utc IS NULL",
        )
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e)))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Invoice deleted");
        }
        Ok(deleted)
    }

    async fn insert_items(
        conn: &mut PgConnection,
        invoice_id: Uuid,
        items: &[ComputedItem],
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let mut inserted = Vec::with_capacity(items.len());

        for item in items {
            let row = sqlx::query_as::<_, InvoiceItem>(
                r#"
                INSERT INTO invoice_items (
                    item_id, invoice_id, description, quantity, cost_price, unit_price,
                    line_total, sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING item_id, invoice_id, description, quantity, cost_price, unit_price,
                    line_total, sort_order, created_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.cost_price)
            .bind(item.unit_price)
            .bind(item.line_total)
            .bind(item.sort_order)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert item: {}", e)))?;

            inserted.push(row);
        }

        Ok(inserted)
    }

    // -------------------------------------------------------------------------
    // Analytics
    // -------------------------------------------------------------------------

    /// Read every live invoice and item for the dashboard.
    ///
    /// Both reads share one repeatable-read snapshot. Numeric columns come
    /// back as text so the aggregator owns all numeric coercion.
    #[instrument(skip(self))]
    pub async fn load_analytics_snapshot(&self) -> Result<AnalyticsSnapshot, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_analytics_snapshot"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to set isolation: {}", e))
            })?;

        let total_clients =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE deleted_utc IS NULL")
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to count clients: {}", e))
                })?;

        let rows = sqlx::query_as::<_, AnalyticsInvoiceRow>(
            r#"
            SELECT i.invoice_id, i.invoice_number, i.status, i.date, i.due_date,
                i.total::text AS total, i.balance_due::text AS balance_due,
                i.client_id, c.name AS client_name, c.email AS client_email, c.phone AS client_phone,
                co.company_id AS company_id, co.name AS company_name
            FROM invoices i
            LEFT JOIN clients c ON c.client_id = i.client_id AND c.deleted_utc IS NULL
            LEFT JOIN companies co ON co.company_id = i.company_id AND co.deleted_utc IS NULL
            WHERE i.deleted_utc IS NULL
            ORDER BY i.created_utc, i.invoice_id
            "#,
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load analytics invoices: {}", e))
        })?;

        let item_rows = sqlx::query_as::<_, AnalyticsItemRow>(
            r#"
            SELECT it.invoice_id, it.quantity::text AS quantity,
                it.cost_price::text AS cost_price, it.line_total::text AS line_total
            FROM invoice_items it
            JOIN invoices i ON i.invoice_id = it.invoice_id
            WHERE i.deleted_utc IS NULL
            ORDER BY it.invoice_id, it.sort_order
            "#,
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load analytics items: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        let mut items: HashMap<Uuid, Vec<AnalyticsItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.invoice_id).or_default().push(AnalyticsItem {
                quantity: row.quantity,
                cost_price: row.cost_price,
                line_total: row.line_total,
            });
        }

        let invoices = rows
            .into_iter()
            .map(|row| AnalyticsInvoice {
                items: items.remove(&row.invoice_id).unwrap_or_default(),
                invoice_number: row.invoice_number,
                status: row.status,
                date: row.date,
                due_date: row.due_date,
                total: row.total,
                balance_due: row.balance_due,
                client: ClientSnapshot {
                    id: row.client_id,
                    name: row.client_name,
                    email: row.client_email,
                    phone: row.client_phone,
                },
                company: match (row.company_id, row.company_name) {
                    (Some(id), Some(name)) => Some(CompanySnapshot { id, name }),
                    _ => None,
                },
            })
            .collect();

        Ok(AnalyticsSnapshot {
            total_clients,
            invoices,
        })
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Fetch the settings row, creating the default one on first use.
    #[instrument(skip(self))]
    pub async fn get_or_create_settings(&self) -> Result<Settings, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_settings"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO settings (setting_id, name, logo_tagline)
            VALUES ($1, $2, $3)
            ON CONFLICT (setting_id) DO NOTHING
            "#,
        )
        .bind(SETTINGS_ID)
        .bind(DEFAULT_SETTINGS_NAME)
        .bind(DEFAULT_SETTINGS_TAGLINE)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to seed settings: {}", e)))?;

        let settings = sqlx::query_as::<_, Settings>(
            r#"
            SELECT setting_id, name, logo_path, logo_tagline, address, phone, email,
                privacy_and_policy, created_utc, updated_utc
            FROM settings
            WHERE setting_id = $1
            "#,
        )
        .bind(SETTINGS_ID)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get settings: {}", e)))?;

        timer.observe_duration();

        Ok(settings)
    }

    /// Update settings. Optional fields left as `None` keep their value.
    #[instrument(skip(self, input))]
    pub async fn update_settings(&self, input: &UpdateSettings) -> Result<Settings, AppError> {
        self.get_or_create_settings().await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_settings"])
            .start_timer();

        let settings = sqlx::query_as::<_, Settings>(
            r#"
            UPDATE settings
            SET name = $2,
                logo_tagline = COALESCE($3, logo_tagline),
                address = COALESCE($4, address),
                phone = COALESCE($5, phone),
                email = COALESCE($6, email),
                privacy_and_policy = COALESCE($7, privacy_and_policy),
                updated_utc = NOW()
            WHERE setting_id = $1
            RETURNING setting_id, name, logo_path, logo_tagline, address, phone, email,
                privacy_and_policy, created_utc, updated_utc
            "#,
        )
        .bind(SETTINGS_ID)
        .bind(&input.name)
        .bind(&input.logo_tagline)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.privacy_and_policy)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update settings: {}", e)))?;

        timer.observe_duration();

        info!("Settings updated");

        Ok(settings)
    }
}
