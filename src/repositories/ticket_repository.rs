use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{NewTicket, Ticket, TicketChanges};
use crate::repositories::db_error;
use crate::utils::errors::{not_found_error, spot_unavailable_error, AppResult};

const TICKET_COLUMNS: &str =
    "id, license_plate, parking_spot_id, service_id, issued_time, expired_time, amount, used, created_at";

/// Almacén de tickets
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Ticket>>;

    async fn list(&self) -> AppResult<Vec<Ticket>>;

    /// Inserta el ticket. Si referencia una plaza, la pasa de `Available` a
    /// `Occupied` en la misma operación atómica; si la plaza no existe o no
    /// está disponible devuelve `Conflict` y no escribe nada.
    async fn create(&self, ticket: NewTicket) -> AppResult<Ticket>;

    /// `NotFound` si el ticket no existe. Si cambian matrícula u horas, la
    /// plaza que sigue ocupada por el ticket se actualiza en la misma operación.
    async fn update(&self, id: i64, changes: TicketChanges) -> AppResult<Ticket>;

    /// Suma `delta` a `expired_time` de un ticket no usado; la plaza ocupada
    /// por el ticket sigue la nueva hora de fin. `None` si no existe o está usado.
    async fn extend(&self, id: i64, delta: chrono::Duration) -> AppResult<Option<Ticket>>;

    /// Reinicia la ventana y reactiva el ticket. `None` si no existe.
    async fn renew(
        &self,
        id: i64,
        issued_time: DateTime<Utc>,
        expired_time: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>>;

    async fn delete(&self, id: i64) -> AppResult<()>;
}

pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Copiar matrícula y ventana del ticket a su plaza si sigue ocupada por `occupant_plate`
    async fn sync_spot_window(
        tx: &mut Transaction<'_, Postgres>,
        ticket: &Ticket,
        occupant_plate: &str,
    ) -> AppResult<()> {
        let Some(spot_id) = ticket.parking_spot_id else {
            return Ok(());
        };

        sqlx::query(
            r#"
            UPDATE parking_spots
            SET license_plate = $2, start_time = $3, end_time = $4
            WHERE id = $1 AND status = 'Occupied' AND license_plate = $5
            "#,
        )
        .bind(spot_id)
        .bind(&ticket.license_plate)
        .bind(ticket.issued_time)
        .bind(ticket.expired_time)
        .bind(occupant_plate)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error(e, format_args!("syncing parking spot {} with ticket {}", spot_id, ticket.id)))?;

        Ok(())
    }

    /// UPDATE parcial con COALESCE; `None` si el ticket no existe
    async fn apply_changes<'e, E>(executor: E, id: i64, changes: TicketChanges) -> AppResult<Option<Ticket>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET license_plate = COALESCE($2, license_plate),
                service_id = COALESCE($3, service_id),
                issued_time = COALESCE($4, issued_time),
                expired_time = COALESCE($5, expired_time),
                amount = COALESCE($6, amount),
                used = COALESCE($7, used)
            WHERE id = $1
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(id)
        .bind(changes.license_plate)
        .bind(changes.service_id)
        .bind(changes.issued_time)
        .bind(changes.expired_time)
        .bind(changes.amount)
        .bind(changes.used)
        .fetch_optional(executor)
        .await
        .map_err(|e| db_error(e, format_args!("updating ticket {}", id)))
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error(e, format_args!("starting transaction")))
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Ticket>> {
        sqlx::query_as::<_, Ticket>(&format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(e, format_args!("finding ticket {}", id)))
    }

    async fn list(&self) -> AppResult<Vec<Ticket>> {
        sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets ORDER BY issued_time DESC, id DESC",
            TICKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("listing tickets")))
    }

    async fn create(&self, ticket: NewTicket) -> AppResult<Ticket> {
        let mut tx = self.begin().await?;

        if let Some(spot_id) = ticket.parking_spot_id {
            // Compare-and-swap: dos peticiones concurrentes no pueden ocupar la misma plaza
            let claimed = sqlx::query(
                r#"
                UPDATE parking_spots
                SET status = 'Occupied', license_plate = $2, start_time = $3, end_time = $4
                WHERE id = $1 AND status = 'Available'
                "#,
            )
            .bind(spot_id)
            .bind(&ticket.license_plate)
            .bind(ticket.issued_time)
            .bind(ticket.expired_time)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e, format_args!("claiming parking spot {}", spot_id)))?;

            if claimed.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| db_error(e, format_args!("rolling back claim of spot {}", spot_id)))?;
                return Err(spot_unavailable_error(spot_id));
            }
        }

        let created = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (license_plate, parking_spot_id, service_id, issued_time, expired_time, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(&ticket.license_plate)
        .bind(ticket.parking_spot_id)
        .bind(ticket.service_id)
        .bind(ticket.issued_time)
        .bind(ticket.expired_time)
        .bind(ticket.amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error(e, format_args!("inserting ticket for {}", ticket.license_plate)))?;

        tx.commit()
            .await
            .map_err(|e| db_error(e, format_args!("committing ticket {}", created.id)))?;

        Ok(created)
    }

    async fn update(&self, id: i64, changes: TicketChanges) -> AppResult<Ticket> {
        if !changes.touches_window() {
            return Self::apply_changes(&self.pool, id, changes)
                .await?
                .ok_or_else(|| not_found_error("ticket", id));
        }

        let mut tx = self.begin().await?;

        let previous: Option<(String,)> =
            sqlx::query_as("SELECT license_plate FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error(e, format_args!("locking ticket {}", id)))?;
        let Some((previous_plate,)) = previous else {
            return Err(not_found_error("ticket", id));
        };

        let updated = Self::apply_changes(&mut *tx, id, changes)
            .await?
            .ok_or_else(|| not_found_error("ticket", id))?;
        Self::sync_spot_window(&mut tx, &updated, &previous_plate).await?;

        tx.commit()
            .await
            .map_err(|e| db_error(e, format_args!("committing update of ticket {}", id)))?;

        Ok(updated)
    }

    async fn extend(&self, id: i64, delta: chrono::Duration) -> AppResult<Option<Ticket>> {
        let mut tx = self.begin().await?;

        let extended = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET expired_time = expired_time + ($2::double precision * INTERVAL '1 second')
            WHERE id = $1 AND used = FALSE
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(id)
        .bind(delta.num_seconds() as f64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error(e, format_args!("extending ticket {}", id)))?;

        if let Some(ticket) = &extended {
            Self::sync_spot_window(&mut tx, ticket, &ticket.license_plate).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error(e, format_args!("committing extension of ticket {}", id)))?;

        Ok(extended)
    }

    async fn renew(
        &self,
        id: i64,
        issued_time: DateTime<Utc>,
        expired_time: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>> {
        let mut tx = self.begin().await?;

        let renewed = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET issued_time = $2, expired_time = $3, used = FALSE
            WHERE id = $1
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(id)
        .bind(issued_time)
        .bind(expired_time)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error(e, format_args!("renewing ticket {}", id)))?;

        if let Some(ticket) = &renewed {
            Self::sync_spot_window(&mut tx, ticket, &ticket.license_plate).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error(e, format_args!("committing renewal of ticket {}", id)))?;

        Ok(renewed)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, format_args!("deleting ticket {}", id)))?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("ticket", id));
        }

        Ok(())
    }
}
