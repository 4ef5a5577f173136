//! Client, capital movement and split config operations for the repository.

use crate::domain::{
    CapitalMovement, Client, ClientId, MovementKind, SplitConfig, SplitConfigSet,
};
use crate::store::StoreError;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use tracing::info;

use super::{date_column, decimal_column, optional_date_column, Repository};

const GLOBAL_SCOPE: &str = "global";
const CLIENT_SCOPE_PREFIX: &str = "client:";

fn scope_of(client_id: Option<&ClientId>) -> String {
    match client_id {
        Some(id) => format!("{CLIENT_SCOPE_PREFIX}{id}"),
        None => GLOBAL_SCOPE.to_string(),
    }
}

impl Repository {
    /// Register a client, or replace the registration of an existing one.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_client_row(&self, client: &Client) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO clients (
                client_id, name, email, starting_capital, start_date, active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(client_id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                starting_capital = excluded.starting_capital,
                start_date = excluded.start_date,
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(client.client_id().as_str())
        .bind(client.name())
        .bind(client.email())
        .bind(client.starting_capital().to_canonical_string())
        .bind(client.start_date().map(|d| d.to_string()))
        .bind(client.is_active())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the query fails or the row does not decode.
    pub async fn query_client(&self, client_id: &ClientId) -> Result<Option<Client>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT client_id, name, email, starting_capital, start_date, active
            FROM clients
            WHERE client_id = ?
            "#,
        )
        .bind(client_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(client_from_row).transpose()
    }

    /// Record a movement. Returns false if its id was already recorded.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_movement_row(&self, movement: &CapitalMovement) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO capital_movements (
                movement_id, client_id, date, amount, kind, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(movement_id) DO NOTHING
            "#,
        )
        .bind(movement.movement_id())
        .bind(movement.client_id().as_str())
        .bind(movement.date().to_string())
        .bind(movement.amount().to_canonical_string())
        .bind(movement.kind().as_str())
        .bind(movement.notes())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_split_config(
        &self,
        client_id: Option<&ClientId>,
        config: &SplitConfig,
    ) -> Result<(), StoreError> {
        let scope = scope_of(client_id);
        sqlx::query(
            r#"
            INSERT INTO split_configs (scope, tax_rate, trader_share, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(scope) DO UPDATE SET
                tax_rate = excluded.tax_rate,
                trader_share = excluded.trader_share,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&scope)
        .bind(config.tax_rate().to_canonical_string())
        .bind(config.trader_share().to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        info!(
            %scope,
            tax_rate = %config.tax_rate(),
            trader_share = %config.trader_share(),
            "Split config saved"
        );
        Ok(())
    }

    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_global_split_config_if_absent(
        &self,
        config: &SplitConfig,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO split_configs (scope, tax_rate, trader_share, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(scope) DO NOTHING
            "#,
        )
        .bind(GLOBAL_SCOPE)
        .bind(config.tax_rate().to_canonical_string())
        .bind(config.trader_share().to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn client_from_row(row: &SqliteRow) -> Result<Client, StoreError> {
    let client_id: String = row.try_get("client_id")?;
    let client = Client::new(
        ClientId::new(client_id.clone()),
        row.try_get::<String, _>("name")?,
        row.try_get::<Option<String>, _>("email")?,
        decimal_column(row, "starting_capital")?,
        optional_date_column(row, "start_date")?,
    )
    .map_err(|e| StoreError::Corrupt(format!("client {client_id}: {e}")))?;
    Ok(client.with_active(row.try_get("active")?))
}

pub(super) async fn fetch_clients(conn: &mut SqliteConnection) -> Result<Vec<Client>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT client_id, name, email, starting_capital, start_date, active
        FROM clients
        ORDER BY client_id ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(client_from_row).collect()
}

/// All movements, ordered by (date, movement_id).
pub(super) async fn fetch_movements(
    conn: &mut SqliteConnection,
) -> Result<Vec<CapitalMovement>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT movement_id, client_id, date, amount, kind, notes
        FROM capital_movements
        ORDER BY date ASC, movement_id ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let movement_id: String = row.try_get("movement_id")?;
            let corrupt = |e: crate::domain::RecordDefect| {
                StoreError::Corrupt(format!("movement {movement_id}: {e}"))
            };
            let kind: MovementKind = row
                .try_get::<String, _>("kind")?
                .parse()
                .map_err(corrupt)?;
            CapitalMovement::new(
                movement_id.clone(),
                ClientId::new(row.try_get::<String, _>("client_id")?),
                date_column(row, "date")?,
                decimal_column(row, "amount")?,
                kind,
                row.try_get("notes")?,
            )
            .map_err(corrupt)
        })
        .collect()
}

pub(super) async fn fetch_split_configs(
    conn: &mut SqliteConnection,
) -> Result<SplitConfigSet, StoreError> {
    let rows = sqlx::query("SELECT scope, tax_rate, trader_share FROM split_configs ORDER BY scope")
        .fetch_all(&mut *conn)
        .await?;

    let mut global = None;
    let mut clients = BTreeMap::new();
    for row in &rows {
        let scope: String = row.try_get("scope")?;
        let config = SplitConfig::new(
            decimal_column(row, "tax_rate")?,
            decimal_column(row, "trader_share")?,
        )?;
        if scope == GLOBAL_SCOPE {
            global = Some(config);
        } else if let Some(id) = scope.strip_prefix(CLIENT_SCOPE_PREFIX) {
            clients.insert(ClientId::new(id), config);
        } else {
            return Err(StoreError::Corrupt(format!("split config scope {scope:?}")));
        }
    }

    Ok(SplitConfigSet {
        global: global.ok_or(StoreError::MissingGlobalConfig)?,
        clients,
    })
}
