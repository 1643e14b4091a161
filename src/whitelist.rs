//! Whitelist Adapter — looks up whether a `(from, to)` pair is allowed to
//! transact, against the `accounts(address, escrow, supernode)` table.
//!
//! Each lookup opens its own connection, sets the session's time zone and
//! isolation level, runs a single query, and drops the connection — mirrors
//! the upstream `OpenDatabase`/`isWhitelistTx` pair, which never pools.
//! Any error along the way (connect, session setup, query, no matching row)
//! is treated as "not whitelisted" rather than propagated, matching the
//! original's blanket `return false`.

use alloy_primitives::Address;
use async_trait::async_trait;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Row};
use tracing::warn;

#[async_trait]
pub trait WhitelistLookup: Send + Sync {
    async fn is_whitelisted(&self, from: Address, to: Address) -> bool;
}

/// Used when `EnableWhitelistDB` is off: the policy engine never calls this
/// rule, but a concrete implementation still has to exist to hand in.
pub struct NoWhitelist;

#[async_trait]
impl WhitelistLookup for NoWhitelist {
    async fn is_whitelisted(&self, _from: Address, _to: Address) -> bool {
        false
    }
}

pub struct MySqlWhitelist {
    connect_options: MySqlConnectOptions,
}

impl MySqlWhitelist {
    pub fn new(connect_options: MySqlConnectOptions) -> Self {
        Self { connect_options }
    }
}

#[async_trait]
impl WhitelistLookup for MySqlWhitelist {
    async fn is_whitelisted(&self, from: Address, to: Address) -> bool {
        match self.lookup(from, to).await {
            Ok(allowed) => allowed,
            Err(err) => {
                warn!(%err, "whitelist lookup failed, treating as not whitelisted");
                false
            }
        }
    }
}

impl MySqlWhitelist {
    async fn lookup(&self, from: Address, to: Address) -> Result<bool, sqlx::Error> {
        let mut conn = self.connect_options.clone().connect().await?;
        sqlx::query("SET time_zone = '+00:00'").execute(&mut conn).await?;
        sqlx::query("SET transaction_isolation = 'READ-COMMITTED'")
            .execute(&mut conn)
            .await?;

        let from_hex = hex::encode(from);
        let row = sqlx::query("SELECT escrow, supernode FROM accounts WHERE address = ?")
            .bind(&from_hex)
            .fetch_optional(&mut conn)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };
        let is_supernode: bool = row.try_get("supernode")?;
        if is_supernode {
            return Ok(true);
        }

        let escrow: String = row.try_get("escrow")?;
        let escrow = escrow.trim_start_matches("0x");
        let Ok(escrow_bytes) = hex::decode(escrow) else {
            return Ok(false);
        };
        if escrow_bytes.len() != 20 {
            return Ok(false);
        }
        Ok(Address::from_slice(&escrow_bytes) == to)
    }
}
