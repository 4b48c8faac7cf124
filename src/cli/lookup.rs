use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use colored::Colorize;
use log::warn;
use tabled::Table;
use tokio::task::JoinSet;

use crate::{
    bridge::{lookup_phone, BrokerConnection, BrokerFactory},
    cli::LookupRow,
    kafka::KafkaFactory,
};

pub async fn lookup(factory: KafkaFactory, ids: &[String], cold: bool) -> Result<(), anyhow::Error> {
    let rows = if cold {
        lookup_cold(&factory, ids).await
    } else {
        lookup_concurrently(Arc::new(factory), ids).await?
    };

    let found = rows.iter().filter(|row| row.is_found()).count();
    let missing = rows.len() - found;

    let table = Table::new(rows);
    println!("{table}");
    println!(
        "{} found, {} not found",
        found.to_string().green(),
        missing.to_string().red()
    );
    Ok(())
}

/// One ad hoc connection per identifier, one after the other.
async fn lookup_cold(factory: &KafkaFactory, ids: &[String]) -> Vec<LookupRow> {
    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        let started = Instant::now();
        let phone = lookup_phone(factory, id, None).await;
        rows.push(LookupRow::new(id, phone, started.elapsed()));
    }
    rows
}

/// One shared connection, all identifiers in flight at once. The connection
/// is closed before returning, whatever the lookups did.
pub async fn lookup_concurrently<F>(
    factory: Arc<F>,
    ids: &[String],
) -> Result<Vec<LookupRow>, anyhow::Error>
where
    F: BrokerFactory + 'static,
{
    let connection = match BrokerConnection::open(factory.as_ref()).await {
        Ok(connection) => Some(Arc::new(connection)),
        Err(e) => {
            warn!("Broker connection failed, every lookup will be not found: {}", e);
            None
        }
    };

    let mut lookups = JoinSet::new();
    for (index, id) in ids.iter().cloned().enumerate() {
        let factory = Arc::clone(&factory);
        let connection = connection.clone();
        lookups.spawn(async move {
            let started = Instant::now();
            let phone = match connection.as_deref() {
                Some(connection) => lookup_phone(factory.as_ref(), &id, Some(connection)).await,
                None => None,
            };
            (index, LookupRow::new(&id, phone, started.elapsed()))
        });
    }

    let mut joined = Vec::with_capacity(ids.len());
    while let Some(outcome) = lookups.join_next().await {
        joined.push(outcome);
    }
    if let Some(connection) = connection {
        connection.close().await;
    }

    let mut rows = joined
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .context("Lookup task failed")?;
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}
