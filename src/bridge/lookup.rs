use log::{debug, warn};

use super::connection::BrokerConnection;
use super::envelope::LookupKey;
use super::error::BridgeResult;
use super::transport::BrokerFactory;

/// Resolve an identifier to a phone number, failing soft.
///
/// With a long-lived `connection` the lookup reuses it. Without one, an ad
/// hoc connection is opened for this call and closed afterwards, paying the
/// warmup every time. Any broker failure is logged and reported as `None`,
/// exactly like an unknown identifier.
pub async fn lookup_phone<F>(
    factory: &F,
    raw_key: &str,
    connection: Option<&BrokerConnection<F::Publisher, F::Subscriber>>,
) -> Option<String>
where
    F: BrokerFactory,
{
    let key = LookupKey::new(raw_key);
    if key.is_empty() {
        debug!("Empty identifier, nothing to look up");
        return None;
    }

    let outcome = match connection {
        Some(connection) => connection.exchange(&key).await,
        None => exchange_once(factory, &key).await,
    };

    match outcome {
        Ok(phone) => phone,
        Err(e) => {
            warn!("Lookup for {} reported as not found: {}", key, e);
            None
        }
    }
}

async fn exchange_once<F: BrokerFactory>(
    factory: &F,
    key: &LookupKey,
) -> BridgeResult<Option<String>> {
    let connection = BrokerConnection::open(factory).await?;
    let outcome = connection.exchange(key).await;
    connection.close().await;
    outcome
}
