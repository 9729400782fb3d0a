//! TLS connector selection from the conninfo's ssl mode

use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::config::SslMode;

use pgpond_core::{PondError, Result};

/// Build a TLS connector matching the conninfo's `sslmode`, or `None` for
/// a plaintext connection.
pub(crate) fn connector_for(config: &tokio_postgres::Config) -> Result<Option<MakeTlsConnector>> {
    match config.get_ssl_mode() {
        SslMode::Disable => Ok(None),
        mode => {
            let mut builder = TlsConnector::builder();
            if matches!(mode, SslMode::Require) {
                // `require` asks for encryption without identity checks;
                // the handshake must succeed even with no CA bundle.
                builder.danger_accept_invalid_certs(true);
                builder.danger_accept_invalid_hostnames(true);
            }
            let connector = builder.build().map_err(|e| {
                PondError::Connection(format!("failed to build TLS connector: {e}"))
            })?;
            Ok(Some(MakeTlsConnector::new(connector)))
        }
    }
}
