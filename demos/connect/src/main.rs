//! Exercises one live handshake against an NPS server and prints the
//! negotiated protocol pair. Not a query client: once `startup` returns,
//! this binary has nothing left to do with the connection.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use nz_handshake::{HandshakeDriver, HandshakeOptions, SecurityLevel, TlsConfig, DEFAULT_PORT};
use tokio::net::TcpStream;

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
enum Security {
    PreferUnsecured,
    RequireUnsecured,
    PreferSecured,
    RequireSecured,
}

impl From<Security> for SecurityLevel {
    fn from(value: Security) -> Self {
        match value {
            Security::PreferUnsecured => SecurityLevel::PreferredUnsecured,
            Security::RequireUnsecured => SecurityLevel::OnlyUnsecured,
            Security::PreferSecured => SecurityLevel::PreferredSecured,
            Security::RequireSecured => SecurityLevel::OnlySecured,
        }
    }
}

/// Perform a single NPS connection handshake and report the outcome.
#[derive(Debug, Parser)]
#[command(name = "nz-connect-demo", version)]
struct Args {
    /// Server host name or address.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Database to select; omitted entirely if not given.
    #[arg(long)]
    database: Option<String>,

    /// User name.
    #[arg(long, default_value = "admin")]
    user: String,

    /// Password. Read from NZ_PASSWORD if not given.
    #[arg(long, env = "NZ_PASSWORD", default_value = "")]
    password: String,

    /// TLS preference announced to the server.
    #[arg(long, value_enum, default_value = "prefer-unsecured")]
    security: Security,

    /// Accept any server certificate during an in-band TLS upgrade.
    #[arg(long)]
    insecure_tls: bool,

    /// pgOptions string streamed as the OPTIONS attribute.
    #[arg(long)]
    options: Option<String>,

    /// Read timeout, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let tls_config = if args.insecure_tls {
        TlsConfig::new().insecure()
    } else {
        TlsConfig::new()
    };

    let options = HandshakeOptions {
        app_name: Some("nz-connect-demo".to_string()),
        debug: true,
        read_timeout: Duration::from_secs(args.timeout_secs),
    };

    eprintln!("connecting to {}:{}", args.host, args.port);
    let tcp = TcpStream::connect((args.host.as_str(), args.port)).await?;
    tcp.set_nodelay(true)?;

    let driver = HandshakeDriver::new(tcp, args.host.as_str(), tls_config, options);
    let result = driver
        .startup(
            args.database.as_deref(),
            args.security.into(),
            &args.user,
            &args.password,
            args.options.as_deref(),
        )
        .await?;

    let (p1, p2) = result.negotiated_protocol;
    println!("handshake complete: protocol {p1}.{p2}");
    if let Some(key) = result.cancel_key {
        println!("backend pid={} secret={}", key.pid, key.secret);
    }
    if !result.remaining_buffer.is_empty() {
        println!(
            "{} bytes already buffered past ready-for-query",
            result.remaining_buffer.len()
        );
    }

    Ok(())
}
