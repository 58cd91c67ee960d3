//! odoo-rpc -- command-line access to an Odoo server over XML-RPC.
//!
//! Usage:
//!   odoo-rpc version                                   # Probe the server
//!   odoo-rpc login --username admin                    # Authenticate, show session
//!   odoo-rpc search-read --username admin --model pos.order \
//!       --domain '[["state","=","paid"]]' --fields name,amount_total --limit 10
//!   odoo-rpc create --username admin --model res.partner --values '{"name":"Ada"}'
//!   odoo-rpc relays                                    # Show configured relays
//!
//! The API key is read from --api-key or ODOO_API_KEY.

use clap::{Parser, Subcommand};

use odoo_rpc_client::{expand_tilde, ClientConfig, OdooClient, Struct, Value};

#[derive(Parser)]
#[command(name = "odoo-rpc", about = "Odoo XML-RPC client with CORS relay failover")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "~/.config/odoo-rpc/config.toml")]
    config: String,

    /// Override server.url
    #[arg(long)]
    url: Option<String>,

    /// Override server.database
    #[arg(long)]
    database: Option<String>,

    /// Call the server directly, bypassing relays
    #[arg(long)]
    direct: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server version info
    Version,
    /// Authenticate and print the session
    Login(Credentials),
    /// Read records matching a domain
    SearchRead {
        #[command(flatten)]
        credentials: Credentials,
        /// Model name, e.g. pos.order
        #[arg(long)]
        model: String,
        /// Domain filter as JSON
        #[arg(long, default_value = "[]")]
        domain: String,
        /// Comma-separated field names
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        order: Option<String>,
    },
    /// Count records matching a domain
    Count {
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        model: String,
        #[arg(long, default_value = "[]")]
        domain: String,
    },
    /// Create a record from a JSON object of field values
    Create {
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        model: String,
        #[arg(long)]
        values: String,
    },
    /// List configured relays in sweep order
    Relays,
}

#[derive(clap::Args)]
struct Credentials {
    /// Login name
    #[arg(long)]
    username: String,
    /// API key (falls back to ODOO_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

impl Credentials {
    fn api_key(&self) -> anyhow::Result<String> {
        match &self.api_key {
            Some(key) => Ok(key.clone()),
            None => std::env::var("ODOO_API_KEY")
                .map_err(|_| anyhow::anyhow!("no API key: pass --api-key or set ODOO_API_KEY")),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "odoo_rpc_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = ClientConfig::load_or_default(&expand_tilde(&cli.config))?;
    if let Some(url) = cli.url {
        cfg.server.url = url;
    }
    if let Some(database) = cli.database {
        cfg.server.database = database;
    }
    if cli.direct {
        cfg.transport.use_proxy = false;
    }

    if let Commands::Relays = cli.command {
        for (i, relay) in cfg.relays.iter().enumerate() {
            println!("{i}\t{}\t{}", relay.name, relay.template);
        }
        return Ok(());
    }

    cfg.validate()?;
    let client = OdooClient::new(&cfg);

    match cli.command {
        Commands::Version => {
            let info = client.version().await?;
            print_json(&Value::Struct(info))?;
        }
        Commands::Login(credentials) => {
            let session = client
                .login(&credentials.username, &credentials.api_key()?)
                .await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "url": session.url,
                    "database": session.database,
                    "uid": session.uid,
                    "use_proxy": session.use_proxy,
                    "company_id": session.company_id,
                    "company_name": session.company_name,
                }))?
            );
        }
        Commands::SearchRead {
            credentials,
            model,
            domain,
            fields,
            limit,
            order,
        } => {
            let api_key = credentials.api_key()?;
            let uid = client.authenticate(&credentials.username, &api_key).await?;
            let mut options = Struct::new();
            if let Some(limit) = limit {
                options.insert("limit", limit);
            }
            if let Some(order) = order {
                options.insert("order", order);
            }
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            let rows = client
                .search_read(uid, &api_key, &model, parse_json_arg(&domain)?, &fields, options)
                .await?;
            let rows: Vec<Value> = rows.into_iter().map(Value::Struct).collect();
            print_json(&Value::Array(rows))?;
        }
        Commands::Count {
            credentials,
            model,
            domain,
        } => {
            let api_key = credentials.api_key()?;
            let uid = client.authenticate(&credentials.username, &api_key).await?;
            let count = client
                .search_count(uid, &api_key, &model, parse_json_arg(&domain)?)
                .await?;
            println!("{count}");
        }
        Commands::Create {
            credentials,
            model,
            values,
        } => {
            let api_key = credentials.api_key()?;
            let uid = client.authenticate(&credentials.username, &api_key).await?;
            let values = match parse_json_arg(&values)? {
                Value::Struct(s) => s,
                other => anyhow::bail!("--values must be a JSON object, got {}", other.kind()),
            };
            let id = client.create(uid, &api_key, &model, values).await?;
            println!("{id}");
        }
        Commands::Relays => {}
    }

    Ok(())
}

fn parse_json_arg(raw: &str) -> anyhow::Result<Value> {
    let json: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("invalid JSON argument {raw:?}: {e}"))?;
    Ok(Value::from(json))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value.to_json())?);
    Ok(())
}
