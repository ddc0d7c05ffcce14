use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use kubeset_core::{FieldValue, Record, Settings};
use kubeset_kubehub::ClusterApi;
use kubeset_schema::KindDeclaration;
use kubeset_search::Q;
use kubeset_store::{from_payload, RecordStore, Session};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "kubesetctl", version, about = "Query Kubernetes objects like database rows")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Only records in this namespace
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    /// Kubeconfig file (default: in-cluster, then ~/.kube/config)
    #[arg(long = "kubeconfig", global = true, env = "KUBESET_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context (default: the file's current context)
    #[arg(long = "context", global = true, env = "KUBESET_CONTEXT")]
    context: Option<String>,

    /// Namespace given to new namespace-scoped records
    #[arg(long = "default-namespace", global = true, env = "KUBESET_DEFAULT_NAMESPACE")]
    default_namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

/// How the kind named by the GVK key is declared.
#[derive(Args, Debug, Clone)]
struct KindArgs {
    /// GVK key, e.g. "v1/ConfigMap" or "k3s.cattle.io/v1/Addon"
    gvk: String,
    /// Plural resource name (default: lowercase kind + "s")
    #[arg(long = "plural")]
    plural: Option<String>,
    #[arg(long = "cluster-scoped", action = ArgAction::SetTrue)]
    cluster_scoped: bool,
    /// Declare the kind even when the cluster publishes no schema for it
    #[arg(long = "no-schema", action = ArgAction::SetTrue)]
    no_schema: bool,
}

#[derive(Args, Debug, Clone, Default)]
struct QueryArgs {
    /// Lookup as path[__op]=value, e.g. labels__app=web or spec__replicas__gt=1 (repeatable)
    #[arg(long = "filter", short = 'f')]
    filters: Vec<String>,
    /// Drop records matching path[__op]=value (repeatable)
    #[arg(long = "exclude", short = 'x')]
    exclude: Vec<String>,
    /// Combine --filter terms with OR instead of AND
    #[arg(long = "any", action = ArgAction::SetTrue)]
    any: bool,
    /// Case-insensitive match on name or namespace
    #[arg(long = "search", short = 's')]
    search: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List records of a kind
    Ls {
        #[command(flatten)]
        kind: KindArgs,
        #[command(flatten)]
        query: QueryArgs,
        /// Sort key, "-" prefix for descending (repeatable)
        #[arg(long = "order-by")]
        order_by: Vec<String>,
        #[arg(long = "limit")]
        limit: Option<usize>,
    },
    /// Count records of a kind
    Count {
        #[command(flatten)]
        kind: KindArgs,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Fetch exactly one record
    Get {
        #[command(flatten)]
        kind: KindArgs,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Show the fields synthesized for a kind
    Fields {
        #[command(flatten)]
        kind: KindArgs,
    },
    /// Create or replace a record from a YAML manifest
    Save {
        #[command(flatten)]
        kind: KindArgs,
        /// Manifest path
        #[arg(long = "file", short = 'f')]
        file: PathBuf,
    },
}

fn init_tracing() {
    let env = std::env::var("KUBESET_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics(addr: Option<&str>) {
    let Some(addr) = addr else { return };
    match addr.parse::<std::net::SocketAddr>() {
        Ok(sock) => match metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(sock).install() {
            Ok(()) => info!(addr = %addr, "Prometheus metrics exporter listening"),
            Err(e) => warn!(error = %e, "failed to install metrics exporter"),
        },
        Err(_) => warn!(addr = %addr, "invalid KUBESET_METRICS_ADDR; expected host:port"),
    }
}

fn declaration(args: &KindArgs) -> Result<KindDeclaration> {
    let mut decl = KindDeclaration::from_gvk(&args.gvk)
        .ok_or_else(|| anyhow!("invalid gvk key {:?}; expected v1/Kind or group/v1/Kind", args.gvk))?
        .cluster_scoped(args.cluster_scoped);
    if let Some(p) = &args.plural {
        decl = decl.plural(p.clone());
    }
    if args.no_schema {
        decl = decl.require_schema(false);
    }
    Ok(decl)
}

/// `true`/`false`, integers and floats parse as such; everything else is a string.
fn parse_scalar(raw: &str) -> FieldValue {
    if let Ok(b) = raw.parse::<bool>() {
        return FieldValue::from(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return FieldValue::from(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        return FieldValue::from(x);
    }
    FieldValue::from(raw)
}

fn parse_term(term: &str) -> Result<Q> {
    let (key, raw) = term.split_once('=').ok_or_else(|| anyhow!("expected path=value, got {:?}", term))?;
    if key.is_empty() {
        return Err(anyhow!("empty path in {:?}", term));
    }
    let value = if key.ends_with("__in") {
        FieldValue::List(raw.split(',').map(|s| parse_scalar(s.trim())).collect())
    } else {
        parse_scalar(raw)
    };
    Ok(Q::new(key, value))
}

fn build_query(args: &QueryArgs, namespace: Option<&str>) -> Result<Q> {
    let mut parts: Vec<Q> = Vec::new();
    if let Some(ns) = namespace {
        parts.push(Q::new("namespace", ns));
    }
    let terms = args.filters.iter().map(|t| parse_term(t)).collect::<Result<Vec<_>>>()?;
    if !terms.is_empty() {
        parts.push(if args.any { Q::or(terms) } else { Q::and(terms) });
    }
    for term in &args.exclude {
        parts.push(!parse_term(term)?);
    }
    if let Some(text) = &args.search {
        parts.push(Q::new("name__icontains", text.as_str()) | Q::new("namespace__icontains", text.as_str()));
    }
    Ok(Q::and(parts))
}

fn render_age(record: &Record) -> String {
    let Some(created) = record.creation_timestamp else { return "-".to_string() };
    let mut secs = (chrono::Utc::now() - created).num_seconds().max(0) as u64;
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3600;
    secs %= 3600;
    let mins = secs / 60;
    secs %= 60;
    if days > 0 {
        format!("{}d{}h", days, hours)
    } else if hours > 0 {
        format!("{}h{}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}

fn print_records(output: Output, records: &[Arc<Record>]) -> Result<()> {
    match output {
        Output::Human => {
            println!("{:<20} {:<40} {}", "NAMESPACE", "NAME", "AGE");
            for r in records {
                println!("{:<20} {:<40} {}", r.namespace.as_deref().unwrap_or("-"), r.name, render_age(r));
            }
        }
        Output::Json => {
            let items: Vec<&Record> = records.iter().map(|r| r.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

fn report_partial(store: &RecordStore) {
    for skipped in &store.fetch_report().skipped {
        eprintln!("warning: namespace {} skipped: {}", skipped.namespace, skipped.error);
    }
}

async fn open(session: &Session, kind: &KindArgs) -> Result<RecordStore> {
    let objects = session.objects(declaration(kind)?).await.with_context(|| format!("declaring {}", kind.gvk))?;
    Ok(objects.query())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(path) = &cli.kubeconfig {
        settings.kubeconfig = Some(path.clone());
    }
    if let Some(ctx) = &cli.context {
        settings.context = Some(ctx.clone());
    }
    if let Some(ns) = &cli.default_namespace {
        settings.default_namespace = ns.clone();
    }
    init_metrics(settings.metrics_addr.as_deref());

    let api: Arc<dyn ClusterApi> = Arc::new(kubeset_kubehub::connect(settings.kubeconfig.as_deref(), settings.context.as_deref()).await?);
    let session = Session::new(api, &settings);
    let ns = cli.namespace.as_deref();

    match cli.command {
        Commands::Ls { kind, query, order_by, limit } => {
            info!(gvk = %kind.gvk, ns = ?ns, "ls invoked");
            let mut store = open(&session, &kind).await?;
            let mut selected = store.filter(&build_query(&query, ns)?).await?;
            let keys = if order_by.is_empty() && query.search.is_some() { vec!["name".to_string()] } else { order_by };
            let mut ordered = selected.order_by(&keys).await?;
            let records = ordered.slice(0..limit.unwrap_or(usize::MAX)).await?;
            report_partial(&store);
            print_records(cli.output, &records)?;
        }
        Commands::Count { kind, query } => {
            let mut store = open(&session, &kind).await?;
            let n = store.filter(&build_query(&query, ns)?).await?.count().await?;
            report_partial(&store);
            match cli.output {
                Output::Human => println!("{}", n),
                Output::Json => println!("{}", serde_json::json!({ "count": n })),
            }
        }
        Commands::Get { kind, query } => {
            let mut store = open(&session, &kind).await?;
            let outcome = store.get(&build_query(&query, ns)?).await?;
            let record = outcome.into_result(&store.descriptor().kind)?;
            match cli.output {
                Output::Human => println!("{}", serde_yaml::to_string(record.as_ref())?),
                Output::Json => println!("{}", serde_json::to_string_pretty(record.as_ref())?),
            }
        }
        Commands::Fields { kind } => {
            let objects = session.objects(declaration(&kind)?).await?;
            match cli.output {
                Output::Human => {
                    println!("{:<32} {:<10} {}", "FIELD", "TYPE", "DEFAULT");
                    for f in objects.kind().fields() {
                        println!("{:<32} {:<10} {}", f.name, f.semantic_type, f.default_value);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(objects.kind().fields())?),
            }
        }
        Commands::Save { kind, file } => {
            let objects = session.objects(declaration(&kind)?).await?;
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let manifest: serde_json::Value =
                serde_yaml::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
            let record = from_payload(objects.kind(), &manifest)?;
            let saved = objects.save(&record).await?;
            match cli.output {
                Output::Human => println!("saved {}", saved),
                Output::Json => println!("{}", serde_json::to_string_pretty(&saved)?),
            }
        }
    }
    Ok(())
}
