//! hivecache daemon - one cache node serving a group over HTTP

mod http;
mod pool;
mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::BytesMut;
use clap::Parser;
use hivecache::{Error, GroupOptions, Registry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::http::{decode_segment, Request, Response};
use crate::pool::HttpPool;
use crate::source::FileSource;

/// Maximum concurrent connections - prevents exhaustion via connection
/// flooding
const MAX_CONNECTIONS: usize = 10000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address this node binds and advertises (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    bind: String,

    /// Comma-separated peer addresses forming the ring (include self)
    #[arg(short, long, value_delimiter = ',')]
    peers: Vec<String>,

    /// Name of the cache group this node serves
    #[arg(short, long, default_value = "scores")]
    group: String,

    /// Cache capacity in bytes (0 = unbounded)
    #[arg(short, long, default_value_t = 1 << 20)]
    capacity: usize,

    /// Tab-separated key/value file backing the loader
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// TTL for cached entries in seconds (0 = never expire)
    #[arg(long, default_value_t = 60)]
    ttl_secs: u64,

    /// Expiration sweep interval in seconds (0 = disabled)
    #[arg(long, default_value_t = 60)]
    sweep_secs: u64,

    /// URL prefix for peer traffic
    #[arg(long, default_value = pool::DEFAULT_BASE_PATH)]
    base_path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("starting hived v{}", env!("CARGO_PKG_VERSION"));
    info!("binding to {}", args.bind);
    info!("serving group {:?} with {} byte cache", args.group, args.capacity);

    let source = Arc::new(FileSource::load(args.data.as_deref())?);

    let registry = Arc::new(Registry::new());
    let options = GroupOptions {
        cache_bytes: args.capacity,
        default_ttl: Duration::from_secs(args.ttl_secs),
        sweep_interval: (args.sweep_secs > 0).then(|| Duration::from_secs(args.sweep_secs)),
    };
    let loader_source = Arc::clone(&source);
    let group = registry.new_group_with(&args.group, options, move |key: &str| {
        loader_source.get(key)
    })?;

    let pool = Arc::new(HttpPool::with_base_path(&args.bind, &args.base_path));
    if args.peers.is_empty() {
        info!("no peers configured, running standalone");
    } else {
        pool.set_peers(&args.peers);
    }
    group.register_peers(pool)?;

    let listener = TcpListener::bind(&args.bind).await?;
    info!("listening on {}", args.bind);

    let connection_limiter = Arc::new(Semaphore::new(MAX_CONNECTIONS));

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let permit = match connection_limiter.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("connection limit reached, rejecting {}", addr);
                        continue;
                    }
                };

                let registry = Arc::clone(&registry);
                let base_path = args.base_path.clone();

                tokio::spawn(async move {
                    let _permit = permit;

                    if let Err(e) = handle_client(stream, registry, base_path).await {
                        error!("error handling client {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("error accepting connection: {}", e);
            }
        }
    }
}

/// Read one request, answer it, and close the connection (every
/// response carries `Connection: close`).
async fn handle_client(
    mut stream: TcpStream,
    registry: Arc<Registry>,
    base_path: String,
) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            // closed before a full request arrived
            return Ok(());
        }

        match Request::parse(&mut buffer) {
            Ok(Some(request)) => {
                let response = respond(&request, &registry, &base_path).await;
                stream.write_all(&response.serialize()).await?;
                return Ok(());
            }
            Ok(None) => continue,
            Err(e) => {
                warn!("parse error: {}", e);
                stream
                    .write_all(&Response::error(400, &e).serialize())
                    .await?;
                return Ok(());
            }
        }
    }
}

/// Route `GET /<base>/<group>/<key>` through the registry.
async fn respond(request: &Request, registry: &Arc<Registry>, base_path: &str) -> Response {
    if request.method != "GET" {
        return Response::error(405, "only GET is supported");
    }

    let Some(rest) = request.path.strip_prefix(base_path) else {
        return Response::error(400, &format!("unexpected path: {}", request.path));
    };
    let Some((group_part, key_part)) = rest.split_once('/') else {
        return Response::error(400, "bad request");
    };

    let group_name = match decode_segment(group_part) {
        Ok(name) => name,
        Err(e) => return Response::error(400, &e),
    };
    let key = match decode_segment(key_part) {
        Ok(key) => key,
        Err(e) => return Response::error(400, &e),
    };

    let Some(group) = registry.get(&group_name) else {
        return Response::error(404, &format!("no such group: {}", group_name));
    };

    // the miss path may block on the loader or a peer fetch
    let result = tokio::task::spawn_blocking(move || group.get(&key)).await;
    match result {
        Ok(Ok(view)) => Response::ok(view.to_vec()),
        Ok(Err(err @ Error::EmptyKey)) => Response::error(400, &err.to_string()),
        Ok(Err(err @ Error::GroupNotFound(_))) => Response::error(404, &err.to_string()),
        Ok(Err(err)) => Response::error(500, &err.to_string()),
        Err(join_err) => {
            error!("load task failed: {}", join_err);
            Response::error(500, "internal error")
        }
    }
}
