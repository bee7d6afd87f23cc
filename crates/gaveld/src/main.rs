use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use gavelio::frame::FrameReader;
use gavelproto::packet::Packet;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

mod area;
mod client;
mod commands;
mod config;
mod dispatch;
mod duration;
mod permissions;
mod registry;
mod report;
mod server;
mod store;

use client::Client;
use server::Server;
use store::{BanLookup, Store};

fn usage_and_exit() -> ! {
    eprintln!(
        "gaveld (courtroom roleplay server)\n\n\
USAGE:\n  gaveld [--config DIR]\n\n\
ENV:\n  GAVELD_CONFIG    config directory; default config\n  RUST_LOG         log filter; default info\n"
    );
    std::process::exit(2);
}

fn parse_args() -> PathBuf {
    let mut dir = std::env::var("GAVELD_CONFIG").unwrap_or_else(|_| "config".to_string());

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                dir = it.next().unwrap_or_else(|| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }
    PathBuf::from(dir)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let dir = parse_args();
    let cfg = config::load_config(&dir)?;
    let characters = config::load_characters(&dir)?;
    let music = config::load_music(&dir)?;
    let backgrounds = config::load_backgrounds(&dir);
    let areas = config::load_areas(&dir)?;
    let roles = config::load_roles(&dir)?;
    let store = Store::open(&dir.join("gavel.db"))?;

    if cfg.master.advertise {
        // Master-server advertising is handled out of process.
        info!(addr = %cfg.master.addr, "advertising requested; no advertiser in this build");
    }

    let bind: SocketAddr = format!(
        "{}:{}",
        if cfg.server.addr.is_empty() {
            "0.0.0.0"
        } else {
            &cfg.server.addr
        },
        cfg.server.port
    )
    .parse()
    .context("invalid bind address")?;

    let server = Arc::new(Server::new(
        cfg, characters, music, backgrounds, areas, roles, store,
    )?);

    let listener = TcpListener::bind(bind).await?;
    info!(
        bind = %bind,
        name = %server.config.server.name,
        areas = server.areas.len(),
        characters = server.characters.len(),
        "server listening"
    );

    loop {
        let (stream, peer) = listener.accept().await?;
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_conn(server, stream, peer).await {
                warn!(peer = %peer, err = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_conn(
    server: Arc<Server>,
    mut stream: TcpStream,
    peer: SocketAddr,
) -> anyhow::Result<()> {
    let ipid = server.ipid(peer.ip());

    // Bans are sampled at connect time; an existing session is never
    // retroactively evicted by a new ban.
    if let Some(ban) = server.store.is_banned(BanLookup::Ipid, &ipid)? {
        info!(ipid = %ipid, ban = ban.id, "rejected banned connection");
        let _ = stream
            .write_all(format!("BD#{}#%", ban.reason).as_bytes())
            .await;
        return Ok(());
    }

    let (rd, mut wr) = stream.into_split();
    let (write_tx, mut write_rx) = tokio::sync::mpsc::channel::<Bytes>(256);
    let writer = tokio::spawn(async move {
        while let Some(b) = write_rx.recv().await {
            if wr.write_all(&b[..]).await.is_err() {
                break;
            }
        }
    });

    let client = Arc::new(Client::new(server.registry.alloc_conn_id(), ipid, write_tx));
    server.registry.insert(client.clone());

    let mut fr = FrameReader::new(rd);
    loop {
        tokio::select! {
            _ = client.shutdown_notified() => break,
            res = fr.read_frame() => {
                let frame = match res {
                    Ok(Some(f)) => f,
                    Ok(None) => break,
                    Err(_) => break,
                };
                let text = String::from_utf8_lossy(&frame);
                if let Ok(p) = Packet::parse(&text) {
                    dispatch::dispatch(&server, &client, &p);
                }
            }
        }
    }

    server.remove_client(&client);

    // Dropping our handle closes the write channel once in-flight broadcast
    // snapshots release theirs; the writer drains what is queued and exits.
    drop(client);
    let _ = writer.await;
    Ok(())
}
