use std::{
    io,
    net::{SocketAddr, UdpSocket},
    time::{Duration, Instant},
};

use anyhow::{ensure, Context};
use clap::Parser;
use datalink::{
    layer::{Builder, Event, ReceiverStat, SenderStat},
    station::{ChannelConfig, ChannelStat, CountingNetwork, NoisyChannel, PhysicalLayer, Station},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const STAT_INTERVAL: Duration = Duration::from_secs(1);
const MIN_WAIT: Duration = Duration::from_millis(1);
const RECV_BUF_LEN: usize = 1 << 16;

/// One end of a noisy point-to-point link over UDP.
///
/// Both ends send `--packets` numbered packets and check that the peer's
/// packets arrive in order and intact.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Local address to bind.
    #[arg(long, default_value = "127.0.0.1:19479")]
    bind: SocketAddr,
    /// Address of the other station.
    #[arg(long)]
    peer: SocketAddr,
    /// Packets to send, and to expect from the peer.
    #[arg(long, default_value_t = 1000)]
    packets: u32,
    #[arg(long, default_value_t = 256)]
    packet_len: usize,
    /// Probability of losing an incoming frame.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,
    /// Probability of flipping each bit of an incoming frame.
    #[arg(long, default_value_t = 0.0)]
    ber: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Largest sequence number; must be odd.
    #[arg(long, default_value_t = 31)]
    max_seq: u8,
    #[arg(long, default_value_t = 5000)]
    data_timeout_ms: u64,
    #[arg(long, default_value_t = 300)]
    ack_timeout_ms: u64,
}

/// A connected UDP socket as the physical medium.
struct UdpLink<'a> {
    socket: &'a UdpSocket,
}

impl PhysicalLayer for UdpLink<'_> {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        self.socket.send(frame).map(|_| ())
    }
}

#[derive(Debug, PartialEq, Clone)]
struct Stat {
    sender: SenderStat,
    receiver: ReceiverStat,
    channel: ChannelStat,
    transmit_errors: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    ensure!(cli.packet_len >= 4, "packet_len must hold a 4-byte packet index");

    let data_timeout = Duration::from_millis(cli.data_timeout_ms);
    let session = Builder {
        max_seq: cli.max_seq,
        max_packet_len: cli.packet_len,
        data_timeout,
        ack_timeout: Duration::from_millis(cli.ack_timeout_ms),
    }
    .build()?;
    let mut channel = NoisyChannel::new(ChannelConfig {
        loss_rate: cli.loss,
        bit_error_rate: cli.ber,
        seed: cli.seed,
    })?;

    // socket
    let socket = UdpSocket::bind(cli.bind).with_context(|| format!("bind {}", cli.bind))?;
    socket.connect(cli.peer)?;
    info!(local = %socket.local_addr()?, peer = %cli.peer, "station up");

    let mut station = Station::new(session);
    let mut net = CountingNetwork::new(cli.packet_len, cli.packets, cli.packets);
    let mut phy = UdpLink { socket: &socket };
    let mut buf = vec![0; RECV_BUF_LEN];

    let linger = data_timeout * 2;
    let mut completed_at: Option<Instant> = None;
    let mut next_stat = Instant::now() + STAT_INTERVAL;
    let mut old_stat = None;
    loop {
        let now = Instant::now();
        while station.poll(now, &mut net, &mut phy)? {}

        if completed_at.is_none()
            && net.is_complete()
            && station.session().sender().nbuffered() == 0
        {
            info!(sent = net.sent(), received = net.received(), "transfer complete");
            completed_at = Some(now);
        }
        if let Some(completed_at) = completed_at {
            if now >= completed_at + linger {
                break;
            }
        }

        if now >= next_stat {
            let stat = Stat {
                sender: station.session().sender().stat(),
                receiver: station.session().receiver().stat(),
                channel: channel.stat(),
                transmit_errors: station.transmit_errors(),
            };
            if old_stat.as_ref() != Some(&stat) {
                info!(sender = ?stat.sender, receiver = ?stat.receiver, channel = ?stat.channel, transmit_errors = stat.transmit_errors, "stat");
            }
            old_stat = Some(stat);
            next_stat = now + STAT_INTERVAL;
        }

        // wait for a frame or the next thing due
        let mut wake = next_stat;
        if let Some(deadline) = station.next_deadline() {
            wake = wake.min(deadline);
        }
        if let Some(completed_at) = completed_at {
            wake = wake.min(completed_at + linger);
        }
        socket.set_read_timeout(Some(wake.saturating_duration_since(now).max(MIN_WAIT)))?;
        match socket.recv(&mut buf) {
            Ok(len) => {
                if let Some(frame) = channel.perturb(buf[..len].to_vec()) {
                    station.handle(
                        Event::FrameReceived(frame),
                        Instant::now(),
                        &mut net,
                        &mut phy,
                    )?;
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => (),
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => debug!("peer not up yet"),
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        sent = net.sent(),
        received = net.received(),
        errors = net.errors(),
        "done"
    );
    ensure!(net.errors() == 0, "{} packets arrived damaged or out of order", net.errors());
    Ok(())
}
