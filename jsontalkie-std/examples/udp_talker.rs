//! Lamp talker on a UDP broadcast network
//!
//! Listens on port 5005 (or the first argument) and answers requests such as
//! `{"m":3,"i":1,"c":0,"f":"cli","t":"lamp","0":"on"}` once a valid checksum
//! is filled in. Stop it with Ctrl-C.

use std::net::SocketAddr;

use jsontalkie_std::{
    drive, Action, Context, Manifesto, RouterConfig, StdRouter, StdTimeSource, Talker,
    UdpTransport, DEFAULT_TICK_PERIOD,
};
use log::info;

const RUNS: [Action; 2] = [Action::new("on", "Lamp on"), Action::new("off", "Lamp off")];
const SETS: [Action; 1] = [Action::new("dim", "Brightness 0-100")];
const GETS: [Action; 2] = [
    Action::new("lit", "Lamp state"),
    Action::new("level", "Brightness"),
];

#[derive(Default)]
struct Lamp {
    lit: bool,
    level: u32,
}

impl Manifesto for Lamp {
    fn class_name(&self) -> &'static str {
        "Lamp"
    }

    fn runs(&self) -> &[Action] {
        &RUNS
    }

    fn sets(&self) -> &[Action] {
        &SETS
    }

    fn gets(&self) -> &[Action] {
        &GETS
    }

    fn run(&mut self, index: u8, _context: &mut Context<'_>) -> bool {
        let lit = index == 0;
        if self.lit == lit {
            return false;
        }
        self.lit = lit;
        info!("Lamp {}", if lit { "on" } else { "off" });
        true
    }

    fn set(&mut self, _index: u8, value: u32, _context: &mut Context<'_>) -> bool {
        if value > 100 {
            return false;
        }
        self.level = value;
        info!("Lamp dimmed to {}", value);
        true
    }

    fn get(&mut self, index: u8, _context: &mut Context<'_>) -> Option<u32> {
        match index {
            0 => Some(u32::from(self.lit)),
            1 => Some(self.level),
            _ => None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let port: u16 = match std::env::args().nth(1) {
        Some(port) => port.parse()?,
        None => 5005,
    };

    let local = SocketAddr::from(([0, 0, 0, 0], port));
    let broadcast = SocketAddr::from(([255, 255, 255, 255], port));
    let mut udp = UdpTransport::bind(local, broadcast).await?;

    let mut lamp = Lamp::default();
    let talker = Talker::new("lamp", "Desk lamp", &mut lamp)?;
    info!("Talker {} on channel {}", talker.name(), talker.channel());

    let config = RouterConfig {
        board: "Host",
        ..RouterConfig::default()
    };
    let mut router = StdRouter::<2, 1, 8>::new(StdTimeSource::new(), config);
    router.add_talker(talker)?;
    router.add_uplink(&mut udp)?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    drive(&mut router, DEFAULT_TICK_PERIOD, shutdown).await;
    info!("{} calls dropped as replays", router.drops());
    Ok(())
}
