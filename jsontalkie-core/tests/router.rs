mod common;

use common::{parse, request, seal, MemoryLink, Probe};
use jsontalkie_core::{
    key, Ack, BroadcastRouter, CompactMessage, ErrorCode, LinkId, LocalBus, MessageKind, Origin,
    RouterConfig, SysCode, TalkieError, Talker, TickClock, Value,
};

type Router<'a> = BroadcastRouter<'a, &'a TickClock, 4, 2, 8>;

fn config(max_delay_ms: u16) -> RouterConfig {
    RouterConfig {
        board: "TestBoard",
        max_delay_ms,
        ..RouterConfig::default()
    }
}

fn run_on(to: Option<&str>, identity: u16) -> CompactMessage {
    let mut message = request(MessageKind::Run, to, identity);
    assert!(message.set_string(key::data(0), "on"));
    message
}

#[test]
fn test_unaddressed_call_is_never_broadcast() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let mut beta = Probe::default();
    let (alpha_runs, beta_runs) = (alpha.runs.clone(), beta.runs.clone());
    let (mut uplink, wire) = MemoryLink::new("Udp");
    let (mut downlink, bus) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_talker(Talker::new("beta", "", &mut beta).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    wire.inject(&seal(run_on(None, 10)));
    for (identity, kind) in [
        (11, MessageKind::Set),
        (12, MessageKind::Get),
        (13, MessageKind::List),
        (14, MessageKind::Sys),
    ] {
        wire.inject(&seal(request(kind, None, identity)));
    }
    bus.inject(&seal(run_on(None, 15)));
    for _ in 0..3 {
        router.tick();
    }

    assert_eq!(alpha_runs.get(), 0);
    assert_eq!(beta_runs.get(), 0);
    assert!(wire.take_sent().is_empty());
    assert!(bus.take_sent().is_empty());
}

#[test]
fn test_unaddressed_call_is_never_posted_remotely() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let (mut uplink, wire) = MemoryLink::new("Udp");
    let (mut downlink, bus) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    let unaddressed = CompactMessage::compose(MessageKind::Run, "alpha").unwrap();
    assert_eq!(
        router.post(0, unaddressed.clone(), Origin::Remote),
        Err(TalkieError::MalformedMessage)
    );
    assert!(wire.take_sent().is_empty());
    assert!(bus.take_sent().is_empty());

    let mut addressed = unaddressed;
    assert!(addressed.set_string(key::TO, "lamp"));
    router.post(0, addressed, Origin::Remote).unwrap();
    assert_eq!(wire.take_sent().len(), 1);
    assert_eq!(bus.take_sent().len(), 1);
}

#[test]
fn test_unaddressed_ping_reaches_every_talker_once() {
    let clock = TickClock::new();
    let mut probes: [Probe; 3] = Default::default();
    let (mut uplink, wire) = MemoryLink::new("Udp");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    for (probe, name) in probes.iter_mut().zip(["alpha", "beta", "gamma"]) {
        router.add_talker(Talker::new(name, "", probe).unwrap()).unwrap();
    }
    router.add_uplink(&mut uplink).unwrap();

    wire.inject(&seal(request(MessageKind::Ping, None, 10)));
    router.tick();

    let mut senders: Vec<String> = wire
        .take_sent()
        .iter()
        .map(|bytes| {
            let mut reply = parse(bytes);
            assert!(reply.verify_checksum());
            assert_eq!(reply.kind(), MessageKind::Echo);
            assert_eq!(reply.get_number(key::ORIGINAL), Some(MessageKind::Ping as u32));
            assert_eq!(reply.to(), Some(Value::Str("caller")));
            reply.from().unwrap().to_string()
        })
        .collect();
    senders.sort();
    assert_eq!(senders, ["alpha", "beta", "gamma"]);
}

#[test]
fn test_by_name_stops_fan_out_and_forwarding() {
    let clock = TickClock::new();
    let mut first = Probe::default();
    let mut second = Probe::default();
    let (first_runs, second_runs) = (first.runs.clone(), second.runs.clone());
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut downlink, down) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router.add_talker(Talker::new("desk", "", &mut first).unwrap()).unwrap();
    router.add_talker(Talker::new("desk", "", &mut second).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    up.inject(&seal(run_on(Some("desk"), 10)));
    router.tick();

    assert_eq!(first_runs.get(), 1);
    assert_eq!(second_runs.get(), 0);
    let replies = up.take_sent();
    assert_eq!(replies.len(), 1);
    assert_eq!(parse(&replies[0]).ack(), Some(Ack::Roger));
    assert!(down.take_sent().is_empty());
}

#[test]
fn test_by_channel_reaches_every_member_and_is_forwarded() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let mut beta = Probe::default();
    let mut gamma = Probe::default();
    let runs = [alpha.runs.clone(), beta.runs.clone(), gamma.runs.clone()];
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut downlink, down) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router
        .add_talker(Talker::new("alpha", "", &mut alpha).unwrap().with_channel(9))
        .unwrap();
    router
        .add_talker(Talker::new("beta", "", &mut beta).unwrap().with_channel(9))
        .unwrap();
    router
        .add_talker(Talker::new("gamma", "", &mut gamma).unwrap().with_channel(10))
        .unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    let mut call = request(MessageKind::Run, None, 10);
    assert!(call.set_number(key::TO, 9));
    assert!(call.set_string(key::data(0), "on"));
    let bytes = seal(call);
    up.inject(&bytes);
    router.tick();

    let counts: Vec<u32> = runs.iter().map(|runs| runs.get()).collect();
    assert_eq!(counts, [1, 1, 0]);
    assert_eq!(up.take_sent().len(), 2);
    assert_eq!(down.take_sent(), vec![bytes]);
}

#[test]
fn test_every_recipient_gets_an_unmutated_copy() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let mut beta = Probe::default();
    let (mut uplink, wire) = MemoryLink::new("Udp");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router.add_talker(Talker::new("alpha", "Hall", &mut alpha).unwrap()).unwrap();
    router.add_talker(Talker::new("beta", "Porch", &mut beta).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();

    wire.inject(&seal(request(MessageKind::Talk, None, 10)));
    router.tick();

    let replies: Vec<CompactMessage> = wire.take_sent().iter().map(|b| parse(b)).collect();
    assert_eq!(replies.len(), 2);
    for (reply, (name, description)) in replies.iter().zip([("alpha", "Hall"), ("beta", "Porch")]) {
        assert_eq!(reply.from(), Some(name));
        assert_eq!(reply.to(), Some(Value::Str("caller")));
        assert_eq!(reply.string(key::data(0)), Some(description));
        assert_eq!(reply.get_number(key::ORIGINAL), Some(MessageKind::Talk as u32));
    }
}

#[test]
fn test_checksum_mismatch_is_dropped_without_counting() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let runs = alpha.runs.clone();
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut downlink, down) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(5));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    let mut bytes = seal(run_on(Some("alpha"), 10));
    let last_data = bytes.len() - 3;
    bytes[last_data] = b'O';
    up.inject(&bytes);
    router.tick();

    assert_eq!(runs.get(), 0);
    assert_eq!(router.drops(), 0);
    assert!(up.take_sent().is_empty());
    assert!(down.take_sent().is_empty());
}

#[test]
fn test_noise_around_the_record_is_trimmed() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let (mut uplink, wire) = MemoryLink::new("Uart");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();

    let mut noisy = b"\x00\xffgarbage".to_vec();
    noisy.extend(seal(request(MessageKind::Ping, Some("alpha"), 3)));
    noisy.extend(b"\r\n");
    wire.inject(&noisy);
    wire.inject(b"no record here");
    router.tick();

    assert_eq!(wire.take_sent().len(), 1);
}

#[test]
fn test_missing_identity_is_repaired_and_reported() {
    let clock = TickClock::new();
    clock.set(1234);
    let mut alpha = Probe::default();
    let (mut uplink, wire) = MemoryLink::new("Udp");

    let mut router: Router = BroadcastRouter::new(&clock, config(5));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();

    let mut anonymous = request(MessageKind::Ping, Some("alpha"), 0);
    assert!(anonymous.remove(key::IDENTITY));
    wire.inject(&seal(anonymous));
    router.tick();

    let sent = wire.take_sent();
    assert_eq!(sent.len(), 2);

    let mut report = parse(&sent[0]);
    assert!(report.verify_checksum());
    assert_eq!(report.kind(), MessageKind::Error);
    assert_eq!(report.get_number(key::SUB_CODE), Some(ErrorCode::Identity as u32));
    assert_eq!(report.from(), Some("TestBoard"));
    assert_eq!(report.to(), Some(Value::Str("caller")));

    let echo = parse(&sent[1]);
    assert_eq!(echo.kind(), MessageKind::Echo);
    assert_eq!(echo.identity(), Some(1234));
    assert_eq!(router.drops(), 0);
}

#[test]
fn test_malformed_record_without_identity_is_dropped_silently() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let alpha_runs = alpha.runs.clone();
    let (mut uplink, wire) = MemoryLink::new("Udp");
    let (mut downlink, bus) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    let mut headless = run_on(Some("alpha"), 0);
    assert!(headless.remove(key::IDENTITY));
    assert!(headless.remove(key::KIND));
    wire.inject(&seal(headless));
    router.tick();

    assert_eq!(alpha_runs.get(), 0);
    assert!(wire.take_sent().is_empty());
    assert!(bus.take_sent().is_empty());
}

#[test]
fn test_replayed_call_is_dropped_and_counted() {
    const D: u16 = 5;
    const T0: u16 = 500;
    const L0: u32 = 9_000;
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let runs = alpha.runs.clone();
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut downlink, down) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(D));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    for (remote, local) in [
        (T0, L0),
        (T0 + D + 1, L0 + u32::from(D) + 1),
        (T0 + 1, L0 + 2 * (u32::from(D) + 1)),
    ] {
        clock.set(local);
        up.inject(&seal(run_on(Some("alpha"), remote)));
        router.tick();
    }

    assert_eq!(runs.get(), 2);
    assert_eq!(router.drops(), 1);
    assert_eq!(up.take_sent().len(), 2);
    assert!(down.take_sent().is_empty());
}

#[test]
fn test_local_post_never_touches_a_transport() {
    let clock = TickClock::new();
    let mut alpha = Probe {
        loop_post: Some((MessageKind::Talk, Some("beta"), Origin::Local)),
        ..Probe::default()
    };
    let mut beta = Probe::default();
    let (alpha_echoes, beta_echoes) = (alpha.echoes.clone(), beta.echoes.clone());
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut downlink, down) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(5));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_talker(Talker::new("beta", "Porch light", &mut beta).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    router.tick();
    assert_eq!(router.pending(), 1);
    router.tick();
    assert_eq!(router.pending(), 0);

    let echoes = alpha_echoes.borrow();
    assert_eq!(echoes.len(), 1);
    assert_eq!(echoes[0].from(), Some("beta"));
    assert_eq!(echoes[0].string(key::data(0)), Some("Porch light"));
    assert!(beta_echoes.borrow().is_empty());
    assert!(up.take_sent().is_empty());
    assert!(down.take_sent().is_empty());
}

#[test]
fn test_loopback_reaches_only_the_poster() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let mut beta = Probe::default();
    let (alpha_echoes, beta_echoes) = (alpha.echoes.clone(), beta.echoes.clone());
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut downlink, down) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(5));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_talker(Talker::new("beta", "", &mut beta).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();

    let mut probe = request(MessageKind::Run, Some("alpha"), 10);
    assert!(probe.set_string(key::data(0), "probe"));
    up.inject(&seal(probe));
    router.tick();
    router.tick();

    // The call answered itself through a looped-back PING
    assert!(up.take_sent().is_empty());
    assert!(down.take_sent().is_empty());
    let echoes = alpha_echoes.borrow();
    assert_eq!(echoes.len(), 1);
    assert_eq!(echoes[0].get_number(key::ORIGINAL), Some(MessageKind::Ping as u32));
    assert_eq!(echoes[0].from(), Some("alpha"));
    assert!(beta_echoes.borrow().is_empty());
}

#[test]
fn test_remote_post_goes_out_on_every_link() {
    let clock = TickClock::new();
    let mut alpha = Probe {
        loop_post: Some((MessageKind::Talk, None, Origin::Remote)),
        ..Probe::default()
    };
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut downlink, down) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(5));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut downlink).unwrap();
    router.tick();

    for wire in [&up, &down] {
        let sent = wire.take_sent();
        assert_eq!(sent.len(), 1);
        let mut message = parse(&sent[0]);
        assert!(message.verify_checksum());
        assert_eq!(message.kind(), MessageKind::Talk);
        assert_eq!(message.from(), Some("alpha"));
    }
}

#[test]
fn test_forwarding_never_returns_to_the_source() {
    let clock = TickClock::new();
    let (mut uplink, up) = MemoryLink::new("Udp");
    let (mut first, spi0) = MemoryLink::new("Spi");
    let (mut second, spi1) = MemoryLink::new("Spi");

    let mut router: Router = BroadcastRouter::new(&clock, config(0));
    router.add_uplink(&mut uplink).unwrap();
    router.add_downlink(&mut first).unwrap();
    router.add_downlink(&mut second).unwrap();

    let bytes = seal(run_on(Some("faraway"), 10));
    spi0.inject(&bytes);
    router.tick();
    assert_eq!(up.take_sent(), vec![bytes.clone()]);
    assert_eq!(spi1.take_sent(), vec![bytes.clone()]);
    assert!(spi0.take_sent().is_empty());

    up.inject(&bytes);
    router.tick();
    assert!(up.take_sent().is_empty());
    assert_eq!(spi0.take_sent(), vec![bytes.clone()]);
    assert_eq!(spi1.take_sent(), vec![bytes]);
}

#[test]
fn test_sys_reports_the_arrival_link() {
    let clock = TickClock::new();
    let mut alpha = Probe::default();
    let (mut uplink, wire) = MemoryLink::new("EthernetUdp");

    let mut router: Router = BroadcastRouter::new(&clock, config(7));
    router.add_talker(Talker::new("alpha", "", &mut alpha).unwrap()).unwrap();
    router.add_uplink(&mut uplink).unwrap();

    for (code, expected) in [
        (SysCode::Socket, Value::Str("EthernetUdp")),
        (SysCode::Board, Value::Str("TestBoard")),
        (SysCode::Delay, Value::Number(7)),
        (SysCode::Manifesto, Value::Str("Probe")),
    ] {
        let mut sys = request(MessageKind::Sys, Some("alpha"), 10);
        assert!(sys.set_number(key::SUB_CODE, code as u32));
        wire.inject(&seal(sys));
        router.tick();
        let sent = wire.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(parse(&sent[0]).value(key::data(0)), Some(expected));
    }
}

#[test]
fn test_capacity_errors() {
    let clock = TickClock::new();
    let mut probes: [Probe; 2] = Default::default();
    let [first, second] = &mut probes;
    let (mut a, _) = MemoryLink::new("Udp");
    let (mut b, _) = MemoryLink::new("Udp");

    let mut router: BroadcastRouter<&TickClock, 1, 1, 1> = BroadcastRouter::new(&clock, config(0));
    router.add_talker(Talker::new("one", "", first).unwrap()).unwrap();
    assert_eq!(
        router.add_talker(Talker::new("two", "", second).unwrap()),
        Err(TalkieError::TalkerLimitReached { max_talkers: 1 })
    );
    assert_eq!(router.add_uplink(&mut a), Ok(LinkId::uplink(0)));
    assert_eq!(
        router.add_uplink(&mut b),
        Err(TalkieError::LinkLimitReached { max_links: 1 })
    );
}

#[test]
fn test_local_bus_bridges_two_routers() {
    let clock = TickClock::new();
    let mut lamp = Probe::default();
    let lamp_runs = lamp.runs.clone();
    let (mut uplink, wire) = MemoryLink::new("Udp");
    let mut bus = LocalBus::<4>::new();
    let (mut host_port, mut node_port) = bus.split();

    let mut host: Router = BroadcastRouter::new(&clock, config(0));
    host.add_uplink(&mut uplink).unwrap();
    assert_eq!(host.add_downlink(&mut host_port), Ok(LinkId::downlink(0)));

    let mut node: Router = BroadcastRouter::new(&clock, config(0));
    node.add_talker(Talker::new("lamp", "", &mut lamp).unwrap()).unwrap();
    node.add_uplink(&mut node_port).unwrap();
    assert_eq!(node.status(Some(LinkId::uplink(0))).socket, "LocalBus");

    wire.inject(&seal(run_on(Some("lamp"), 10)));
    host.tick();
    assert!(wire.take_sent().is_empty());
    node.tick();
    assert_eq!(lamp_runs.get(), 1);
    host.tick();

    let sent = wire.take_sent();
    assert_eq!(sent.len(), 1);
    let mut reply = parse(&sent[0]);
    assert!(reply.verify_checksum());
    assert_eq!(reply.kind(), MessageKind::Echo);
    assert_eq!(reply.from(), Some("lamp"));
    assert_eq!(reply.to(), Some(Value::Str("caller")));
    assert_eq!(reply.ack(), Some(Ack::Roger));
    assert_eq!(reply.identity(), Some(10));
}
