//! End-to-end scenarios for the sans-IO client: connection bring-up, channel
//! convergence, listen deltas, voice targets, ping health, and the UDP
//! fallback switch. Each test drives the state machine with explicit event
//! sequences and asserts on the emitted actions.

use sotto_core::{Client, ClientAction, ClientEvent, VoiceTargetConfig};
use sotto_crypto::CryptState;
use sotto_proto::{mumble, ControlMessage, voice};

const KEY: [u8; 16] = [0x07; 16];
const CLIENT_NONCE: [u8; 16] = [0x01; 16];
const SERVER_NONCE: [u8; 16] = [0x02; 16];

fn control(client: &mut Client, message: ControlMessage, now_ms: u64) -> Vec<ClientAction> {
    client.handle(ClientEvent::Control { message, now_ms })
}

fn tick(client: &mut Client, now_ms: u64) -> Vec<ClientAction> {
    client.handle(ClientEvent::Tick { now_ms })
}

/// Bring a client to the activated, synced state with one known channel map.
fn connected_client(session: u32, channels: &[(u32, &str)]) -> Client {
    let mut client = Client::new();
    client.handle(ClientEvent::ConnectRequested { username: "alice".into() });
    client.handle(ClientEvent::TlsActivated { now_ms: 0 });

    for &(id, name) in channels {
        control(
            &mut client,
            ControlMessage::ChannelState(mumble::ChannelState {
                channel_id: Some(id),
                name: Some(name.to_string()),
                ..Default::default()
            }),
            0,
        );
    }

    control(
        &mut client,
        ControlMessage::ServerSync(mumble::ServerSync {
            session: Some(session),
            ..Default::default()
        }),
        0,
    );

    client
}

/// Install UDP crypto on the client and return the server-side peer state.
fn install_crypto(client: &mut Client) -> CryptState {
    control(
        client,
        ControlMessage::CryptSetup(mumble::CryptSetup {
            key: Some(KEY.to_vec()),
            client_nonce: Some(CLIENT_NONCE.to_vec()),
            server_nonce: Some(SERVER_NONCE.to_vec()),
        }),
        0,
    );

    // The peer encrypts with our decrypt nonce and vice versa.
    let mut server = CryptState::new();
    server.install(&KEY, &SERVER_NONCE, &CLIENT_NONCE).unwrap();
    server
}

fn sent_user_states(actions: &[ClientAction]) -> Vec<mumble::UserState> {
    actions
        .iter()
        .filter_map(|a| match a {
            ClientAction::SendControl(ControlMessage::UserState(s)) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

fn sent_channel_states(actions: &[ClientAction]) -> Vec<mumble::ChannelState> {
    actions
        .iter()
        .filter_map(|a| match a {
            ClientAction::SendControl(ControlMessage::ChannelState(s)) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

fn crypt_requests(actions: &[ClientAction]) -> usize {
    actions
        .iter()
        .filter(|a| matches!(a, ClientAction::SendControl(ControlMessage::CryptSetup(_))))
        .count()
}

#[test]
fn happy_path_join_converges() {
    let mut client = connected_client(1, &[(0, "Root"), (7, "Lobby")]);

    // The server places us in Root after sync.
    control(
        &mut client,
        ControlMessage::UserState(mumble::UserState {
            session: Some(1),
            name: Some("alice".into()),
            channel_id: Some(0),
            ..Default::default()
        }),
        0,
    );

    client.handle(ClientEvent::SetChannel("Lobby".into()));

    let actions = tick(&mut client, 100_000);
    let moves = sent_user_states(&actions);
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].session, Some(1));
    assert_eq!(moves[0].channel_id, Some(7));

    // Server acknowledges the move. Self-channel tracking runs after the
    // diff, so one tick may repeat the (idempotent) move before the
    // acknowledged name settles; after that the reconciler stays quiet.
    control(
        &mut client,
        ControlMessage::UserState(mumble::UserState {
            session: Some(1),
            channel_id: Some(7),
            ..Default::default()
        }),
        100_100,
    );

    tick(&mut client, 100_500);
    let actions = tick(&mut client, 101_000);
    assert!(sent_user_states(&actions).iter().all(|s| s.channel_id.is_none()));
    assert!(sent_channel_states(&actions).is_empty());
}

#[test]
fn one_move_per_change_without_server_echo() {
    // Channel map known, but the server never mirrors our own user entry;
    // a single change emits exactly one move and then goes quiet.
    let mut client = connected_client(1, &[(7, "Lobby")]);
    client.handle(ClientEvent::SetChannel("Lobby".into()));

    let first = tick(&mut client, 1_000_000);
    assert_eq!(sent_user_states(&first).len(), 1);

    let second = tick(&mut client, 1_000_500);
    assert!(sent_user_states(&second).is_empty());
}

#[test]
fn create_on_join_retries_until_channel_exists() {
    let mut client = connected_client(1, &[(0, "Root")]);

    control(
        &mut client,
        ControlMessage::UserState(mumble::UserState {
            session: Some(1),
            channel_id: Some(0),
            ..Default::default()
        }),
        0,
    );

    client.handle(ClientEvent::SetChannel("Squad7".into()));

    // Unknown name: the first tick asks the server to create it.
    let actions = tick(&mut client, 10_000);
    let creates = sent_channel_states(&actions);
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].name.as_deref(), Some("Squad7"));
    assert_eq!(creates[0].parent, Some(0));
    assert_eq!(creates[0].temporary, Some(true));
    assert!(sent_user_states(&actions).is_empty());

    // The server creates id 42; the next tick joins it.
    control(
        &mut client,
        ControlMessage::ChannelState(mumble::ChannelState {
            channel_id: Some(42),
            name: Some("Squad7".into()),
            ..Default::default()
        }),
        10_100,
    );

    let actions = tick(&mut client, 10_500);
    let moves = sent_user_states(&actions);
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].channel_id, Some(42));
}

#[test]
fn listen_changes_collapse_to_net_delta() {
    let mut client = connected_client(1, &[(10, "A"), (11, "B")]);

    client.handle(ClientEvent::AddListenChannel("A".into()));
    client.handle(ClientEvent::AddListenChannel("B".into()));
    client.handle(ClientEvent::RemoveListenChannel("A".into()));

    let actions = tick(&mut client, 10_000);
    let updates: Vec<_> = sent_user_states(&actions)
        .into_iter()
        .filter(|s| !s.listening_channel_add.is_empty() || !s.listening_channel_remove.is_empty())
        .collect();

    // A was never sent to the server, so only B's add goes out.
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].listening_channel_add, vec![11]);
    assert!(updates[0].listening_channel_remove.is_empty());

    // Nothing further once acknowledged state matches.
    let actions = tick(&mut client, 10_500);
    assert!(sent_user_states(&actions)
        .iter()
        .all(|s| s.listening_channel_add.is_empty() && s.listening_channel_remove.is_empty()));
}

#[test]
fn unresolved_listen_add_retries_after_channel_appears() {
    let mut client = connected_client(1, &[(10, "A")]);

    client.handle(ClientEvent::AddListenChannel("Later".into()));

    let actions = tick(&mut client, 10_000);
    assert!(sent_user_states(&actions).is_empty());

    control(
        &mut client,
        ControlMessage::ChannelState(mumble::ChannelState {
            channel_id: Some(20),
            name: Some("Later".into()),
            ..Default::default()
        }),
        10_100,
    );

    let actions = tick(&mut client, 10_500);
    let updates = sent_user_states(&actions);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].listening_channel_add, vec![20]);
}

proptest::proptest! {
    /// For any interleaving of listen add/remove calls and ticks, the
    /// deltas put on the wire converge the server's view to the
    /// application's final listen set.
    #[test]
    fn listen_deltas_converge_under_arbitrary_interleaving(
        script in proptest::collection::vec(
            (proptest::bool::ANY, 0usize..4, proptest::bool::ANY),
            0..32,
        ),
    ) {
        let names = ["a", "b", "c", "d"];
        let mut client = connected_client(1, &[(1, "a"), (2, "b"), (3, "c"), (4, "d")]);

        // The server applies every delta we send; its view must converge
        // to whatever the application last requested.
        let mut server_view = std::collections::BTreeSet::new();
        let mut desired = std::collections::BTreeSet::new();

        let mut apply = |client: &mut Client, server_view: &mut std::collections::BTreeSet<String>, now| {
            for state in sent_user_states(&tick(client, now)) {
                for id in state.listening_channel_add {
                    server_view.insert(names[(id - 1) as usize].to_string());
                }
                for id in state.listening_channel_remove {
                    server_view.remove(names[(id - 1) as usize]);
                }
            }
        };

        let mut now = 10_000;
        for (add, index, tick_after) in script {
            let name = names[index];
            if add {
                client.handle(ClientEvent::AddListenChannel(name.into()));
                desired.insert(name.to_string());
            } else {
                client.handle(ClientEvent::RemoveListenChannel(name.into()));
                desired.remove(name);
            }

            if tick_after {
                apply(&mut client, &mut server_view, now);
            }
            now += 10_000;
        }

        apply(&mut client, &mut server_view, now);
        proptest::prop_assert_eq!(server_view, desired);
    }
}

#[test]
fn voice_target_flush_builds_subtargets() {
    let mut client = connected_client(1, &[(10, "A"), (11, "B")]);

    for (session, name) in [(2, "bob"), (3, "carol")] {
        control(
            &mut client,
            ControlMessage::UserState(mumble::UserState {
                session: Some(session),
                name: Some(name.into()),
                ..Default::default()
            }),
            0,
        );
    }

    let config = VoiceTargetConfig {
        users: ["bob", "carol", "ghost"].into_iter().map(String::from).collect(),
        channels: ["A", "B", "missing"].into_iter().map(String::from).collect(),
    };
    client.handle(ClientEvent::UpdateVoiceTarget { index: 3, config });

    let actions = tick(&mut client, 10_000);
    let targets: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            ClientAction::SendControl(ControlMessage::VoiceTarget(t)) => Some(t.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(targets.len(), 1);
    let target = &targets[0];
    assert_eq!(target.id, Some(3));

    // One sub-target for all resolved users, one per resolved channel.
    assert_eq!(target.targets.len(), 3);
    let mut sessions = target.targets[0].session.clone();
    sessions.sort_unstable();
    assert_eq!(sessions, vec![2, 3]);
    assert_eq!(target.targets[1].channel_id, Some(10));
    assert_eq!(target.targets[2].channel_id, Some(11));

    // The pending map drains exactly once.
    let actions = tick(&mut client, 10_500);
    assert!(!actions
        .iter()
        .any(|a| matches!(a, ClientAction::SendControl(ControlMessage::VoiceTarget(_)))));
}

#[test]
fn udp_ping_round_trip_updates_statistics() {
    let mut client = connected_client(1, &[(0, "Root")]);
    let mut server = install_crypto(&mut client);

    // Tick at t=1000 emits an encrypted UDP ping carrying the clock.
    let actions = tick(&mut client, 1000);
    let datagram = actions
        .iter()
        .find_map(|a| match a {
            ClientAction::SendDatagram(d) => Some(d.clone()),
            _ => None,
        })
        .expect("tick should emit a udp ping");

    let plain = server.decrypt(&datagram).expect("server should decrypt our ping");
    assert_eq!(voice::parse(&plain), Some(voice::VoicePacket::Ping { timestamp: 1000 }));

    // The server echoes it; it lands 50 ms later.
    let echo = server.encrypt(&plain).unwrap();
    client.handle(ClientEvent::Datagram { data: echo, now_ms: 1050 });

    let stats = client.udp_ping();
    assert_eq!(stats.count(), 1);
    assert!((stats.average() - 50.0).abs() < f32::EPSILON);
    assert_eq!(stats.variance(), 0.0);
}

#[test]
fn crypt_resync_requests_are_rate_limited() {
    let mut client = connected_client(1, &[(0, "Root")]);
    let _server = install_crypto(&mut client);

    let garbage = vec![0xFF; 32];

    // First failure requests a resync immediately.
    let actions = client.handle(ClientEvent::Datagram { data: garbage.clone(), now_ms: 0 });
    assert_eq!(crypt_requests(&actions), 1);

    // Within the gate interval the request is suppressed.
    let actions = client.handle(ClientEvent::Datagram { data: garbage.clone(), now_ms: 500 });
    assert_eq!(crypt_requests(&actions), 0);

    // Past the gate a new failure requests again.
    let actions = client.handle(ClientEvent::Datagram { data: garbage, now_ms: 1100 });
    assert_eq!(crypt_requests(&actions), 1);
}

#[test]
fn ping_loss_forces_exactly_one_reconnect() {
    let mut client = connected_client(1, &[(0, "Root")]);

    let mut reconnects = 0;
    let mut reconnect_at = 0;
    for step in 1u64..=60 {
        let now = step * 500;
        for action in tick(&mut client, now) {
            if action == ClientAction::Reconnect {
                reconnects += 1;
                reconnect_at = now;
            }
        }
    }

    assert_eq!(reconnects, 1);
    // Four unanswered pings accumulate quickly, but the reset waits out the
    // twenty-second grace period.
    assert!(reconnect_at > 20_000);
    assert!(!client.connected());

    // A dead connection stays quiet until reactivation.
    assert!(tick(&mut client, 40_000).is_empty());
}

#[test]
fn server_pings_keep_the_connection_alive() {
    let mut client = connected_client(1, &[(0, "Root")]);

    for step in 1u64..=60 {
        let now = step * 500;
        let actions = tick(&mut client, now);
        assert!(actions.iter().all(|a| *a != ClientAction::Reconnect));

        // Server answers every control ping.
        if actions
            .iter()
            .any(|a| matches!(a, ClientAction::SendControl(ControlMessage::Ping(_))))
        {
            control(
                &mut client,
                ControlMessage::Ping(mumble::Ping {
                    timestamp: Some(now),
                    ..Default::default()
                }),
                now + 20,
            );
        }
    }

    assert!(client.connected());
    assert!(client.tcp_ping().count() > 0);
}

#[test]
fn udp_fallback_switches_once_and_recovers() {
    let mut client = connected_client(1, &[(0, "Root")]);
    let mut server = install_crypto(&mut client);

    // Prove the UDP path: several good decrypts on both sides.
    for i in 0u8..5 {
        let echo = server.encrypt(&voice::encode_ping(u64::from(i))).unwrap();
        client.handle(ClientEvent::Datagram { data: echo, now_ms: 100 + u64::from(i) });
    }
    control(
        &mut client,
        ControlMessage::Ping(mumble::Ping { good: Some(5), ..Default::default() }),
        200,
    );
    assert!(client.has_udp());

    // After the grace period the server reports it stopped hearing us.
    control(
        &mut client,
        ControlMessage::Ping(mumble::Ping { good: Some(0), ..Default::default() }),
        25_000,
    );
    assert!(!client.has_udp());

    // Repeated bad reports do not flap anything.
    control(
        &mut client,
        ControlMessage::Ping(mumble::Ping { good: Some(0), ..Default::default() }),
        26_000,
    );
    assert!(!client.has_udp());

    // Voice now rides the TCP tunnel.
    let frame = voice::encode_opus(0, 1, b"opus", false, None).unwrap();
    let actions = client.handle(ClientEvent::SendVoice { data: frame.clone() });
    assert!(matches!(
        &actions[..],
        [ClientAction::SendControl(ControlMessage::UdpTunnel(data))] if data[..] == frame[..]
    ));

    // Both sides healthy again: back to UDP, and sends encrypt.
    control(
        &mut client,
        ControlMessage::Ping(mumble::Ping { good: Some(5), ..Default::default() }),
        27_000,
    );
    assert!(client.has_udp());

    let actions = client.handle(ClientEvent::SendVoice { data: frame.clone() });
    match &actions[..] {
        [ClientAction::SendDatagram(wire)] => {
            assert_eq!(wire.len(), frame.len() + 4);
            assert_eq!(server.decrypt(wire).unwrap(), frame);
        }
        other => panic!("expected an encrypted datagram, got {other:?}"),
    }
}

#[test]
fn tick_before_activation_does_nothing() {
    let mut client = Client::new();
    client.handle(ClientEvent::ConnectRequested { username: "alice".into() });

    assert!(tick(&mut client, 1000).is_empty());
    assert!(!client.connected());
}

#[test]
fn talkers_include_self_only_when_talking() {
    let mut client = connected_client(1, &[(0, "Root")]);
    control(
        &mut client,
        ControlMessage::UserState(mumble::UserState {
            session: Some(2),
            name: Some("bob".into()),
            ..Default::default()
        }),
        0,
    );

    assert_eq!(client.talker_names(&[2], false), vec!["bob".to_string()]);
    assert_eq!(
        client.talker_names(&[2], true),
        vec!["bob".to_string(), "alice".to_string()]
    );
    // Unknown sessions are skipped.
    assert_eq!(client.talker_names(&[9], false), Vec::<String>::new());
}
