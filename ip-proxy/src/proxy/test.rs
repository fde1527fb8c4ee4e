#![cfg(test)]

use std::{
    collections::HashMap,
    net::Ipv4Addr,
    sync::Arc,
    thread,
};

use chrono::NaiveTime;
use ip_proxy_common::{
    Country, Direction, Mark, Protocol, Queue, Reputation, SignatureIndex, Verdict, Zone,
};

use super::{IpProxy, ProxyStats};
use crate::{
    classifier::Signatures,
    config::ProxyConfig,
    policy::Policy,
    restrict::{LanRestriction, RestrictionWindow},
    test_packet::{Command, CountingClassifier, MemorySink, RecordingTerminator, TestPacket},
    Error,
};

type TestProxy<C = Signatures> = IpProxy<Arc<RecordingTerminator>, Arc<MemorySink>, C>;

fn geo_signatures() -> Signatures {
    Signatures::new(
        SignatureIndex::new([(1000, 2000, 840)]).unwrap(),
        SignatureIndex::new([(3000, 3999, 31)]).unwrap(),
    )
}

fn proxy_with(
    signatures: Signatures,
    policy: Policy,
) -> (TestProxy, Arc<RecordingTerminator>, Arc<MemorySink>) {
    let terminator = Arc::new(RecordingTerminator::default());
    let sink = Arc::new(MemorySink::default());
    let proxy = IpProxy::new(signatures, policy, terminator.clone(), sink.clone());
    (proxy, terminator, sink)
}

#[test]
fn blocked_country_on_wan_is_deferred_to_ips() {
    let policy = Policy {
        geolocation: HashMap::from([(Country::UnitedStates, Direction::Inbound)]),
        ..Default::default()
    };
    let (proxy, terminator, sink) = proxy_with(geo_signatures(), policy);
    let mut packet = TestPacket::new(Zone::Wan, Direction::Inbound, 1500);

    proxy.handle(&mut packet);

    assert_eq!(
        packet.commands,
        vec![Command::Mark(Mark::IpProxyDrop), Command::Forward(Queue::IpsIds)]
    );
    assert_eq!(terminator.calls(), 1);

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1.verdict, Verdict::Drop);
    assert_eq!(entries[0].1.country, Country::UnitedStates);
    assert_eq!(entries[0].0.zone, Zone::Wan);
}

#[test]
fn direction_mismatch_passes_to_ips() {
    let policy = Policy {
        geolocation: HashMap::from([(Country::UnitedStates, Direction::Inbound)]),
        ..Default::default()
    };
    let (proxy, terminator, sink) = proxy_with(geo_signatures(), policy);
    let mut packet = TestPacket::new(Zone::Wan, Direction::Outbound, 1500);

    proxy.handle(&mut packet);

    assert_eq!(
        packet.commands,
        vec![Command::Mark(Mark::SendToIps), Command::Forward(Queue::IpsIds)]
    );
    assert_eq!(terminator.calls(), 0);
    assert_eq!(sink.entries.lock().unwrap()[0].1.reputation_name(), "DNL");
}

#[test]
fn tor_scenario_from_config() {
    let config = ProxyConfig::from_json(
        r#"{
            "reputation": { "enabled": true, "groups": { "TOR": "outbound" } },
            "tor_whitelist": ["192.168.1.20"]
        }"#,
    )
    .unwrap();
    let terminator = Arc::new(RecordingTerminator::default());
    let sink = Arc::new(MemorySink::default());
    let proxy: TestProxy =
        IpProxy::from_config(&config, geo_signatures(), terminator.clone(), sink.clone()).unwrap();

    let mut blocked = TestPacket::new(Zone::Lan, Direction::Outbound, 3500)
        .with_local(Ipv4Addr::new(192, 168, 1, 30))
        .with_protocol(Protocol::Udp);
    proxy.handle(&mut blocked);
    assert_eq!(blocked.commands, vec![Command::Discard]);
    assert_eq!(terminator.calls(), 1);

    let mut allowed = TestPacket::new(Zone::Lan, Direction::Outbound, 3500)
        .with_local(Ipv4Addr::new(192, 168, 1, 20));
    proxy.handle(&mut allowed);
    assert_eq!(
        allowed.commands,
        vec![Command::Mark(Mark::LanZoneFirewall), Command::Repeat]
    );

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries[1].1.reputation, Some(Reputation::TorEntry));
    assert_eq!(
        proxy.stats(),
        ProxyStats {
            inspected: 2,
            accepted: 1,
            dropped: 1,
            restricted: 0,
            disposition_failures: 0,
        }
    );
}

fn active_restriction() -> Arc<LanRestriction> {
    let start = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
    let restriction = LanRestriction::new(Some(RestrictionWindow::new(start, 480).unwrap()));
    restriction.refresh_at(NaiveTime::from_hms_opt(23, 0, 0).unwrap());
    Arc::new(restriction)
}

#[test]
fn restricted_lan_packet_is_never_classified() {
    let classifier = CountingClassifier::new(geo_signatures());
    let terminator = Arc::new(RecordingTerminator::default());
    let sink = Arc::new(MemorySink::default());
    let proxy: TestProxy<CountingClassifier> = IpProxy::new(
        classifier,
        Policy::default(),
        terminator.clone(),
        sink.clone(),
    )
    .with_restriction(active_restriction());
    let mut packet = TestPacket::new(Zone::Lan, Direction::Outbound, 1500);

    proxy.handle(&mut packet);

    assert_eq!(packet.commands, vec![Command::Discard]);
    assert_eq!(proxy.signatures().load().lookups(), 0);
    assert_eq!(terminator.calls(), 0);
    assert!(sink.entries.lock().unwrap().is_empty());
    assert_eq!(proxy.stats().restricted, 1);
    assert_eq!(proxy.stats().inspected, 0);
}

#[test]
fn restriction_spares_whitelisted_and_wan() {
    let policy = Policy {
        ip_whitelist: [Ipv4Addr::new(192, 168, 1, 50)].into(),
        ..Default::default()
    };
    let (proxy, _, _) = proxy_with(geo_signatures(), policy);
    let proxy = proxy.with_restriction(active_restriction());

    let mut whitelisted = TestPacket::new(Zone::Lan, Direction::Outbound, 9000);
    proxy.handle(&mut whitelisted);
    assert_eq!(whitelisted.dispositions(), vec![Command::Repeat]);

    let mut wan = TestPacket::new(Zone::Wan, Direction::Inbound, 9000)
        .with_source(Ipv4Addr::new(198, 51, 100, 7));
    proxy.handle(&mut wan);
    assert_eq!(wan.dispositions(), vec![Command::Forward(Queue::IpsIds)]);
}

#[test]
fn rejected_disposition_is_counted_and_logged() {
    let (proxy, _, sink) = proxy_with(geo_signatures(), Policy::default());
    let mut packet = TestPacket::new(Zone::Dmz, Direction::Inbound, 9000).rejecting_commands();

    proxy.handle(&mut packet);

    assert_eq!(proxy.stats().disposition_failures, 1);
    assert_eq!(sink.entries.lock().unwrap().len(), 1);
}

#[test]
fn invalid_config_keeps_current_policy() {
    let policy = Policy {
        geolocation: HashMap::from([(Country::UnitedStates, Direction::Both)]),
        ..Default::default()
    };
    let (proxy, _, sink) = proxy_with(geo_signatures(), policy.clone());
    let config = ProxyConfig::from_json(
        r#"{ "time_restriction": { "enabled": true, "start": "7pm", "length_minutes": 60 } }"#,
    )
    .unwrap();

    let result = proxy.reload_config(&config);

    assert!(matches!(result, Err(Error::InvalidWindow(_))));
    assert_eq!(*proxy.policy().load(), policy);
    assert_eq!(sink.reload_failures.lock().unwrap().len(), 1);
}

#[test]
fn missing_config_file_is_reported() {
    let (proxy, _, sink) = proxy_with(geo_signatures(), Policy::default());

    let result = proxy.reload_config_from_path("/nonexistent/ip_proxy.json");

    assert!(matches!(result, Err(Error::Io(_))));
    assert_eq!(sink.reload_failures.lock().unwrap().len(), 1);
}

#[test]
fn valid_config_replaces_policy_and_window() {
    let (proxy, _, _) = proxy_with(geo_signatures(), Policy::default());
    let config = ProxyConfig::from_json(
        r#"{
            "geolocation": { "countries": { "UNITED_STATES": "both" } },
            "time_restriction": { "enabled": true, "start": "01:00", "length_minutes": 30 }
        }"#,
    )
    .unwrap();

    proxy.reload_config(&config).unwrap();

    let packet = TestPacket::new(Zone::Wan, Direction::Outbound, 1500);
    assert_eq!(proxy.inspect(&packet).verdict, Verdict::Drop);
    assert!(proxy.restriction().window().is_some());
}

#[test]
fn dry_inspection_is_not_counted() {
    let policy = Policy {
        geolocation: HashMap::from([(Country::UnitedStates, Direction::Both)]),
        ..Default::default()
    };
    let (proxy, terminator, sink) = proxy_with(geo_signatures(), policy);
    let packet = TestPacket::new(Zone::Wan, Direction::Inbound, 1500);

    assert_eq!(proxy.inspect(&packet).verdict, Verdict::Drop);
    assert_eq!(proxy.inspect(&packet).verdict, Verdict::Drop);

    assert_eq!(proxy.stats(), ProxyStats::default());
    assert!(packet.commands.is_empty());
    assert_eq!(terminator.calls(), 0);
    assert!(sink.entries.lock().unwrap().is_empty());
}

#[test]
fn failed_signature_reload_keeps_tables() {
    let (proxy, _, sink) = proxy_with(geo_signatures(), Policy::default());

    let result = proxy.reload_signatures(|| {
        Ok(Signatures::new(
            SignatureIndex::new([(5, 1, 840)])?,
            SignatureIndex::default(),
        ))
    });

    assert!(matches!(result, Err(Error::Signature(_))));
    let packet = TestPacket::new(Zone::Wan, Direction::Inbound, 1500);
    assert_eq!(proxy.inspect(&packet).country, Country::UnitedStates);
    assert_eq!(sink.reload_failures.lock().unwrap().len(), 1);
}

#[test]
fn workers_see_whole_snapshots_during_reload() {
    // both tables cover key 1500, only RUSSIA is blocked
    let united_states = || {
        Signatures::new(
            SignatureIndex::new([(1000, 2000, 840)]).unwrap(),
            SignatureIndex::default(),
        )
    };
    let russia = || {
        Signatures::new(
            SignatureIndex::new([(0, 999, 840), (1000, 2000, 643)]).unwrap(),
            SignatureIndex::default(),
        )
    };
    let policy = Policy {
        geolocation: HashMap::from([(Country::Russia, Direction::Both)]),
        ..Default::default()
    };
    let (proxy, _, sink) = proxy_with(united_states(), policy);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..500 {
                    let mut packet = TestPacket::new(Zone::Wan, Direction::Inbound, 1500);
                    proxy.handle(&mut packet);
                    assert_eq!(packet.dispositions(), vec![Command::Forward(Queue::IpsIds)]);
                }
            });
        }
        scope.spawn(|| {
            for i in 0..200 {
                let next = if i % 2 == 0 { russia() } else { united_states() };
                proxy.reload_signatures(|| Ok(next)).unwrap();
            }
        });
    });

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 2000);
    for (_, result) in entries.iter() {
        match result.country {
            Country::Russia => assert_eq!(result.verdict, Verdict::Drop),
            Country::UnitedStates => assert_eq!(result.verdict, Verdict::Accept),
            other => panic!("key 1500 classified as {other}"),
        }
    }
    let stats = proxy.stats();
    assert_eq!(stats.inspected, 2000);
    assert_eq!(stats.accepted + stats.dropped, 2000);
    assert_eq!(stats.disposition_failures, 0);
}
