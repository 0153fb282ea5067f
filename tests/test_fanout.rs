//! Fan-out engine: coverage, ordering and the in-flight bound.

mod common;

use std::time::Duration;

use statusdeck::registry::{Registry, RegistryEntry};
use statusdeck::status::Indicator;

use common::Upstream;

const CAP: Duration = Duration::from_millis(300);

fn statuspage(upstream: &Upstream, kind: &str, name: &str) -> RegistryEntry {
    let path = format!("{kind}/{}/api/v2/summary.json", name.to_lowercase().replace(' ', "-"));
    RegistryEntry::new(name, upstream.url(&path), "Infra", None)
}

#[tokio::test]
async fn single_statuspage_entry() {
    let upstream = Upstream::start().await;
    let entries = vec![statuspage(&upstream, "ok", "Acme")];

    let results = common::fanout(5, CAP).fetch_all(&entries).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Acme");
    assert_eq!(results[0].status.indicator, Indicator::None);
    assert_eq!(results[0].status.description, "All Systems Operational");
    assert!(results[0].components.is_empty());
}

#[tokio::test]
async fn external_entry_makes_no_calls() {
    let upstream = Upstream::start().await;
    let entries = vec![RegistryEntry::new("Beta", upstream.url("ok/beta"), "Dev", Some("custom"))];

    let results = common::fanout(5, CAP).fetch_all(&entries).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status.indicator, Indicator::External);
    assert_eq!(results[0].status.description, "External status page");
    assert!(results[0].components.is_empty());
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn event_list_entry_reports_only_active_events() {
    let upstream = Upstream::start().await;
    let entries = vec![RegistryEntry::new("Hotmart", upstream.url("events/h"), "Payments", Some("hotmart"))];

    let results = common::fanout(5, CAP).fetch_all(&entries).await;

    assert_eq!(results[0].status.indicator, Indicator::Major);
    assert_eq!(results[0].status.description, "Checkout unavailable");
}

#[tokio::test]
async fn timed_out_entry_becomes_error_record() {
    let upstream = Upstream::start().await;
    let entries = vec![statuspage(&upstream, "slow", "Sloth")];

    let started = std::time::Instant::now();
    let results = common::fanout(5, Duration::from_millis(200)).fetch_all(&entries).await;

    assert!(started.elapsed() < common::SLOW_ROUTE_DELAY);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status.indicator, Indicator::Error);
    assert_eq!(results[0].status.description, "Error fetching status");
    assert!(results[0].components.is_empty());
}

#[tokio::test]
async fn every_entry_yields_one_record_under_total_failure() {
    let upstream = Upstream::start().await;
    let kinds = ["fail", "garbage", "html", "slow"];
    let entries: Vec<RegistryEntry> = (0..12)
        .map(|i| statuspage(&upstream, kinds[i % kinds.len()], &format!("svc-{i:02}")))
        .collect();

    let results = common::fanout(4, CAP).fetch_all(&entries).await;

    assert_eq!(results.len(), entries.len());
    assert!(results.iter().all(|r| r.status.indicator == Indicator::Error));
}

#[tokio::test]
async fn results_are_sorted_and_repeatable() {
    let upstream = Upstream::start().await;
    let entries = vec![
        statuspage(&upstream, "ok", "zeta"),
        statuspage(&upstream, "minor", "Alpha"),
        RegistryEntry::new("beta", upstream.url("ok/beta"), "Dev", Some("apple")),
        statuspage(&upstream, "fail", "Gamma"),
        statuspage(&upstream, "ok", "alpha"),
    ];
    let fanout = common::fanout(2, CAP);

    let first = fanout.fetch_all(&entries).await;
    let second = fanout.fetch_all(&entries).await;

    let names: Vec<&str> = first.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "alpha", "beta", "Gamma", "zeta"]);

    let summary = |rs: &[statusdeck::status::NormalizedStatus]| {
        rs.iter()
            .map(|r| (r.name.clone(), r.status.clone(), r.components.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(summary(&first), summary(&second));
}

#[tokio::test]
async fn in_flight_calls_never_exceed_the_limit() {
    let upstream = Upstream::with_delay(Duration::from_millis(40)).await;
    let entries: Vec<RegistryEntry> = (0..23)
        .map(|i| statuspage(&upstream, "ok", &format!("svc-{i:02}")))
        .collect();

    let results = common::fanout(5, Duration::from_secs(2)).fetch_all(&entries).await;

    assert_eq!(results.len(), 23);
    assert_eq!(upstream.hits(), 23);
    assert!(upstream.max_in_flight() <= 5, "max in flight {}", upstream.max_in_flight());
    assert!(upstream.max_in_flight() >= 1);
}

#[tokio::test]
async fn fetch_one_finds_by_name() {
    let upstream = Upstream::start().await;
    let registry = Registry::new(vec![
        statuspage(&upstream, "minor", "Acme"),
        statuspage(&upstream, "ok", "Other"),
    ]);
    let fanout = common::fanout(5, CAP);

    let acme = fanout.fetch_one(&registry, "Acme").await.unwrap();
    assert_eq!(acme.status.indicator, Indicator::Minor);
    assert_eq!(upstream.hits(), 1);

    assert!(fanout.fetch_one(&registry, "Nope").await.is_none());
}
