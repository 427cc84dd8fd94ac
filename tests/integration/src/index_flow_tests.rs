//! Registry-to-index flow tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use mesh_eds::prelude::*;

/// Scheduler recording every push intent.
#[derive(Default)]
struct RecordingScheduler {
    requests: Mutex<Vec<PushRequest>>,
}

impl PushScheduler for RecordingScheduler {
    fn schedule(&self, request: PushRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

fn orchestrator() -> (Arc<UpdateOrchestrator>, Arc<RecordingScheduler>) {
    let scheduler = Arc::new(RecordingScheduler::default());
    let scheduler_dyn: Arc<dyn PushScheduler> = scheduler.clone() as Arc<dyn PushScheduler>;
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        Arc::new(EndpointIndex::new()),
        scheduler_dyn,
    ));
    (orchestrator, scheduler)
}

fn endpoint(address: &str, sa: &str) -> WorkloadEndpoint {
    let ep = WorkloadEndpoint::new(address, 9080).with_service_port_name("http");
    if sa.is_empty() {
        ep
    } else {
        ep.with_service_account(sa)
    }
}

#[test]
fn first_time_service_triggers_full_push() {
    let (orchestrator, scheduler) = orchestrator();

    orchestrator.on_endpoints_changed(
        &ClusterId::from("c1"),
        "reviews",
        "bookinfo",
        vec![endpoint("10.0.0.1", "sa-a")],
    );

    let requests = scheduler.requests.lock().unwrap();
    assert!(requests[0].full, "new service must request a full push");

    let shards = orchestrator.index().shards_for("reviews", "bookinfo").unwrap();
    assert_eq!(shards.service_accounts(), HashSet::from(["sa-a".to_string()]));
}

#[test]
fn first_time_service_without_account_has_empty_set() {
    let (orchestrator, _) = orchestrator();
    orchestrator.on_endpoints_changed(
        &ClusterId::from("c1"),
        "reviews",
        "bookinfo",
        vec![endpoint("10.0.0.1", "")],
    );

    let shards = orchestrator.index().shards_for("reviews", "bookinfo").unwrap();
    assert!(shards.service_accounts().is_empty());
}

#[test]
fn same_endpoints_no_full_push() {
    let (orchestrator, scheduler) = orchestrator();
    let cluster = ClusterId::from("c1");

    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![endpoint("10.0.0.1", "sa-a")]);
    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![endpoint("10.0.0.1", "sa-a")]);

    let requests = scheduler.requests.lock().unwrap();
    assert!(!requests[1].full, "unchanged endpoints must push incrementally");
}

#[test]
fn service_account_change_triggers_full_push() {
    let (orchestrator, scheduler) = orchestrator();
    let cluster = ClusterId::from("c1");

    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![endpoint("10.0.0.1", "A")]);
    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![endpoint("10.0.0.1", "B")]);

    let requests = scheduler.requests.lock().unwrap();
    assert!(requests[1].full);

    let shards = orchestrator.index().shards_for("reviews", "bookinfo").unwrap();
    assert_eq!(shards.service_accounts(), HashSet::from(["B".to_string()]));
}

#[test]
fn empty_update_keeps_service_entry() {
    let (orchestrator, scheduler) = orchestrator();
    let cluster = ClusterId::from("c1");

    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![endpoint("10.0.0.1", "A")]);
    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![]);

    let requests = scheduler.requests.lock().unwrap();
    assert!(!requests[1].full, "an emptied shard must not trigger a full push");

    let shards = orchestrator
        .index()
        .shards_for("reviews", "bookinfo")
        .expect("entry must survive the crash-loop case");
    assert!(shards.lock().shards.is_empty());
}

#[test]
fn delete_then_recreate_is_full_push_again() {
    let (orchestrator, scheduler) = orchestrator();
    let cluster = ClusterId::from("c1");

    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![endpoint("10.0.0.1", "A")]);
    orchestrator.on_service_event(&cluster, "reviews", "bookinfo", ServiceEvent::Delete);
    assert!(!orchestrator.index().contains("reviews", "bookinfo"));

    orchestrator.on_endpoints_changed(&cluster, "reviews", "bookinfo", vec![endpoint("10.0.0.2", "A")]);

    let requests = scheduler.requests.lock().unwrap();
    assert!(requests[1].full, "a recreated service is first-time again");
}

#[test]
fn push_intents_carry_the_service_entry_key() {
    let (orchestrator, scheduler) = orchestrator();
    orchestrator.on_endpoints_changed(
        &ClusterId::from("c1"),
        "reviews",
        "bookinfo",
        vec![endpoint("10.0.0.1", "")],
    );

    let requests = scheduler.requests.lock().unwrap();
    let key = requests[0].configs_updated.iter().next().unwrap();
    assert_eq!(key.kind, ConfigKind::ServiceEntry);
    assert_eq!(key.name, "reviews");
    assert_eq!(key.namespace, "bookinfo");
    assert_eq!(requests[0].reason, TriggerReason::EndpointUpdate);
}

mod reconciliation {
    use super::*;
    use async_trait::async_trait;

    struct StaticRegistry {
        cluster: ClusterId,
        addresses: Vec<&'static str>,
    }

    #[async_trait]
    impl Registry for StaticRegistry {
        fn provider(&self) -> &str {
            "consul"
        }

        fn cluster_id(&self) -> &ClusterId {
            &self.cluster
        }

        async fn instances_by_port(
            &self,
            service: &Service,
            port: u16,
        ) -> Result<Vec<WorkloadEndpoint>, EdsError> {
            let name = service
                .port_by_number(port)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            Ok(self
                .addresses
                .iter()
                .map(|addr| WorkloadEndpoint::new(*addr, port).with_service_port_name(name.clone()))
                .collect())
        }
    }

    #[tokio::test]
    async fn reconciled_shards_are_buildable() {
        let (orchestrator, scheduler) = orchestrator();
        let aggregator = RegistryAggregator::new(Arc::clone(&orchestrator)).with_registry(Arc::new(
            StaticRegistry {
                cluster: ClusterId::from("c-consul"),
                addresses: vec!["10.5.0.1", "10.5.0.2"],
            },
        ));

        let push = PushContext::builder()
            .version("recon-1")
            .service(
                Service::new("legacy.default.svc.cluster.local", "default")
                    .with_registry("consul")
                    .with_port(ServicePort::new("http", 8080, Protocol::Http)),
            )
            .build();

        aggregator.update_service_shards(&push).await.unwrap();

        // Cache-only: no push intents were emitted.
        assert!(scheduler.requests.lock().unwrap().is_empty());

        // The reconciled shard serves builds.
        let proxy = Proxy::new("sidecar~recon").with_cluster_id("c-consul");
        let assignment = EndpointBuilder::new(
            "outbound|8080||legacy.default.svc.cluster.local",
            &proxy,
            &push,
        )
        .build(orchestrator.index())
        .unwrap();
        assert_eq!(assignment.endpoints[0].lb_endpoints.len(), 2);
    }
}
