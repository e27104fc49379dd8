//! End-to-end event-stream flows: chain events in, role mutations out,
//! durable cursors in between.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{MockIndexer, MockPlatform, MockRoleLink, mapping, role_linked_tx, user_linked_tx};
use guild_reconciler::lock::NoopLockManager;
use guild_reconciler::ports::{ConfigStore, Indexer};
use guild_reconciler::reconciler::Reconciler;
use guild_reconciler::store::{MemoryConfigStore, update_config};
use guild_reconciler::stream::{EventRouter, EventStreamProcessor, StreamConfig, queries};
use guild_reconciler::types::TxCursor;

struct World {
    store: Arc<MemoryConfigStore>,
    platform: Arc<MockPlatform>,
    rolelink: Arc<MockRoleLink>,
    indexer: Arc<MockIndexer>,
}

impl World {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryConfigStore::new()),
            platform: Arc::new(MockPlatform::new()),
            rolelink: Arc::new(MockRoleLink::new()),
            indexer: Arc::new(MockIndexer::new()),
        }
    }

    fn reconciler(&self) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            self.store.clone(),
            self.platform.clone(),
            self.rolelink.clone(),
            Arc::new(NoopLockManager),
        ))
    }

    fn processor(&self, guild_id: &str) -> EventStreamProcessor {
        EventStreamProcessor::new(
            guild_id,
            self.store.clone(),
            self.indexer.clone() as Arc<dyn Indexer>,
            Arc::new(EventRouter::for_guild(guild_id, self.reconciler())),
            StreamConfig::default(),
        )
    }

    async fn set_verified_role(&self, guild_id: &str, role_id: &str) {
        update_config(self.store.as_ref(), guild_id, |config| {
            config.verified_role_id = Some(role_id.to_string());
        })
        .await
        .unwrap();
    }

    async fn cursor(&self, guild_id: &str, query_id: &str) -> TxCursor {
        self.store
            .get(guild_id)
            .await
            .unwrap()
            .expect("config should exist")
            .value
            .query_states
            .get(query_id)
            .expect("query state should exist")
            .cursor()
    }

    async fn force_due(&self, guild_id: &str) {
        update_config(self.store.as_ref(), guild_id, |config| {
            for state in config.query_states.values_mut() {
                state.next_run_timestamp = None;
            }
        })
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn user_link_event_grants_verified_role_everywhere() {
    let world = World::new();

    // Two guilds contain u1, a third does not
    world.platform.seed_role("G1", "V1", "Verified");
    world.platform.seed_role("G2", "V2", "Verified");
    world.platform.seed_member("G1", "u1", false, &[]);
    world.platform.seed_member("G2", "u1", false, &[]);
    world.platform.seed_member("G3", "someone-else", false, &[]);
    world.set_verified_role("G1", "V1").await;
    world.set_verified_role("G2", "V2").await;

    world.rolelink.link("u1", "g1u1addr");
    world.indexer.set_tip(100);
    world
        .indexer
        .push_tx(user_linked_tx(42, 3, "u1", "g1u1addr"));

    let processor = world.processor("G1");
    processor.run_pass(&CancellationToken::new()).await.unwrap();

    // u1 gained the verified role in every guild containing them
    assert_eq!(
        world.platform.roles_of("G1", "u1"),
        Some(vec!["V1".to_string()])
    );
    assert_eq!(
        world.platform.roles_of("G2", "u1"),
        Some(vec!["V2".to_string()])
    );

    // The cursor landed on the event's transaction
    assert_eq!(
        world.cursor("G1", queries::USER_EVENTS).await,
        TxCursor::new(42, 3)
    );

    // A second pass issues zero further platform mutations
    let mutations_after_first = world.platform.mutation_count();
    world.force_due("G1").await;
    processor.run_pass(&CancellationToken::new()).await.unwrap();
    assert_eq!(world.platform.mutation_count(), mutations_after_first);
}

#[tokio::test]
async fn role_link_event_sweeps_only_the_managing_guild() {
    let world = World::new();

    world.platform.seed_role("G1", "R9", "mod-gno.land/r/demo");
    world.platform.seed_member("G1", "u1", false, &[]);
    world.platform.seed_member("G1", "u2", false, &[]);
    world.platform.seed_member("G1", "u3", false, &[]);
    world.platform.seed_member("G2", "u1", false, &[]);

    // u1 holds the realm role, u2 is linked without it, u3 is unlinked
    world.rolelink.link("u1", "g1u1addr");
    world.rolelink.link("u2", "g1u2addr");
    world
        .rolelink
        .grant_realm_role("gno.land/r/demo", "mod", "g1u1addr");
    world
        .rolelink
        .publish_mapping(mapping("gno.land/r/demo", "mod", "G1", "R9", "mod"));

    world.indexer.set_tip(100);
    world.indexer.push_tx(role_linked_tx(
        10,
        0,
        "gno.land/r/demo",
        "mod",
        "G1",
        "R9",
    ));

    // Delivered to G1's processor: the sweep applies
    let g1 = world.processor("G1");
    g1.run_pass(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        world.platform.roles_of("G1", "u1"),
        Some(vec!["R9".to_string()])
    );
    assert_eq!(world.platform.roles_of("G1", "u2"), Some(vec![]));
    assert_eq!(world.platform.roles_of("G1", "u3"), Some(vec![]));

    // The same event delivered to G2's processor is ignored
    let mutations_after_g1 = world.platform.mutation_count();
    let g2 = world.processor("G2");
    g2.run_pass(&CancellationToken::new()).await.unwrap();

    assert_eq!(world.platform.mutation_count(), mutations_after_g1);
    assert_eq!(world.platform.roles_of("G2", "u1"), Some(vec![]));

    // Both processors advanced their own cursors past the event
    assert_eq!(
        world.cursor("G1", queries::ROLE_EVENTS).await,
        TxCursor::new(10, 0)
    );
    assert_eq!(
        world.cursor("G2", queries::ROLE_EVENTS).await,
        TxCursor::new(10, 0)
    );
}

#[tokio::test]
async fn user_unlink_event_strips_roles() {
    let world = World::new();

    world.platform.seed_role("G1", "V1", "Verified");
    world.platform.seed_role("G1", "R9", "mod-gno.land/r/demo");
    world.platform.seed_member("G1", "u1", false, &["V1", "R9"]);
    world.set_verified_role("G1", "V1").await;

    // The realm still publishes the mapping; monitored realms come from
    // discovery against the linked role name
    world
        .rolelink
        .publish_mapping(mapping("gno.land/r/demo", "mod", "G1", "R9", "mod"));

    world.indexer.set_tip(100);
    world.indexer.push_tx(common::tx_with_event(
        50,
        1,
        common::USER_EVENTS_PKG,
        "UserUnlinked",
        &[
            ("discord_id", "u1"),
            ("address", "g1u1addr"),
            ("triggered_by", "user"),
        ],
    ));

    let processor = world.processor("G1");
    processor.run_pass(&CancellationToken::new()).await.unwrap();

    assert_eq!(world.platform.roles_of("G1", "u1"), Some(vec![]));
}

#[tokio::test]
async fn interleaved_user_events_apply_in_chain_order() {
    let world = World::new();

    world.platform.seed_role("G1", "V1", "Verified");
    world.platform.seed_member("G1", "u1", false, &[]);
    world.set_verified_role("G1", "V1").await;
    world.rolelink.link("u1", "g1u1addr");

    world.indexer.set_tip(100);
    // Link at (10,0), unlink at (10,1), re-link at (11,0): the user ends
    // verified only because the events apply in (block, index) order
    world
        .indexer
        .push_tx(user_linked_tx(10, 0, "u1", "g1u1addr"));
    world.indexer.push_tx(common::tx_with_event(
        10,
        1,
        common::USER_EVENTS_PKG,
        "UserUnlinked",
        &[
            ("discord_id", "u1"),
            ("address", "g1u1addr"),
            ("triggered_by", "user"),
        ],
    ));
    world
        .indexer
        .push_tx(user_linked_tx(11, 0, "u1", "g1u1addr"));

    let processor = world.processor("G1");
    processor.run_pass(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        world.platform.roles_of("G1", "u1"),
        Some(vec!["V1".to_string()])
    );
    assert_eq!(
        world.platform.mutation_log(),
        vec![
            "add:G1:u1:V1".to_string(),
            "remove:G1:u1:V1".to_string(),
            "add:G1:u1:V1".to_string(),
        ]
    );
}
