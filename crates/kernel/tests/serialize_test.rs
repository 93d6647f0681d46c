#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Caller-dependent documents.

mod common;

use chrono::Duration;
use serde_json::{Value as JsonValue, json};

use commons_kernel::models::user::{ConnectionStatus, connection_status};
use commons_kernel::models::{Caller, ItemKind, Model};
use commons_kernel::query::{MemoryStore, Store};
use commons_kernel::serialize::{Document, HideSerializer, ReportSerializer, Serializer, serializer_for};
use commons_test_utils::{
    attendee, club, comment, connection, hide, membership, ownership, place, rate, report, tag,
    test_event, test_post,
};

use common::{add_user, insert};

struct World {
    store: MemoryStore,
    ada: Caller,
    bob: Caller,
    items: Vec<(ItemKind, i64)>,
}

fn world() -> World {
    let store = MemoryStore::new();
    let ada = add_user(&store, "ada");
    let bob = add_user(&store, "bob");

    let chess = insert(&store, Model::Club, club("chess", false));
    insert(&store, Model::Membership, membership(ada.id, chess, true));
    let post = insert(&store, Model::Post, test_post(ada.id, "hello").by_club(chess).to_row());
    let reply = insert(&store, Model::Comment, comment(bob.id, post, "hi", None));
    let event = insert(
        &store,
        Model::Event,
        test_event(ada.id, "meetup", Duration::days(3))
            .hosted_by_club(chess)
            .to_row(),
    );
    insert(&store, Model::Attendee, attendee(bob.id, event, false, Some(json!({"diet": "none"}))));
    let cafe = insert(&store, Model::Place, place("cafe"));
    insert(&store, Model::Ownership, ownership(ada.id, cafe));
    insert(&store, Model::Tag, tag("Post", post, "intro"));
    insert(&store, Model::Rate, rate(bob.id, "Post", post, 4));
    insert(&store, Model::Rate, rate(bob.id, "Event", event, 5));

    let items = vec![
        (ItemKind::User, ada.id),
        (ItemKind::Post, post),
        (ItemKind::Comment, reply),
        (ItemKind::Event, event),
        (ItemKind::Club, chess),
        (ItemKind::Place, cafe),
    ];
    World {
        store,
        ada,
        bob,
        items,
    }
}

async fn document(world: &World, kind: ItemKind, id: i64, caller: Option<&Caller>) -> Document {
    let entity = world.store.get(kind.model(), id).await.unwrap().unwrap();
    serializer_for(kind)
        .serialize(&world.store, &entity, caller, &[])
        .await
        .unwrap()
}

fn actions(doc: &Document) -> &serde_json::Map<String, JsonValue> {
    doc["request_data"]["allowed_actions"].as_object().unwrap()
}

#[tokio::test]
async fn anonymous_callers_get_no_capabilities() {
    let world = world();
    for (kind, id) in world.items.clone() {
        let doc = document(&world, kind, id, None).await;
        for (action, allowed) in actions(&doc) {
            assert_eq!(allowed, &JsonValue::Bool(false), "{kind:?} {action}");
        }
    }
}

#[tokio::test]
async fn signed_in_callers_get_owner_capabilities() {
    let world = world();
    let ada = Some(&world.ada);
    let bob = Some(&world.bob);

    let (_, post) = world.items[1];
    assert_eq!(actions(&document(&world, ItemKind::Post, post, ada).await)["can_update"], true);
    assert_eq!(actions(&document(&world, ItemKind::Post, post, bob).await)["can_update"], false);
    assert_eq!(actions(&document(&world, ItemKind::Post, post, bob).await)["can_report"], true);

    let (_, chess) = world.items[4];
    let as_admin = document(&world, ItemKind::Club, chess, ada).await;
    assert_eq!(as_admin["membership"], "admin");
    assert_eq!(actions(&as_admin)["can_post"], true);
    let as_outsider = document(&world, ItemKind::Club, chess, bob).await;
    assert_eq!(actions(&as_outsider)["can_post"], false);
    assert_eq!(actions(&as_outsider)["can_join"], true);

    let (_, cafe) = world.items[5];
    assert_eq!(actions(&document(&world, ItemKind::Place, cafe, ada).await)["can_advertise"], true);
    assert_eq!(actions(&document(&world, ItemKind::Place, cafe, bob).await)["can_advertise"], false);
}

#[tokio::test]
async fn event_documents_reflect_attendance() {
    let world = world();
    let (_, event) = world.items[3];

    let host = document(&world, ItemKind::Event, event, Some(&world.ada)).await;
    assert_eq!(actions(&host)["can_edit"], true);
    assert_eq!(actions(&host)["can_attend"], false);
    assert_eq!(host["is_attending"], false);
    assert_eq!(host["form_response"], JsonValue::Null);

    let guest = document(&world, ItemKind::Event, event, Some(&world.bob)).await;
    assert_eq!(actions(&guest)["can_edit"], false);
    assert_eq!(actions(&guest)["can_attend"], false);
    assert_eq!(guest["is_attending"], true);
    assert_eq!(guest["form_response"], json!({"diet": "none"}));
    assert_eq!(guest["attendee_count"], 1);
    assert!(guest.get("qr_code").is_none());
    assert!(guest.get("verification_link").is_none());
}

#[tokio::test]
async fn private_user_fields_are_never_exposed() {
    let world = world();
    for caller in [None, Some(&world.ada), Some(&world.bob)] {
        let doc = document(&world, ItemKind::User, world.ada.id, caller).await;
        for field in ["password_hash", "email", "is_superuser", "is_active", "last_login"] {
            assert!(doc.get(field).is_none(), "{field} leaked");
        }
        assert_eq!(doc["username"], "ada");
        assert_eq!(doc["post_count"], 1);
    }
}

#[tokio::test]
async fn post_documents_carry_tags_rate_and_author() {
    let world = world();
    let (_, post) = world.items[1];
    let doc = document(&world, ItemKind::Post, post, None).await;

    assert_eq!(doc["tags"], json!(["intro"]));
    assert_eq!(doc["rate"].as_f64(), Some(4.0));
    assert_eq!(doc["author"]["username"], "ada");
    assert_eq!(doc["comment_count"], 1);
    assert!(doc.get("creator_id").is_none());
}

#[tokio::test]
async fn anonymous_posts_hide_their_author() {
    let store = MemoryStore::new();
    let ada = add_user(&store, "ada");
    let post = insert(&store, Model::Post, test_post(ada.id, "secret").anonymous().to_row());
    let entity = store.get(Model::Post, post).await.unwrap().unwrap();

    let doc = serializer_for(ItemKind::Post)
        .serialize(&store, &entity, Some(&ada), &[])
        .await
        .unwrap();
    assert_eq!(doc["author"], JsonValue::Null);
    assert_eq!(doc["is_creator"], true);
}

#[tokio::test]
async fn missing_annotations_serialize_as_null() {
    let world = world();
    let entity = world.store.get(Model::User, world.bob.id).await.unwrap().unwrap();
    let doc = serializer_for(ItemKind::User)
        .serialize(&world.store, &entity, None, &["rate".to_string()])
        .await
        .unwrap();
    assert_eq!(doc["rate"], JsonValue::Null);
}

#[tokio::test]
async fn self_connection_wins_over_stored_rows() {
    let store = MemoryStore::new();
    let ada = add_user(&store, "ada");
    insert(&store, Model::Connection, connection(ada.id, ada.id, false));

    assert_eq!(
        connection_status(&store, ada.id, &ada).await.unwrap(),
        ConnectionStatus::Me
    );
    let entity = store.get(Model::User, ada.id).await.unwrap().unwrap();
    let doc = serializer_for(ItemKind::User)
        .serialize(&store, &entity, Some(&ada), &[])
        .await
        .unwrap();
    assert_eq!(doc["connection"], "self");
    assert_eq!(actions(&doc)["can_connect"], false);
    assert_eq!(actions(&doc)["can_update"], true);
}

#[tokio::test]
async fn connection_request_lifecycle() {
    let store = MemoryStore::new();
    let a = add_user(&store, "a");
    let b = add_user(&store, "b");
    assert_eq!(
        connection_status(&store, b.id, &a).await.unwrap(),
        ConnectionStatus::NotConnected
    );

    let request = insert(&store, Model::Connection, connection(a.id, b.id, false));
    assert_eq!(
        connection_status(&store, b.id, &a).await.unwrap(),
        ConnectionStatus::RequestSent
    );
    assert_eq!(
        connection_status(&store, a.id, &b).await.unwrap(),
        ConnectionStatus::RequestReceived
    );

    assert!(store.update(Model::Connection, request, json!({"is_accepted": true})));
    assert_eq!(
        connection_status(&store, b.id, &a).await.unwrap(),
        ConnectionStatus::Connected
    );
    assert_eq!(
        connection_status(&store, a.id, &b).await.unwrap(),
        ConnectionStatus::Connected
    );
}

#[tokio::test]
async fn hides_and_reports_embed_their_item() {
    let world = world();
    let (_, post) = world.items[1];
    let hide_id = insert(&world.store, Model::Hide, hide(world.bob.id, "Post", post));
    let report_id = insert(
        &world.store,
        Model::Report,
        report(world.bob.id, "Post", post, "spam"),
    );
    let dangling = insert(&world.store, Model::Hide, hide(world.bob.id, "Post", 9999));

    let entity = world.store.get(Model::Hide, hide_id).await.unwrap().unwrap();
    let doc = HideSerializer
        .serialize(&world.store, &entity, Some(&world.bob), &[])
        .await
        .unwrap();
    assert_eq!(doc["item"]["id"], post);
    assert_eq!(doc["item"]["title"], "hello");

    let entity = world.store.get(Model::Report, report_id).await.unwrap().unwrap();
    let doc = ReportSerializer
        .serialize(&world.store, &entity, Some(&world.bob), &[])
        .await
        .unwrap();
    assert_eq!(doc["reason"], "spam");
    assert_eq!(doc["item"]["id"], post);

    let entity = world.store.get(Model::Hide, dangling).await.unwrap().unwrap();
    let doc = HideSerializer
        .serialize(&world.store, &entity, Some(&world.bob), &[])
        .await
        .unwrap();
    assert_eq!(doc["item"], JsonValue::Null);
}
