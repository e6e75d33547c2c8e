//! Admin invitation handshake across separate homes sharing one API store.

use trustroot::drain::{dead_letter, INVITE};
use trustroot::params::{AdminJoinParams, DeleteParams};
use trustroot::store::{Queue, Store, StoreError};
use trustroot::{Id, InviteFailurePolicy, TrustConfig, TrustError};
use trustroot_testkit::TestOrg;

fn join_params(org: &TestOrg, name: &str, invite_id: Id, invite_key: &str) -> AdminJoinParams {
    AdminJoinParams {
        name: name.into(),
        org_id: org.org.id,
        org_name: org.org.name.clone(),
        invite_id,
        invite_key: invite_key.into(),
    }
}

#[tokio::test]
async fn test_invite_adds_one_admin_and_empties_channel() {
    let org = TestOrg::new().await.unwrap();
    let invite = org.admin.admins().invite("bob").await.unwrap();

    let bob = org.party();
    bob.admins()
        .join(join_params(&org, "bob", invite.id, invite.secret()))
        .await
        .unwrap();
    assert_eq!(org.api.incoming_size(&org.org.id, INVITE).await.unwrap(), 1);

    let report = org.admin.admins().run().await.unwrap();
    assert_eq!(report.consumed, 1);
    assert_eq!(report.requeued, 0);
    assert_eq!(org.api.incoming_size(&org.org.id, INVITE).await.unwrap(), 0);

    let names: Vec<String> = org
        .admin
        .admins()
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);

    let org_public = bob.admins().complete(invite.id, invite.secret()).await.unwrap();
    assert_eq!(org_public.id, org.org.id);

    // Bob can now decrypt the organization on his own.
    let info = bob.orgs().show().await.unwrap();
    assert_eq!(info.admins.len(), 2);
}

#[tokio::test]
async fn test_unknown_pairing_id_is_requeued() {
    let org = TestOrg::new().await.unwrap();
    org.admin.admins().invite("bob").await.unwrap();

    let mallory = org.party();
    mallory
        .admins()
        .join(join_params(&org, "mallory", Id::generate(), "not-a-key"))
        .await
        .unwrap();

    let before = org.admin.load_index(&org.admin.admin_context().await.unwrap()).await.unwrap();
    let report = org.admin.admins().run().await.unwrap();
    assert_eq!(report.consumed, 0);
    assert_eq!(report.requeued, 1);
    assert_eq!(org.api.incoming_size(&org.org.id, INVITE).await.unwrap(), 1);

    let after = org.admin.load_index(&org.admin.admin_context().await.unwrap()).await.unwrap();
    assert_eq!(before, after);

    // The same item comes back on every run.
    let again = org.admin.admins().run().await.unwrap();
    assert_eq!(again.requeued, 1);
}

#[tokio::test]
async fn test_wrong_secret_keeps_pairing_key() {
    let org = TestOrg::new().await.unwrap();
    let invite = org.admin.admins().invite("bob").await.unwrap();

    let bob = org.party();
    bob.admins()
        .join(join_params(&org, "bob", invite.id, "guessed"))
        .await
        .unwrap();
    let report = org.admin.admins().run().await.unwrap();
    assert_eq!(report.requeued, 1);

    let keys = org.admin.pairing_keys().list().await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].0, invite.id);
    assert_eq!(org.admin.admins().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_dead_letter_policy_moves_bad_invite() {
    let config = TrustConfig {
        invite_failure_policy: InviteFailurePolicy::DeadLetter,
        ..TrustConfig::default()
    };
    let org = TestOrg::with_config(config).await.unwrap();

    org.party()
        .admins()
        .join(join_params(&org, "mallory", Id::generate(), "nope"))
        .await
        .unwrap();
    let report = org.admin.admins().run().await.unwrap();
    assert_eq!(report.dead_lettered, 1);
    assert_eq!(org.api.incoming_size(&org.org.id, INVITE).await.unwrap(), 0);
    assert_eq!(
        org.api
            .incoming_size(&org.org.id, &dead_letter(INVITE))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_pairing_key_is_single_use() {
    let org = TestOrg::new().await.unwrap();
    let invite = org.admin.admins().invite("bob").await.unwrap();

    let bob = org.party();
    bob.admins()
        .join(join_params(&org, "bob", invite.id, invite.secret()))
        .await
        .unwrap();
    org.admin.admins().run().await.unwrap();
    assert!(org.admin.pairing_keys().list().await.unwrap().is_empty());

    let replay = org.party();
    replay
        .admins()
        .join(join_params(&org, "eve", invite.id, invite.secret()))
        .await
        .unwrap();
    let report = org.admin.admins().run().await.unwrap();
    assert_eq!(report.requeued, 1);
    assert_eq!(org.admin.admins().list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_invite_retried_after_broadcast_failure() {
    let org = TestOrg::new().await.unwrap();
    let invite = org.admin.admins().invite("bob").await.unwrap();

    let bob = org.party();
    let bob_id = bob
        .admins()
        .join(join_params(&org, "bob", invite.id, invite.secret()))
        .await
        .unwrap();

    // Without bob's public document the organization cannot be resealed.
    let bob_public = org.api.get_public(&bob_id, &bob_id).await.unwrap();
    org.api.delete_public(&bob_id, &bob_id).await.unwrap();

    let first = org.admin.admins().run().await.unwrap();
    assert_eq!(first.consumed, 0);
    assert_eq!(first.requeued, 1);
    assert_eq!(org.admin.pairing_keys().list().await.unwrap().len(), 1);
    assert_eq!(org.api.incoming_size(&bob_id, INVITE).await.unwrap(), 0);

    org.api.send_public(&bob_id, &bob_id, &bob_public).await.unwrap();
    let second = org.admin.admins().run().await.unwrap();
    assert_eq!(second.consumed, 1);
    assert_eq!(second.requeued, 0);
    assert_eq!(org.api.incoming_size(&org.org.id, INVITE).await.unwrap(), 0);
    assert_eq!(org.api.incoming_size(&bob_id, INVITE).await.unwrap(), 1);
    assert!(org.admin.pairing_keys().list().await.unwrap().is_empty());
    assert_eq!(org.admin.admins().list().await.unwrap().len(), 2);

    bob.admins().complete(invite.id, invite.secret()).await.unwrap();
    assert_eq!(bob.orgs().show().await.unwrap().admins.len(), 2);
}

#[tokio::test]
async fn test_complete_before_run_is_queue_empty() {
    let org = TestOrg::new().await.unwrap();
    let invite = org.admin.admins().invite("bob").await.unwrap();
    let bob = org.party();
    bob.admins()
        .join(join_params(&org, "bob", invite.id, invite.secret()))
        .await
        .unwrap();

    let err = bob
        .admins()
        .complete(invite.id, invite.secret())
        .await
        .unwrap_err();
    assert!(matches!(err, TrustError::Store(StoreError::QueueEmpty { .. })));
    assert!(matches!(
        bob.admin_context().await,
        Err(TrustError::NotConfigured(_))
    ));
}

#[tokio::test]
async fn test_duplicate_invite_name_rejected() {
    let org = TestOrg::new().await.unwrap();
    assert!(org.admin.admins().invite("alice").await.is_err());
    assert!(org.admin.admins().invite(" ").await.is_err());
}

#[tokio::test]
async fn test_deleted_admin_loses_access() {
    let org = TestOrg::new().await.unwrap();
    let bob = org.enroll_admin("bob").await.unwrap();
    assert!(bob.admin_context().await.is_ok());

    let err = org
        .admin
        .admins()
        .delete(DeleteParams {
            name: "bob".into(),
            confirm: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TrustError::Validation(_)));

    org.admin
        .admins()
        .delete(DeleteParams::confirmed("bob"))
        .await
        .unwrap();
    assert!(matches!(bob.admin_context().await, Err(TrustError::Seal(_))));
    assert!(org.admin.admin_context().await.is_ok());
    assert!(org.admin.admins().show("bob").await.is_err());
}

#[tokio::test]
async fn test_admin_cannot_delete_itself() {
    let org = TestOrg::new().await.unwrap();
    let result = org
        .admin
        .admins()
        .delete(DeleteParams::confirmed("alice"))
        .await;
    assert!(matches!(result, Err(TrustError::Validation(_))));
}
