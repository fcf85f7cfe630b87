//! Friend request lifecycle against the in-process store

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

use chat_relay::application::services::{
    FriendService, FriendTarget, UserService, UserServiceImpl,
};
use chat_relay::domain::services::{FriendError, Resolution};
use chat_relay::domain::{FriendAction, FriendRequestRepository, FriendRequestStatus};
use chat_relay::infrastructure::memory::MemoryStore;

use crate::common::{friend_service, seed_user, FailingChatStore};

async fn store_with(ids: &[i64]) -> MemoryStore {
    let store = MemoryStore::new();
    for &id in ids {
        seed_user(&store, id).await;
    }
    store
}

#[tokio::test]
async fn test_request_is_pending_once() {
    let store = store_with(&[1, 2]).await;
    let service = friend_service(&store, store.clone());

    let request = assert_ok!(service.send_request(1, FriendTarget::Id(2)).await);
    assert_eq!(request.status, FriendRequestStatus::Pending);
    assert_eq!((request.from_id, request.to_id), (1, 2));

    let duplicate = service.send_request(1, FriendTarget::Id(2)).await;
    assert!(matches!(duplicate, Err(FriendError::AlreadyPending)));

    let reverse = service.send_request(2, FriendTarget::Id(1)).await;
    assert!(matches!(reverse, Err(FriendError::AlreadyPending)));
}

#[tokio::test]
async fn test_request_by_email() {
    let store = store_with(&[1, 2]).await;
    let service = friend_service(&store, store.clone());

    let request = service
        .send_request(1, FriendTarget::Email("user2@example.com".into()))
        .await
        .unwrap();

    assert_eq!(request.to_id, 2);
}

#[tokio::test]
async fn test_search_then_request() {
    let store = store_with(&[1, 2, 3]).await;
    let users = UserServiceImpl::new(Arc::new(store.clone()));
    let service = friend_service(&store, store.clone());

    let found = users.search_by_email(1, "user2@").await.unwrap();
    assert_eq!(found.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2]);
    assert!(users.search_by_email(1, "user1@").await.unwrap().is_empty());

    let request = service
        .send_request(1, FriendTarget::Id(found[0].id))
        .await
        .unwrap();
    assert_eq!(request.to_id, 2);
}

#[tokio::test]
async fn test_self_request_rejected() {
    let store = store_with(&[1]).await;
    let service = friend_service(&store, store.clone());

    let by_id = service.send_request(1, FriendTarget::Id(1)).await;
    assert!(matches!(by_id, Err(FriendError::SelfRequest)));

    let by_email = service
        .send_request(1, FriendTarget::Email("user1@example.com".into()))
        .await;
    assert!(matches!(by_email, Err(FriendError::SelfRequest)));
    assert!(store.latest_request(1, 1).await.is_none());
}

#[tokio::test]
async fn test_accept_links_both_users_and_provisions_one_chat() {
    let store = store_with(&[1, 2]).await;
    let service = friend_service(&store, store.clone());
    service.send_request(1, FriendTarget::Id(2)).await.unwrap();

    let resolution = assert_ok!(service.resolve(2, 1, FriendAction::Accept).await);

    let chat = match resolution {
        Resolution::Accepted { request, chat } => {
            assert_eq!(request.status, FriendRequestStatus::Accepted);
            assert!(request.resolved_at.is_some());
            chat
        }
        other => panic!("expected acceptance, got {:?}", other),
    };
    assert!(!chat.is_group);
    assert!(chat.is_member(1) && chat.is_member(2));

    assert!(store.are_friends(1, 2).await.unwrap());
    assert!(store.are_friends(2, 1).await.unwrap());
    assert_eq!(store.chats_between(1, 2).await, 1);

    let friends_of_1 = service.list_friends(1).await.unwrap();
    let friends_of_2 = service.list_friends(2).await.unwrap();
    assert_eq!(friends_of_1.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2]);
    assert_eq!(friends_of_2.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1]);
}

#[tokio::test]
async fn test_decline_leaves_no_link() {
    let store = store_with(&[1, 2]).await;
    let service = friend_service(&store, store.clone());
    service.send_request(1, FriendTarget::Id(2)).await.unwrap();

    let resolution = service.resolve(2, 1, FriendAction::Decline).await.unwrap();
    assert!(matches!(resolution, Resolution::Declined { .. }));

    assert!(!store.are_friends(1, 2).await.unwrap());
    assert_eq!(store.chats_between(1, 2).await, 0);
    assert_eq!(
        store.latest_request(1, 2).await.map(|r| r.status),
        Some(FriendRequestStatus::Declined)
    );

    let again = service.resolve(2, 1, FriendAction::Decline).await;
    assert!(matches!(
        again,
        Err(FriendError::NotPending(FriendRequestStatus::Declined))
    ));
}

#[tokio::test]
async fn test_resolved_request_cannot_be_resolved_again() {
    let store = store_with(&[1, 2]).await;
    let service = friend_service(&store, store.clone());
    service.send_request(1, FriendTarget::Id(2)).await.unwrap();
    service.resolve(2, 1, FriendAction::Accept).await.unwrap();

    for action in [FriendAction::Accept, FriendAction::Decline] {
        let result = service.resolve(2, 1, action).await;
        assert!(matches!(
            result,
            Err(FriendError::NotPending(FriendRequestStatus::Accepted))
        ));
    }
    assert_eq!(store.chats_between(1, 2).await, 1);
}

#[tokio::test]
async fn test_only_addressee_can_resolve() {
    let store = store_with(&[1, 2]).await;
    let service = friend_service(&store, store.clone());
    service.send_request(1, FriendTarget::Id(2)).await.unwrap();

    // The sender looks for a request from 2 to 1, which does not exist.
    let result = service.resolve(1, 2, FriendAction::Accept).await;

    assert!(matches!(result, Err(FriendError::RequestNotFound)));
    assert!(store.latest_request(1, 2).await.unwrap().is_pending());
}

#[tokio::test]
async fn test_failed_provisioning_rolls_back_acceptance() {
    let store = store_with(&[1, 2]).await;
    let service = friend_service(&store, FailingChatStore::new(store.clone()));
    service.send_request(1, FriendTarget::Id(2)).await.unwrap();

    let err = assert_err!(service.resolve(2, 1, FriendAction::Accept).await);

    assert!(matches!(err, FriendError::Storage(_)));
    let request = store.latest_request(1, 2).await.unwrap();
    assert_eq!(request.status, FriendRequestStatus::Pending);
    assert!(request.resolved_at.is_none());
    assert!(!store.are_friends(1, 2).await.unwrap());
    assert_eq!(store.chats_between(1, 2).await, 0);
}

#[tokio::test]
async fn test_incoming_lists_only_pending() {
    let store = store_with(&[1, 2, 3]).await;
    let service = friend_service(&store, store.clone());
    service.send_request(1, FriendTarget::Id(3)).await.unwrap();
    service.send_request(2, FriendTarget::Id(3)).await.unwrap();
    service.resolve(3, 1, FriendAction::Decline).await.unwrap();

    let incoming = service.list_incoming(3).await.unwrap();

    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].request.from_id, 2);
    assert_eq!(incoming[0].sender.id, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accept_and_decline_resolve_once() {
    let store = store_with(&[1, 2]).await;
    let service = Arc::new(friend_service(&store, store.clone()));
    service.send_request(1, FriendTarget::Id(2)).await.unwrap();

    let accept = tokio::spawn({
        let service = service.clone();
        async move { service.resolve(2, 1, FriendAction::Accept).await }
    });
    let decline = tokio::spawn({
        let service = service.clone();
        async move { service.resolve(2, 1, FriendAction::Decline).await }
    });
    let results = [accept.await.unwrap(), decline.await.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(FriendError::NotPending(_)))));

    let status = store.latest_request(1, 2).await.unwrap().status;
    let linked = store.are_friends(1, 2).await.unwrap();
    let chats = store.chats_between(1, 2).await;
    match status {
        FriendRequestStatus::Accepted => assert!(linked && chats == 1),
        FriendRequestStatus::Declined => assert!(!linked && chats == 0),
        FriendRequestStatus::Pending => panic!("request left pending"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crossing_requests_leave_one_pending() {
    let store = store_with(&[1, 2]).await;
    let service = Arc::new(friend_service(&store, store.clone()));

    let forward = tokio::spawn({
        let service = service.clone();
        async move { service.send_request(1, FriendTarget::Id(2)).await }
    });
    let backward = tokio::spawn({
        let service = service.clone();
        async move { service.send_request(2, FriendTarget::Id(1)).await }
    });
    let results = [forward.await.unwrap(), backward.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let pending = store.find_pending_between(1, 2).await.unwrap();
    assert!(pending.is_some());
}
