use super::*;

fn caller() -> Identity {
    Identity {
        id: ObjectId::new(),
        uid: "uid-a".into(),
        name: "Ari".into(),
        picture: None,
        role: None,
        location: None,
    }
}

fn request(to: &str) -> NoticeRequest {
    NoticeRequest { to: to.into(), message: "hello".into(), sub: None }
}

#[test]
fn status_parse_accepts_known_values_only() {
    assert_eq!(NoticeStatus::parse("response"), Some(NoticeStatus::Response));
    assert_eq!(NoticeStatus::parse("refusal"), Some(NoticeStatus::Refusal));
    assert_eq!(NoticeStatus::parse("pending"), Some(NoticeStatus::Pending));
    assert_eq!(NoticeStatus::parse("accepted"), None);
}

#[test]
fn kind_serializes_lowercase() {
    assert_eq!(serde_json::to_value(NoticeKind::Alphabet).unwrap(), "alphabet");
    assert_eq!(NoticeKind::Friend.as_str(), "friend");
}

#[test]
fn request_accepts_to_uid_alias() {
    let parsed: NoticeRequest = serde_json::from_str(r#"{"toUid":"uid-b","message":"hi","sub":"A"}"#).unwrap();
    assert_eq!(parsed.to, "uid-b");
    assert_eq!(parsed.sub.as_deref(), Some("A"));

    let parsed: NoticeRequest = serde_json::from_str(r#"{"to":"uid-c"}"#).unwrap();
    assert_eq!(parsed.to, "uid-c");
    assert_eq!(parsed.message, "");
}

#[test]
fn validate_target_rejects_self_and_blank() {
    assert!(validate_target("uid-a", "uid-b").is_ok());
    assert!(validate_target("uid-a", "uid-a").is_err());
    assert!(validate_target("uid-a", "  ").is_err());
}

#[test]
fn validate_message_bounds_length() {
    assert_eq!(validate_message("  hi ").unwrap(), "hi");
    assert!(validate_message(&"x".repeat(MAX_NOTICE_MESSAGE_CHARS + 1)).is_err());
}

#[test]
fn pending_insert_only_sets_on_insert() {
    let update = pending_insert("hi", Some(" B "), DateTime::from_millis(1));
    assert_eq!(update.keys().collect::<Vec<_>>(), vec!["$setOnInsert"]);
    let fields = update.get_document("$setOnInsert").unwrap();
    assert_eq!(fields.get_str("message").unwrap(), "hi");
    assert_eq!(fields.get_str("sub").unwrap(), "B");

    let without_sub = pending_insert("hi", Some("  "), DateTime::from_millis(1));
    assert!(!without_sub.get_document("$setOnInsert").unwrap().contains_key("sub"));
}

#[test]
fn notice_document_uses_type_key() {
    let notice = Notice {
        id: None,
        from: "uid-a".into(),
        to: "uid-b".into(),
        kind: NoticeKind::Friend,
        message: "hi".into(),
        sub: None,
        status: NoticeStatus::Pending,
        created_at: DateTime::from_millis(0),
    };
    let encoded = bson::to_document(&notice).unwrap();
    assert_eq!(encoded.get_str("type").unwrap(), "friend");
    assert!(encoded.get_datetime("createdAt").is_ok());
    assert!(!encoded.contains_key("sub"));

    let view = NoticeView::from(notice);
    assert_eq!(view.created_at, "1970-01-01T00:00:00Z");
}

#[test]
fn pending_conflict_names_the_kind() {
    let err = pending_conflict(NoticeKind::Alphabet);
    assert!(matches!(err, ServiceError::Conflict(msg) if msg == "a pending alphabet request already exists"));
}

#[tokio::test]
async fn like_requests_are_rejected_without_touching_the_store() {
    let db = crate::state::test_helpers::test_database();
    let err = request_notice(&db, &PushFanout::default(), NoticeKind::Like, &caller(), &request("uid-b"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn self_requests_are_rejected() {
    let db = crate::state::test_helpers::test_database();
    let err = request_notice(&db, &PushFanout::default(), NoticeKind::Friend, &caller(), &request("uid-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(msg) if msg == "cannot send a notice to yourself"));

    let err = set_like(&db, &PushFanout::default(), &caller(), "uid-a", "").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::state::test_helpers::{live_database, seed_user};

    #[tokio::test]
    async fn duplicate_pending_request_conflicts() {
        let db = live_database().await;
        let push = PushFanout::default();
        request_notice(&db, &push, NoticeKind::Friend, &caller(), &request("uid-b")).await.unwrap();
        let err = request_notice(&db, &push, NoticeKind::Friend, &caller(), &request("uid-b")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // A different kind is independent.
        request_notice(&db, &push, NoticeKind::Alphabet, &caller(), &request("uid-b")).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_identical_requests_leave_one_pending() {
        let db = live_database().await;
        let push = PushFanout::default();
        let me = caller();
        let to_b = request("uid-b");

        let (first, second) = tokio::join!(
            request_notice(&db, &push, NoticeKind::Friend, &me, &to_b),
            request_notice(&db, &push, NoticeKind::Friend, &me, &to_b),
        );
        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);
        let failed = first.err().or(second.err()).unwrap();
        assert!(matches!(failed, ServiceError::Conflict(_)));

        let pending = collection(&db)
            .count_documents(doc! { "from": "uid-a", "to": "uid-b", "type": "friend", "status": "pending" }, None)
            .await
            .unwrap();
        assert_eq!(pending, 1);
    }

    #[tokio::test]
    async fn answered_request_allows_a_new_one() {
        let db = live_database().await;
        let push = PushFanout::default();
        request_notice(&db, &push, NoticeKind::Alphabet, &caller(), &request("uid-b")).await.unwrap();
        update_request(&db, NoticeKind::Alphabet, "uid-b", "uid-a", NoticeStatus::Refusal).await.unwrap();
        request_notice(&db, &push, NoticeKind::Alphabet, &caller(), &request("uid-b")).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_likes_leave_one_document() {
        let db = live_database().await;
        let push = PushFanout::default();
        let me = caller();

        let (first, second) = tokio::join!(
            set_like(&db, &push, &me, "uid-b", "one"),
            set_like(&db, &push, &me, "uid-b", "two"),
        );
        first.unwrap();
        second.unwrap();
        assert_eq!(get_like(&db, "uid-b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepting_friend_request_links_both_users() {
        let db = live_database().await;
        let a = seed_user(&db, "a").await;
        let b = seed_user(&db, "b").await;
        let me = Identity { uid: a.uid.clone(), ..caller() };

        request_notice(&db, &PushFanout::default(), NoticeKind::Friend, &me, &request(&b.uid)).await.unwrap();
        let incoming = get_friend_request(&db, &b.uid).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].status, NoticeStatus::Pending);

        let answered = update_request(&db, NoticeKind::Friend, &b.uid, &a.uid, NoticeStatus::Response).await.unwrap();
        assert_eq!(answered.status, NoticeStatus::Response);

        let a_after = user::collection(&db).find_one(doc! { "uid": a.uid.as_str() }, None).await.unwrap().unwrap();
        let b_after = user::collection(&db).find_one(doc! { "uid": b.uid.as_str() }, None).await.unwrap().unwrap();
        assert_eq!(a_after.friend, vec![b.uid.clone()]);
        assert_eq!(b_after.friend, vec![a.uid.clone()]);
    }

    #[tokio::test]
    async fn answering_missing_request_is_no_data() {
        let db = live_database().await;
        let err = update_request(&db, NoticeKind::Alphabet, "uid-b", "uid-a", NoticeStatus::Refusal).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(msg) if msg == "no data"));
    }

    #[tokio::test]
    async fn likes_are_listed_and_withdrawn() {
        let db = live_database().await;
        let push = PushFanout::default();
        set_like(&db, &push, &caller(), "uid-b", "nice").await.unwrap();
        set_like(&db, &push, &caller(), "uid-b", "still nice").await.unwrap();

        let received = get_like(&db, "uid-b").await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message, "still nice");
        assert_eq!(get_like_all(&db, "uid-a").await.unwrap().len(), 1);

        delete_like(&db, "uid-a", "uid-b").await.unwrap();
        assert!(get_like(&db, "uid-b").await.unwrap().is_empty());
    }
}
