use super::*;

fn sub() -> NotificationSub {
    NotificationSub {
        uid: "u1".into(),
        endpoint: "https://push.example.test/abc".into(),
        keys: SubscriptionKeys { p256dh: "pkey".into(), auth: "akey".into() },
    }
}

#[test]
fn gateway_body_carries_subscription_and_payload() {
    let body = gateway_body(&sub(), "Friend request", "someone wants to be friends");
    assert_eq!(body["subscription"]["endpoint"], "https://push.example.test/abc");
    assert_eq!(body["subscription"]["keys"]["p256dh"], "pkey");
    assert_eq!(body["subscription"]["keys"]["auth"], "akey");
    assert_eq!(body["payload"]["title"], "Friend request");
}

#[test]
fn gone_statuses_expire_subscription() {
    assert!(is_expired_status(404));
    assert!(is_expired_status(410));
    assert!(!is_expired_status(429));
    assert!(!is_expired_status(500));
}

#[test]
fn subscription_parses_browser_json() {
    let raw = r#"{"endpoint":"https://fcm.googleapis.com/fcm/send/x","keys":{"p256dh":"BNc","auth":"tB"}}"#;
    let parsed: Subscription = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed.keys.auth, "tB");
}
