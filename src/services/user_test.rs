use super::*;

#[test]
fn sparse_user_document_gets_defaults() {
    let parsed: User = bson::from_document(doc! { "uid": "kakao-1", "name": "Mina" }).unwrap();
    assert!(parsed.friend.is_empty());
    assert!(!parsed.is_active);
    assert_eq!(parsed.deposit, 0);
    assert!(parsed.register_date.is_none());
}

#[test]
fn summary_exposes_public_fields_only() {
    let id = ObjectId::parse_str("65a1f0c2b4d3e2a1f0c2b4d3").unwrap();
    let mut member: User = bson::from_document(doc! { "uid": "kakao-1", "name": "Mina", "telephone": "secret" }).unwrap();
    member.id = Some(id);
    member.profile_image = Some("https://img.test/m.png".into());

    let json = serde_json::to_value(UserSummary::from(&member)).unwrap();
    assert_eq!(json["id"], "65a1f0c2b4d3e2a1f0c2b4d3");
    assert_eq!(json["profileImage"], "https://img.test/m.png");
    assert!(json.get("telephone").is_none());
}

#[tokio::test]
async fn find_many_without_ids_skips_the_query() {
    let db = crate::state::test_helpers::test_database();
    assert!(find_many(&db, &[]).await.unwrap().is_empty());
}
