use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};

const USER_ID: &str = "65a1f0c2b4d3e2a1f0c2b4d3";

fn future_exp() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp() + 3600
}

fn sign(claims: &Claims, secret: &str) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

fn claims(id: &str, exp: i64) -> Claims {
    Claims {
        id: id.into(),
        uid: "kakao-42".into(),
        name: "tester".into(),
        picture: Some("https://img.test/p.png".into()),
        role: Some("human".into()),
        location: Some("Suwon".into()),
        exp,
    }
}

#[test]
fn decode_valid_token() {
    let decoder = TokenDecoder::new("s3cret");
    let identity = decoder
        .decode(&sign(&claims(USER_ID, future_exp()), "s3cret"))
        .unwrap();

    assert_eq!(identity.id.to_hex(), USER_ID);
    assert_eq!(identity.uid, "kakao-42");
    assert_eq!(identity.name, "tester");
    assert_eq!(identity.location.as_deref(), Some("Suwon"));
}

#[test]
fn decode_rejects_wrong_secret() {
    let decoder = TokenDecoder::new("s3cret");
    let err = decoder
        .decode(&sign(&claims(USER_ID, future_exp()), "other"))
        .unwrap_err();
    assert!(matches!(err, IdentityError::Invalid(_)));
}

#[test]
fn decode_rejects_expired_token() {
    let decoder = TokenDecoder::new("s3cret");
    let err = decoder
        .decode(&sign(&claims(USER_ID, 1_000), "s3cret"))
        .unwrap_err();
    assert!(matches!(err, IdentityError::Invalid(_)));
}

#[test]
fn decode_rejects_non_object_id() {
    let decoder = TokenDecoder::new("s3cret");
    let err = decoder
        .decode(&sign(&claims("not-an-id", future_exp()), "s3cret"))
        .unwrap_err();
    assert!(matches!(err, IdentityError::BadUserId(id) if id == "not-an-id"));
}

#[test]
fn decode_tolerates_minimal_claims() {
    let token = encode(
        &Header::default(),
        &serde_json::json!({ "id": USER_ID, "uid": "u1", "exp": future_exp() }),
        &EncodingKey::from_secret(b"k"),
    )
    .unwrap();

    let identity = TokenDecoder::new("k").decode(&token).unwrap();
    assert_eq!(identity.name, "");
    assert!(identity.picture.is_none());
    assert!(identity.role.is_none());
}

#[test]
fn only_manager_role_is_manager() {
    let decoder = TokenDecoder::new("s3cret");
    let human = decoder.decode(&sign(&claims(USER_ID, future_exp()), "s3cret")).unwrap();
    assert!(!human.is_manager());

    let manager_claims = Claims { role: Some("manager".into()), ..claims(USER_ID, future_exp()) };
    let manager = decoder.decode(&sign(&manager_claims, "s3cret")).unwrap();
    assert!(manager.is_manager());

    let anonymous = Identity { role: None, ..manager };
    assert!(!anonymous.is_manager());
}
