use super::*;

fn caller() -> Identity {
    Identity {
        id: ObjectId::new(),
        uid: "kakao-1".into(),
        name: "Mina".into(),
        picture: None,
        role: None,
        location: Some("suwon".into()),
    }
}

fn input(category: &str, title: &str, content: &str) -> NewRequest {
    NewRequest { category: category.into(), title: title.into(), content: content.into(), location: None }
}

#[test]
fn request_takes_writer_and_location_from_caller() {
    let request = input(" Suggestion ", " More seats ", "Please").into_request(&caller(), DateTime::from_millis(0)).unwrap();
    assert_eq!(request.category, "suggestion");
    assert_eq!(request.title, "More seats");
    assert_eq!(request.writer, "kakao-1");
    assert_eq!(request.location.as_deref(), Some("suwon"));
}

#[test]
fn explicit_location_wins() {
    let mut new = input("report", "Noise", "Too loud");
    new.location = Some("yangcheon".into());
    let request = new.into_request(&caller(), DateTime::from_millis(0)).unwrap();
    assert_eq!(request.location.as_deref(), Some("yangcheon"));
}

#[test]
fn blank_and_oversized_fields_are_rejected() {
    let now = DateTime::from_millis(0);
    let err = input(" ", "t", "c").into_request(&caller(), now).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(msg) if msg == "category is required"));

    let err = input("report", "t", "  ").into_request(&caller(), now).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(msg) if msg == "content is required"));

    let long_title = "x".repeat(MAX_TITLE_CHARS + 1);
    assert!(input("report", &long_title, "c").into_request(&caller(), now).is_err());
}

#[test]
fn category_filter_is_optional() {
    assert_eq!(category_filter(None), doc! {});
    assert_eq!(category_filter(Some("  ")), doc! {});
    assert_eq!(category_filter(Some("Report")), doc! { "category": "report" });
}

#[test]
fn view_renders_ids_and_timestamps() {
    let id = ObjectId::parse_str("65a1f0c2b4d3e2a1f0c2b4d3").unwrap();
    let mut request = input("report", "t", "c").into_request(&caller(), DateTime::from_millis(0)).unwrap();
    request.id = Some(id);

    let json = serde_json::to_value(RequestView::from(request)).unwrap();
    assert_eq!(json["id"], "65a1f0c2b4d3e2a1f0c2b4d3");
    assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::state::test_helpers::live_database;

    #[tokio::test]
    async fn filed_requests_are_listed_newest_first() {
        let db = live_database().await;
        create_request(&db, &caller(), input("report", "first", "c")).await.unwrap();
        create_request(&db, &caller(), input("suggestion", "second", "c")).await.unwrap();

        let all = get_requests(&db, None).await.unwrap();
        assert_eq!(all.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(), vec!["second", "first"]);
        assert_eq!(get_requests(&db, Some("report")).await.unwrap().len(), 1);
    }
}
