use microblog_api::domain::{
    engagement::entity::{EngagementKind, TargetKind, TargetRef},
    shared::{
        ids::TopicId,
        pagination::{CursorPage, MAX_PAGE_LEN},
    },
};

#[test]
fn topic_ids_render_as_24_hex_chars_and_parse_back() {
    let id = TopicId::generate();
    let hex = id.to_hex();
    assert_eq!(hex.len(), 24);
    assert_eq!(TopicId::parse_hex(&hex).unwrap(), id);
}

#[test]
fn topic_ids_reject_malformed_hex() {
    assert!(TopicId::parse_hex("abc").is_err());
    assert!(TopicId::parse_hex(&"z".repeat(24)).is_err());
}

#[test]
fn later_topic_ids_sort_after_earlier_ones() {
    let earlier = TopicId::generate_at(chrono::Utc::now() - chrono::Duration::seconds(60));
    let later = TopicId::generate();
    assert!(earlier < later);
}

#[test]
fn page_defaults_are_clamped() {
    let page = CursorPage::new(Some(0), Some(500));
    assert_eq!(page.from, None);
    assert_eq!(page.len, MAX_PAGE_LEN);
    assert_eq!(page.upper_bound(), i64::MAX);
}

#[test]
fn like_and_dislike_oppose_each_other_only() {
    assert_eq!(EngagementKind::Like.opposing(), Some(EngagementKind::Dislike));
    assert_eq!(EngagementKind::Dislike.opposing(), Some(EngagementKind::Like));
    assert_eq!(EngagementKind::Favourite.opposing(), None);
    assert_eq!(EngagementKind::Follow.opposing(), None);
}

#[test]
fn targets_accept_only_their_engagement_kinds() {
    assert!(TargetKind::Post.supports(EngagementKind::Favourite));
    assert!(!TargetKind::Post.supports(EngagementKind::Dislike));
    assert!(TargetKind::Topic.supports(EngagementKind::Dislike));
    assert!(!TargetKind::Comment.supports(EngagementKind::Favourite));
    assert!(TargetKind::User.supports(EngagementKind::Follow));
    assert_eq!(TargetRef::post(7).kind, TargetKind::Post);
}
