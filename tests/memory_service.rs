use chrono::{Duration, Utc};
use forum_client::models::MutationResult;
use forum_client::service::{memory::MemoryForum, ForumService};
use forum_client::session::{Identity, Session};

fn ok_id(r: MutationResult) -> u64 {
    match r {
        MutationResult::Ok(id) => id,
        MutationResult::Err(msg) => panic!("unexpected rejection: {msg}"),
    }
}

fn err_msg(r: MutationResult) -> String {
    match r {
        MutationResult::Err(msg) => msg,
        MutationResult::Ok(id) => panic!("unexpectedly created {id}"),
    }
}

#[tokio::test]
async fn ids_are_sequential_per_collection() {
    let forum = MemoryForum::new();
    let anon = Session::Anonymous;
    let c1 = ok_id(forum.create_category(&anon, "General", "chat").await.unwrap());
    let c2 = ok_id(forum.create_category(&anon, "Exploits", "bug").await.unwrap());
    assert_eq!((c1, c2), (1, 2));
    let t1 = ok_id(forum.create_topic(&anon, c2, "t", "c").await.unwrap());
    assert_eq!(t1, 1);
    let r1 = ok_id(forum.create_reply(&anon, t1, "r", None).await.unwrap());
    assert_eq!(r1, 1);
}

#[tokio::test]
async fn topics_are_scoped_to_their_category() {
    let forum = MemoryForum::with_default_categories();
    let anon = Session::Anonymous;
    forum.create_topic(&anon, 1, "a", "x").await.unwrap();
    forum.create_topic(&anon, 2, "b", "x").await.unwrap();
    forum.create_topic(&anon, 1, "c", "x").await.unwrap();

    let titles: Vec<_> = forum.get_topics(1).await.unwrap().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["a", "c"]);
    assert!(forum.get_topics(3).await.unwrap().is_empty());
    assert!(forum.get_topics(99).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejections_carry_messages() {
    let forum = MemoryForum::with_default_categories();
    let anon = Session::Anonymous;
    assert_eq!(err_msg(forum.create_category(&anon, "  ", "x").await.unwrap()), "Category name cannot be empty");
    assert_eq!(err_msg(forum.create_topic(&anon, 1, "", "c").await.unwrap()), "Title and content are required");
    assert_eq!(err_msg(forum.create_topic(&anon, 42, "t", "c").await.unwrap()), "Category not found");
    assert_eq!(err_msg(forum.create_reply(&anon, 42, "r", None).await.unwrap()), "Topic not found");

    let t = ok_id(forum.create_topic(&anon, 1, "t", "c").await.unwrap());
    assert_eq!(err_msg(forum.create_reply(&anon, t, " ", None).await.unwrap()), "Reply cannot be empty");
    assert_eq!(err_msg(forum.create_reply(&anon, t, "r", Some(7)).await.unwrap()), "Parent reply not found in this topic");
    assert!(forum.get_replies(t).await.unwrap().is_empty());
}

#[tokio::test]
async fn parent_must_belong_to_same_topic() {
    let forum = MemoryForum::with_default_categories();
    let anon = Session::Anonymous;
    let t1 = ok_id(forum.create_topic(&anon, 1, "one", "c").await.unwrap());
    let t2 = ok_id(forum.create_topic(&anon, 1, "two", "c").await.unwrap());
    let r = ok_id(forum.create_reply(&anon, t1, "root", None).await.unwrap());

    assert!(matches!(forum.create_reply(&anon, t2, "child", Some(r)).await.unwrap(), MutationResult::Err(_)));
    let child = ok_id(forum.create_reply(&anon, t1, "child", Some(r)).await.unwrap());
    let replies = forum.get_replies(t1).await.unwrap();
    assert_eq!(replies.iter().find(|x| x.id == child).unwrap().parent_id, Some(r));
}

#[tokio::test]
async fn records_carry_author_and_timestamp() {
    let forum = MemoryForum::with_default_categories();
    let signed = Session::Authenticated(Identity {
        principal: "aaaaa-aa".into(),
        token: "t".into(),
        expires_at: Utc::now() + Duration::hours(1),
    });
    let before = Utc::now().timestamp_nanos_opt().unwrap() as i128;
    let id = ok_id(forum.create_topic(&signed, 1, "t", "c").await.unwrap());
    let topic = forum.get_topic(id).await.unwrap().unwrap();
    assert_eq!(topic.author, "aaaaa-aa");
    assert!(topic.created_at.nanos().unwrap() >= before);
    assert!(forum.get_topic(id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn clones_share_state() {
    let forum = MemoryForum::new();
    let other = forum.clone();
    forum.create_category(&Session::Anonymous, "General", "chat").await.unwrap();
    assert_eq!(other.get_categories().await.unwrap().len(), 1);
}
