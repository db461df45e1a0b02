use campus_market_engine::{db_types::ProfileUpdate, order_objects::Pagination, ErrorCode};
use support::prepare_env::{address, prepare_test_env, tear_down, DEFAULT_TEST_FEE_BPS};

mod support;

#[tokio::test]
async fn points_total_is_the_sum_of_the_log() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let points = &test.market.points;
    let student = address("student");

    assert_eq!(points.total(&student).await.unwrap(), 0);
    assert_eq!(points.award(&student, 10, "first order").await.unwrap(), 10);
    assert_eq!(points.award(&student, 5, "review").await.unwrap(), 15);
    assert_eq!(points.deduct(&student, 3, "coupon").await.unwrap(), 12);
    assert_eq!(points.total(&student).await.unwrap(), 12);

    let history = points.history(&student, None).await.unwrap();
    assert_eq!(history.iter().map(|e| e.delta).collect::<Vec<_>>(), vec![-3, 5, 10]);
    assert_eq!(history[0].reason, "coupon");

    let page = points.history(&student, Some(Pagination::new(1, 1))).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].delta, 5);
    let err = points.history(&student, Some(Pagination::new(-1, 10))).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    // Other addresses are unaffected
    assert_eq!(points.total(&address("other")).await.unwrap(), 0);
    assert!(points.history(&address("other"), None).await.unwrap().is_empty());
    tear_down(test).await;
}

#[tokio::test]
async fn points_cannot_go_negative() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let points = &test.market.points;
    let student = address("student");
    points.award(&student, 4, "welcome").await.unwrap();

    let err = points.deduct(&student, 5, "big coupon").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(points.total(&student).await.unwrap(), 4);
    assert_eq!(points.history(&student, None).await.unwrap().len(), 1);

    for bad in [0, -2] {
        let err = points.award(&student, bad, "nothing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let err = points.deduct(&student, bad, "nothing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
    let err = points.award(&student, 1, "  ").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    assert_eq!(points.deduct(&student, 4, "spend it all").await.unwrap(), 0);
    tear_down(test).await;
}

#[tokio::test]
async fn concurrent_awards_are_all_recorded() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let points = &test.market.points;
    let student = address("student");

    let (a, b, c) =
        tokio::join!(points.award(&student, 1, "a"), points.award(&student, 2, "b"), points.award(&student, 4, "c"));
    a.unwrap();
    b.unwrap();
    c.unwrap();
    assert_eq!(points.total(&student).await.unwrap(), 7);
    assert_eq!(points.history(&student, None).await.unwrap().len(), 3);
    tear_down(test).await;
}

#[tokio::test]
async fn profiles_carry_their_points_total() {
    let test = prepare_test_env(DEFAULT_TEST_FEE_BPS).await;
    let market = &test.market;
    let student = address("student");

    let err = market.profiles.fetch(&student).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    market.points.award(&student, 20, "sign up").await.unwrap();
    let update = ProfileUpdate::default().with_name("Mei").with_school("Fudan").with_campus("Handan");
    let profile = market.profiles.upsert(&student, update).await.unwrap();
    assert_eq!(profile.address, student);
    assert_eq!(profile.name.as_deref(), Some("Mei"));
    assert_eq!(profile.points, 20);

    // Fields that are not supplied keep their value
    let profile = market.profiles.upsert(&student, ProfileUpdate::default().with_phone("555-0100")).await.unwrap();
    assert_eq!(profile.name.as_deref(), Some("Mei"));
    assert_eq!(profile.school.as_deref(), Some("Fudan"));
    assert_eq!(profile.phone.as_deref(), Some("555-0100"));
    assert!(profile.avatar.is_none());

    market.points.deduct(&student, 5, "coupon").await.unwrap();
    let fetched = market.profiles.fetch(&student).await.unwrap();
    assert_eq!(fetched.points, 15);
    assert_eq!(fetched.campus.as_deref(), Some("Handan"));

    let err = market.profiles.upsert(&student, ProfileUpdate::default().with_name(" ")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    tear_down(test).await;
}
