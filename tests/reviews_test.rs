//! Review submission from anonymous and signed-in customers.

mod common;

use axum::http::StatusCode;
use common::{location, response_json, TestApp};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;
use storefront_api::entities::review;

#[tokio::test]
async fn anonymous_review_shows_the_given_name() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let slug = &catalog.product.slug;

    let response = app
        .post_form(
            &format!("/reviews/{}/", slug),
            &[
                ("name", "Karim"),
                ("email", "karim@example.com"),
                ("rating", "4"),
                ("review", "  Fits well  "),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/{}/", slug));

    let page = response_json(app.get(&format!("/{}/", slug)).await).await;
    assert_eq!(page["reviews_count"], 1);
    let shown = &page["reviews"][0];
    assert_eq!(shown["username"], "Karim");
    assert_eq!(shown["from_user"], false);
    assert_eq!(shown["rating"], 4);
    assert_eq!(shown["review"], "Fits well");
}

#[tokio::test]
async fn signed_in_review_uses_the_account_name() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let slug = &catalog.product.slug;

    let response = app
        .post_form_authed(
            &format!("/reviews/{}/", slug),
            &[("name", "Somebody else"), ("rating", "5"), ("review", "Great linen")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let page = response_json(app.get(&format!("/{}/", slug)).await).await;
    let shown = &page["reviews"][0];
    assert_eq!(shown["username"], "Mona Hassan");
    assert_eq!(shown["from_user"], true);
}

#[tokio::test]
async fn invalid_review_is_rejected_with_field_errors() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let uri = format!("/reviews/{}/", catalog.product.slug);

    let response = app
        .post_form(&uri, &[("rating", "9"), ("review", "Too good"), ("email", "nope")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["details"]["rating"].is_array());
    assert!(body["details"]["email"].is_array());

    let response = app.post_form(&uri, &[("rating", "3")]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["details"]["review"].is_array());

    assert_eq!(review::Entity::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn reviewing_an_unknown_product_is_not_found() {
    let app = TestApp::new().await;
    app.seed_catalog().await;

    let response = app
        .post_form("/reviews/no-such-product/", &[("rating", "5"), ("review", "?")])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_or_garbled_rating_is_a_field_error() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let uri = format!("/reviews/{}/", catalog.product.slug);

    for rating in ["", "abc"] {
        let response = app
            .post_form(&uri, &[("rating", rating), ("review", "Nice")])
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response_json(response).await;
        assert!(body["details"]["rating"].is_array(), "rating {:?}", rating);
    }
    assert_eq!(review::Entity::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn listed_reviews_match_the_product_page() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let uri = format!("/reviews/{}/", catalog.product.slug);

    app.post_form(&uri, &[("name", "Karim"), ("rating", "4"), ("review", "Fits well")])
        .await;
    app.post_form_authed(&uri, &[("rating", "5"), ("review", "Great linen")])
        .await;

    let listed = app
        .state
        .services
        .reviews
        .list_for_product(catalog.product.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    let usernames: Vec<Option<&str>> = listed.iter().map(|r| r.username.as_deref()).collect();
    assert!(usernames.contains(&Some("Karim")));
    assert!(usernames.contains(&Some("Mona Hassan")));

    let page = response_json(app.get(&format!("/{}/", catalog.product.slug)).await).await;
    assert_eq!(page["reviews_count"], 2);
    let by_id = |value: &Value| {
        let mut reviews = value.as_array().unwrap().clone();
        reviews.sort_by_key(|r| r["id"].as_str().unwrap().to_string());
        reviews
    };
    assert_eq!(by_id(&page["reviews"]), by_id(&serde_json::to_value(&listed).unwrap()));
}
