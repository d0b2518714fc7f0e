//! Checkout: shipping form, order placement and the pending-order handoff.

mod common;

use axum::http::StatusCode;
use common::{location, response_json, TestApp};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use storefront_api::entities::{order, order_item, shipping_info, OrderStatus};

#[tokio::test]
async fn checkout_requires_a_signed_in_customer() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    app.add_to_cart(&catalog.white_m, 1).await;

    assert_eq!(app.get("/checkout/").await.status(), StatusCode::UNAUTHORIZED);
    let response = app
        .post_form("/checkout/", &[("first_name", "Mona")])
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_cart_goes_back_to_the_shop() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    let response = app.get_authed("/checkout/").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/shop");

    let response = app.place_order(&catalog.city).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/shop");
    assert_eq!(order::Entity::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn form_is_prefilled_from_the_account_then_from_last_shipping() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    app.add_to_cart(&catalog.white_m, 2).await;

    let page = response_json(app.get_authed("/checkout/").await).await;
    assert_eq!(page["state"], "form");
    assert_eq!(page["form"]["first_name"], "Mona");
    assert_eq!(page["form"]["email"], "mona@example.com");
    assert_eq!(page["form"]["address"], "");
    assert_eq!(page["subtotal"], "50.00");
    assert_eq!(page["shipping_fee"], "10.00");
    assert_eq!(page["total"], "60.00");
    assert_eq!(page["cities"][0]["name"], "Cairo");
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    assert_eq!(app.place_order(&catalog.city).await.status(), StatusCode::FOUND);

    app.add_to_cart(&catalog.white_s, 1).await;
    let page = response_json(app.get_authed("/checkout/").await).await;
    assert_eq!(page["form"]["address"], "12 Nile St");
    assert_eq!(page["form"]["phone_number"], "+201012345678");
    assert_eq!(page["form"]["city_id"], catalog.city.id.to_string());
}

#[tokio::test]
async fn placing_an_order_snapshots_the_cart() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    app.add_to_cart(&catalog.white_m, 2).await;
    app.add_to_cart(&catalog.navy_m, 1).await;

    let response = app.place_order(&catalog.city).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/checkout/pay/");

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    let placed = &orders[0];
    assert_eq!(placed.user_id, app.customer.id);
    assert_eq!(placed.status, OrderStatus::Pending);
    assert!(!placed.is_paid);
    // 2 x 25.00 + 1 x 20.00 + 10.00 shipping
    assert_eq!(placed.total_cents, 8000);

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(placed.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    let navy = items
        .iter()
        .find(|i| i.variation_id == catalog.navy_m.id)
        .unwrap();
    assert_eq!(navy.quantity, 1);
    assert_eq!(navy.total_cents, 2000);

    let shipping = shipping_info::Entity::find_by_id(placed.shipping_info_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipping.city_id, Some(catalog.city.id));
    assert_eq!(shipping.phone_number, "+201012345678");

    assert_eq!(app.cart_json().await["length"], 0);
    assert_eq!(app.notifier.sent(), vec![(app.customer.email.clone(), placed.id)]);
}

#[tokio::test]
async fn shipping_details_are_reused_across_orders() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    app.add_to_cart(&catalog.white_m, 1).await;
    app.place_order(&catalog.city).await;
    app.add_to_cart(&catalog.white_s, 1).await;
    app.place_order(&catalog.city).await;

    assert_eq!(order::Entity::find().count(&*app.state.db).await.unwrap(), 2);
    let infos = shipping_info::Entity::find()
        .filter(shipping_info::Column::UserId.eq(app.customer.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(infos, 1);
}

#[tokio::test]
async fn invalid_form_reports_fields_and_keeps_the_cart() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    app.add_to_cart(&catalog.white_m, 1).await;

    let response = app
        .post_form_authed(
            "/checkout/",
            &[
                ("first_name", "Mona"),
                ("last_name", ""),
                ("email", "not-an-email"),
                ("address", "12 Nile St"),
                ("postal_code", "11511"),
                ("phone_number", "12"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_json(response).await;
    let details = &body["details"];
    assert!(details["last_name"].is_array());
    assert!(details["email"].is_array());
    assert!(details["phone_number"].is_array());
    assert!(details["first_name"].is_null());

    assert_eq!(order::Entity::find().count(&*app.state.db).await.unwrap(), 0);
    assert_eq!(app.cart_json().await["length"], 1);
}

#[tokio::test]
async fn unknown_city_is_a_form_error() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    app.add_to_cart(&catalog.white_m, 1).await;

    let missing_city = uuid::Uuid::new_v4().to_string();
    let mut fields = app.shipping_fields(&catalog.city);
    for (key, value) in fields.iter_mut() {
        if *key == "city_id" {
            *value = missing_city.clone();
        }
    }
    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();

    let response = app.post_form_authed("/checkout/", &borrowed).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["details"]["city_id"].is_array());
    assert_eq!(order::Entity::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn order_keeps_the_price_from_when_the_item_was_added() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    app.add_to_cart(&catalog.white_m, 2).await;

    let mut draft = TestApp::draft_of(&catalog.white_m);
    draft.price_cents = Some(4000);
    let repriced = app
        .state
        .services
        .catalog
        .update_variation(catalog.white_m.id, draft)
        .await
        .unwrap();
    assert_eq!(repriced.price_cents, 4000);

    assert_eq!(app.place_order(&catalog.city).await.status(), StatusCode::FOUND);

    let placed = order::Entity::find()
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    // 2 x 25.00 at add time + 10.00 shipping
    assert_eq!(placed.total_cents, 6000);

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(placed.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].total_cents, 5000);
}
