use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use storefront_api::app::{self, AppServices};
use storefront_api::config::{Config, Storage};
use storefront_core::IdStrategy;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(app::router(Arc::new(AppServices::in_memory(IdStrategy::Sequential)))).await
    }

    async fn spawn_with(router: axum::Router) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn product_body(title: &str, price: f64, category: &str) -> Value {
    json!({
        "title": title,
        "description": format!("{title} description"),
        "code": format!("{}-code", title.to_lowercase()),
        "price": price,
        "stock": 5,
        "category": category,
        "thumbnails": [],
    })
}

async fn add_product(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client.post(srv.url("/api/products")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["payload"].clone()
}

async fn create_cart(client: &reqwest::Client, srv: &TestServer) -> String {
    let res = client.post(srv.url("/api/carts")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["payload"]["id"].to_string()
}

async fn expect_error(res: reqwest::Response, status: StatusCode, code: &str) {
    assert_eq!(res.status(), status);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], code);
}

#[tokio::test]
async fn health_reports_success() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn product_lifecycle_add_get_update_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = add_product(&client, &srv, product_body("Kettle", 30.0, "kitchen")).await;
    assert_eq!(created["id"], 1);
    assert_eq!(created["status"], true);
    let url = srv.url("/api/products/1");

    let fetched: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(fetched["payload"], created);

    let res = client
        .put(&url)
        .json(&json!({"id": 99, "price": 25.5, "stock": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["payload"]["id"], 1);
    assert_eq!(updated["payload"]["price"], 25.5);
    assert_eq!(updated["payload"]["stock"], 0);
    assert_eq!(updated["payload"]["title"], "Kettle");

    let res = client.delete(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    expect_error(client.get(&url).send().await.unwrap(), StatusCode::NOT_FOUND, "product_not_found").await;
    expect_error(client.delete(&url).send().await.unwrap(), StatusCode::NOT_FOUND, "product_not_found").await;
}

#[tokio::test]
async fn invalid_products_and_ids_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/products"))
        .json(&product_body("Bad", -1.0, "misc"))
        .send()
        .await
        .unwrap();
    expect_error(res, StatusCode::BAD_REQUEST, "validation_error").await;

    let res = client
        .post(srv.url("/api/products"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    expect_error(res, StatusCode::BAD_REQUEST, "invalid_body").await;

    let res = client.get(srv.url("/api/products/not-an-id")).send().await.unwrap();
    expect_error(res, StatusCode::BAD_REQUEST, "invalid_id").await;
}

#[tokio::test]
async fn listing_paginates_with_links() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for i in 1..=25 {
        add_product(&client, &srv, product_body(&format!("Item {i}"), i as f64, "misc")).await;
    }

    let body: Value = client
        .get(srv.url("/api/products?limit=10&page=3&sort=desc"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let page = &body["payload"];

    let ids: Vec<u64> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["totalItems"], 25);
    assert_eq!(page["hasPrevPage"], true);
    assert_eq!(page["hasNextPage"], false);
    assert_eq!(
        page["prevLink"],
        "/api/products?limit=10&page=2&sort=desc&query=&category=&status="
    );
    assert_eq!(page["nextLink"], Value::Null);
}

#[tokio::test]
async fn listing_filters_and_falls_back_on_bad_params() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    add_product(&client, &srv, product_body("Green Tea", 4.0, "drinks")).await;
    add_product(&client, &srv, product_body("Coffee", 6.0, "drinks")).await;
    let mut hidden = product_body("Black Tea", 5.0, "drinks");
    hidden["status"] = json!(false);
    add_product(&client, &srv, hidden).await;

    let body: Value = client
        .get(srv.url("/api/products?query=TEA&category=drinks&status=true&limit=abc&page=-2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let page = &body["payload"];

    assert_eq!(page["limit"], 10);
    assert_eq!(page["page"], 1);
    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["items"][0]["title"], "Green Tea");
    assert_eq!(page["prevLink"], Value::Null);
}

#[tokio::test]
async fn cart_item_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    add_product(&client, &srv, product_body("Mug", 8.0, "kitchen")).await;
    add_product(&client, &srv, product_body("Spoon", 2.0, "kitchen")).await;
    let cid = create_cart(&client, &srv).await;
    let item_url = srv.url(&format!("/api/carts/{cid}/products/1"));

    // Add twice: a numeric string, then a number. Quantities merge.
    client.post(&item_url).json(&json!({"quantity": "2"})).send().await.unwrap();
    let res = client.post(&item_url).json(&json!({"quantity": 3})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cart: Value = res.json().await.unwrap();
    assert_eq!(cart["payload"]["products"], json!([{"productId": 1, "quantity": 5}]));

    // Bare POST adds one.
    let res = client
        .post(srv.url(&format!("/api/carts/{cid}/products/2")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.put(&item_url).json(&json!({"quantity": 2.0})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let details: Value = client
        .get(srv.url(&format!("/api/carts/{cid}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let lines = details["payload"]["products"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["product"]["title"], "Mug");
    assert_eq!(lines[0]["quantity"], 2);
    assert_eq!(lines[0]["lineTotal"], 16.0);
    assert_eq!(details["payload"]["subtotal"], 18.0);

    let res = client.delete(&item_url).send().await.unwrap();
    let cart: Value = res.json().await.unwrap();
    assert_eq!(cart["payload"]["products"], json!([{"productId": 2, "quantity": 1}]));

    // Removing an absent product is a no-op.
    let res = client.delete(&item_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.delete(srv.url(&format!("/api/carts/{cid}"))).send().await.unwrap();
    let cart: Value = res.json().await.unwrap();
    assert_eq!(cart["payload"]["products"], json!([]));
}

#[tokio::test]
async fn cart_errors_map_to_statuses() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    add_product(&client, &srv, product_body("Mug", 8.0, "kitchen")).await;
    let cid = create_cart(&client, &srv).await;

    let res = client
        .post(srv.url(&format!("/api/carts/{cid}/products/1")))
        .json(&json!({"quantity": 2.5}))
        .send()
        .await
        .unwrap();
    expect_error(res, StatusCode::BAD_REQUEST, "invalid_quantity").await;

    let res = client
        .post(srv.url(&format!("/api/carts/{cid}/products/1")))
        .json(&json!({"quantity": 0}))
        .send()
        .await
        .unwrap();
    expect_error(res, StatusCode::BAD_REQUEST, "invalid_quantity").await;

    let res = client
        .post(srv.url(&format!("/api/carts/{cid}/products/42")))
        .send()
        .await
        .unwrap();
    expect_error(res, StatusCode::NOT_FOUND, "product_not_found").await;

    let res = client
        .put(srv.url(&format!("/api/carts/{cid}/products/1")))
        .json(&json!({"quantity": 1}))
        .send()
        .await
        .unwrap();
    expect_error(res, StatusCode::NOT_FOUND, "item_not_found").await;

    let res = client.get(srv.url("/api/carts/777")).send().await.unwrap();
    expect_error(res, StatusCode::NOT_FOUND, "cart_not_found").await;
}

#[tokio::test]
async fn bad_quantity_updates_leave_the_cart_unchanged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    add_product(&client, &srv, product_body("Mug", 8.0, "kitchen")).await;
    let cid = create_cart(&client, &srv).await;
    let item_url = srv.url(&format!("/api/carts/{cid}/products/1"));

    let res = client.post(&item_url).json(&json!({"quantity": 3})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for quantity in [json!(0), json!(-1), json!(2.5)] {
        let res = client
            .put(&item_url)
            .json(&json!({ "quantity": quantity }))
            .send()
            .await
            .unwrap();
        expect_error(res, StatusCode::BAD_REQUEST, "invalid_quantity").await;
    }

    let res = client.get(srv.url(&format!("/api/carts/{cid}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cart: Value = res.json().await.unwrap();
    let lines = cart["payload"]["products"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["productId"], 1);
    assert_eq!(lines[0]["quantity"], 3);
}

#[tokio::test]
async fn set_items_replaces_and_rejects_duplicates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    add_product(&client, &srv, product_body("Mug", 8.0, "kitchen")).await;
    add_product(&client, &srv, product_body("Spoon", 2.0, "kitchen")).await;
    let cid = create_cart(&client, &srv).await;
    let url = srv.url(&format!("/api/carts/{cid}"));

    let res = client
        .put(&url)
        .json(&json!({"products": [{"productId": 2, "quantity": 3}, {"productId": "1", "quantity": "1"}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cart: Value = res.json().await.unwrap();
    assert_eq!(
        cart["payload"]["products"],
        json!([{"productId": 2, "quantity": 3}, {"productId": 1, "quantity": 1}])
    );

    let res = client
        .put(&url)
        .json(&json!({"products": [{"productId": 1, "quantity": 1}, {"productId": 1, "quantity": 2}]}))
        .send()
        .await
        .unwrap();
    expect_error(res, StatusCode::BAD_REQUEST, "validation_error").await;

    // The rejected request left the cart as it was.
    let details: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(details["payload"]["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_carts_acknowledges_counts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let cid = create_cart(&client, &srv).await;
    create_cart(&client, &srv).await;
    create_cart(&client, &srv).await;

    let purge = srv.url(&format!("/api/carts/{cid}/purge"));
    let ack: Value = client.delete(&purge).send().await.unwrap().json().await.unwrap();
    assert_eq!(ack["payload"]["deletedCount"], 1);
    let ack: Value = client.delete(&purge).send().await.unwrap().json().await.unwrap();
    assert_eq!(ack["payload"]["deletedCount"], 0);

    let ack: Value = client
        .delete(srv.url("/api/carts/all"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ack["payload"]["deletedCount"], 2);
}

#[tokio::test]
async fn catalog_events_stream_over_sse() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut stream = client.get(srv.url("/api/products/events")).send().await.unwrap();
    assert_eq!(stream.status(), StatusCode::OK);

    add_product(&client, &srv, product_body("Lamp", 12.0, "home")).await;

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buf = String::new();
        while let Some(chunk) = stream.chunk().await.unwrap() {
            buf.push_str(&String::from_utf8_lossy(&chunk));
            if buf.contains("\n\n") {
                break;
            }
        }
        buf
    })
    .await
    .expect("no SSE event within timeout");

    assert!(received.contains("event: catalog.product.added"), "{received}");
    assert!(received.contains("\"title\":\"Lamp\""), "{received}");
}

#[tokio::test]
async fn file_backend_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        storage: Storage::File {
            data_dir: dir.path().to_path_buf(),
        },
        id_strategy: IdStrategy::Sequential,
        ..Config::default()
    };
    let client = reqwest::Client::new();

    {
        let srv = TestServer::spawn_with(app::build_app(&config).await.unwrap()).await;
        add_product(&client, &srv, product_body("Kettle", 30.0, "kitchen")).await;
    }

    let srv = TestServer::spawn_with(app::build_app(&config).await.unwrap()).await;
    let body: Value = client
        .get(srv.url("/api/products/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["payload"]["title"], "Kettle");
    assert!(dir.path().join("products.json").exists());
}
