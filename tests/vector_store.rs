//! Pinecone client against a mock control plane and data plane.

use anyhow::Result;
use async_trait::async_trait;
use kanun_qa::chunk::build_chunks;
use kanun_qa::config::VectorStoreConfig;
use kanun_qa::embedding::Embedder;
use kanun_qa::extract::parse_document;
use kanun_qa::models::ArticleRef;
use kanun_qa::vector_store::{search_store, upload_chunks, PineconeStore};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

struct ConstantEmbedder;

#[async_trait]
impl Embedder for ConstantEmbedder {
    fn model_name(&self) -> &str {
        "constant"
    }
    fn dims(&self) -> usize {
        4
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
    }
}

fn store_config(server: &MockServer) -> VectorStoreConfig {
    VectorStoreConfig {
        control_plane_url: server.uri(),
        metadata_text_limit: 40,
        ..VectorStoreConfig::default()
    }
}

fn ready_index(server: &MockServer) -> Value {
    json!({
        "name": "kanunlar",
        "host": server.uri(),
        "status": { "ready": true }
    })
}

#[tokio::test]
async fn connect_creates_missing_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .and(header("Api-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "indexes": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "name": "kanunlar" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/kanunlar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_index(&server)))
        .mount(&server)
        .await;

    let store = PineconeStore::connect(&store_config(&server), API_KEY.to_string())
        .await
        .unwrap();
    assert_eq!(store.index_name(), "kanunlar");

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/indexes")
        .unwrap();
    let body: Value = serde_json::from_slice(&create.body).unwrap();
    assert_eq!(body["dimension"], 384);
    assert_eq!(body["metric"], "cosine");
    assert_eq!(body["spec"]["serverless"]["cloud"], "aws");
    assert_eq!(body["spec"]["serverless"]["region"], "us-east-1");
}

#[tokio::test]
async fn connect_reuses_existing_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "indexes": [ready_index(&server)] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    PineconeStore::connect(&store_config(&server), API_KEY.to_string())
        .await
        .unwrap();
}

#[tokio::test]
async fn connect_waits_for_listed_index_without_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{ "name": "kanunlar", "status": { "ready": false } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(409))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/kanunlar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_index(&server)))
        .expect(1)
        .mount(&server)
        .await;

    PineconeStore::connect(&store_config(&server), API_KEY.to_string())
        .await
        .unwrap();
}

#[tokio::test]
async fn upload_sends_batches_of_one_hundred() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "indexes": [ready_index(&server)] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("Api-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 100 })))
        .expect(3)
        .mount(&server)
        .await;

    let mut text = String::from("Büyük Kanun\n");
    for n in 1..=250 {
        text.push_str(&format!("Madde {}: Uzun bir madde metni, numarası {}.\n", n, n));
    }
    let chunks = build_chunks(&[parse_document("https://example.com/9999.txt", &text)]);
    assert_eq!(chunks.len(), 250);

    let config = store_config(&server);
    let store = PineconeStore::connect(&config, API_KEY.to_string())
        .await
        .unwrap();
    let uploaded = upload_chunks(
        &store,
        &ConstantEmbedder,
        &chunks,
        config.batch_size,
        config.metadata_text_limit,
    )
    .await
    .unwrap();
    assert_eq!(uploaded, 250);

    let requests = server.received_requests().await.unwrap();
    let upserts: Vec<Value> = requests
        .iter()
        .filter(|r| r.url.path() == "/vectors/upsert")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    let sizes: Vec<usize> = upserts
        .iter()
        .map(|b| b["vectors"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);

    let first = &upserts[0]["vectors"][0];
    assert_eq!(first["id"], "9999_madde_1");
    assert_eq!(first["metadata"]["kanun_no"], "9999");
    assert_eq!(first["metadata"]["madde_no"], 1);
    assert!(first["metadata"]["text"].as_str().unwrap().chars().count() <= 40);
}

#[tokio::test]
async fn upload_stops_at_failed_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "indexes": [ready_index(&server)] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
        .expect(1)
        .mount(&server)
        .await;

    let text = "Kanun\nMadde 1: a\nMadde 2: b\nMadde 3: c";
    let chunks = build_chunks(&[parse_document("https://example.com/1.txt", text)]);
    let store = PineconeStore::connect(&store_config(&server), API_KEY.to_string())
        .await
        .unwrap();

    let err = upload_chunks(&store, &ConstantEmbedder, &chunks, 2, 1000)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("quota exceeded"));
}

#[tokio::test]
async fn query_returns_store_ranking() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "indexes": [ready_index(&server)] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {
                    "id": "5237_madde_141",
                    "score": 0.91,
                    "metadata": {
                        "kanun_no": "5237",
                        "baslik": "Türk Ceza Kanunu",
                        "madde_no": 141.0,
                        "yayim_tarihi": "12.10.2004",
                        "text": "Kanun: Türk Ceza Kanunu\nMadde 141: Hırsızlık."
                    }
                },
                {
                    "id": "5237_gecici_1",
                    "score": 0.42,
                    "metadata": {
                        "kanun_no": "5237",
                        "baslik": "Türk Ceza Kanunu",
                        "madde_no": "Geçici 1",
                        "text": "Kanun: Türk Ceza Kanunu\nGeçici Madde 1: Geçiş."
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let store = PineconeStore::connect(&store_config(&server), API_KEY.to_string())
        .await
        .unwrap();
    let matches = search_store(&store, &ConstantEmbedder, "hırsızlık", 5)
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].metadata.madde_no, ArticleRef::ordinary(141));
    assert_eq!(matches[1].metadata.madde_no, ArticleRef::provisional(1));
    assert!(matches[1].metadata.yayim_tarihi.is_none());

    let requests = server.received_requests().await.unwrap();
    let query = requests.iter().find(|r| r.url.path() == "/query").unwrap();
    let body: Value = serde_json::from_slice(&query.body).unwrap();
    assert_eq!(body["topK"], 5);
    assert_eq!(body["includeMetadata"], true);
}
