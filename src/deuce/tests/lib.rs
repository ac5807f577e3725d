//! End-to-end integration test: boots a real Deuce API server against the in-memory metadata
//! engine and a temp-dir filesystem block driver, then drives the whole upload/assign/finalize/
//! read path through real HTTP requests using a `hyper::Client`.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use hyper::{Body, Client, Method, Request};

use deuce_api::api_server;
use deuce_api::context::ApiContext;
use deuce_block::{BlockStorageDriver, FsBlockDriver};
use deuce_db::mem_adapter::MemDb;
use deuce_model::MetadataStore;
use deuce_util::config::ApiConfig;

/// Keeps the temp block-storage directory alive for as long as the server runs.
struct TestServer {
	addr: SocketAddr,
	#[allow(dead_code)]
	block_dir: mktemp::Temp,
}

async fn spawn_test_server() -> TestServer {
	// Reserve a free port, then release it; `api_server::run` binds its own listener. The
	// window between release and rebind is negligible for a local test.
	let addr = {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		listener.local_addr().unwrap()
	};

	let db = MemDb::new();
	let store = Arc::new(MetadataStore::new(&db).unwrap());

	let block_dir = mktemp::Temp::new_dir().unwrap();
	let block_driver: Arc<dyn BlockStorageDriver> = Arc::new(FsBlockDriver::new(block_dir.to_path_buf()));

	let ctx = ApiContext::new(store, block_driver, Arc::new(ApiConfig::default()));

	tokio::spawn(async move {
		let _ = api_server::run(addr, ctx).await;
	});

	// Give the listener a moment to come up before the test issues requests.
	tokio::time::sleep(std::time::Duration::from_millis(50)).await;

	TestServer { addr, block_dir }
}

fn req(method: Method, uri: String, project: &str, body: Body) -> Request<Body> {
	Request::builder()
		.method(method)
		.uri(uri)
		.header("X-Project-Id", project)
		.body(body)
		.unwrap()
}

#[tokio::test]
async fn full_upload_assign_finalize_read_cycle() {
	let server = spawn_test_server().await;
	let addr = server.addr;
	let client = Client::new();
	let base = format!("http://{}/v1.0", addr);

	let resp = client
		.request(req(
			Method::PUT,
			format!("{}/vaults/v1", base),
			"proj1",
			Body::empty(),
		))
		.await
		.unwrap();
	assert_eq!(resp.status(), 201);

	let block_data = b"hello world";
	let resp = client
		.request(req(
			Method::PUT,
			format!("{}/vaults/v1/blocks/blockA", base),
			"proj1",
			Body::from(&block_data[..]),
		))
		.await
		.unwrap();
	assert_eq!(resp.status(), 201);
	assert!(resp.headers().contains_key("x-storage-id"));

	let resp = client
		.request(req(
			Method::POST,
			format!("{}/vaults/v1/files", base),
			"proj1",
			Body::empty(),
		))
		.await
		.unwrap();
	assert_eq!(resp.status(), 201);
	let file_id = resp
		.headers()
		.get("x-file-id")
		.unwrap()
		.to_str()
		.unwrap()
		.to_string();

	let assign_body = format!(r#"{{"blocks":[{{"id":"blockA","offset":0}}]}}"#);
	let resp = client
		.request(req(
			Method::POST,
			format!("{}/vaults/v1/files/{}", base, file_id),
			"proj1",
			Body::from(assign_body),
		))
		.await
		.unwrap();
	assert_eq!(resp.status(), 200);
	let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
	let missing: Vec<String> = serde_json::from_slice(&body).unwrap();
	assert!(missing.is_empty());

	let resp = client
		.request(req(
			Method::POST,
			format!("{}/vaults/v1/files/{}", base, file_id),
			"proj1",
			Body::empty(),
		))
		.await
		.unwrap();
	assert_eq!(resp.status(), 200);

	let resp = client
		.request(req(
			Method::GET,
			format!("{}/vaults/v1/files/{}", base, file_id),
			"proj1",
			Body::empty(),
		))
		.await
		.unwrap();
	assert_eq!(resp.status(), 200);
	let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
	assert_eq!(&body[..], &block_data[..]);
}
