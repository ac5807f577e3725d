//! Handlers for `/v1.0/vaults/{v}/files` and its sub-routes, per §6 "Files".
//!
//! The empty-body POST (finalize) and the JSON-body POST (assign) share one path and are told
//! apart by whether the request body is empty. Finalize never receives a client-supplied size
//! over the wire — §6 only documents an empty body for it — so it always calls `finalize_file`
//! with `None` (see DESIGN.md's note on this).

use hyper::{header::HeaderName, Body, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use deuce_model::reassembly::reassemble_file;
use deuce_model::Vault;

use crate::context::{request_context, ApiContext};
use crate::error::Error;
use crate::helpers::{json_body, parse_marker_limit, read_body};
use crate::pagination::{next_batch_header, probe_count, split_page};

pub async fn list_files(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let (marker, limit) = parse_marker_limit(req.uri());
	let probe = probe_count(&ctx.api_config, limit);
	let requested_limit = ctx.api_config.determine_limit(limit);
	let finalized = finalized_filter(req.uri());

	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	if !vault.exists()? {
		return Err(Error::NotFound);
	}
	let rows = vault.list_files(marker.as_deref().unwrap_or(""), probe, finalized)?;
	let (page, next_marker) = split_page(rows, requested_limit);

	let mut resp = json_body(StatusCode::OK, &page);
	if let Some(marker) = next_marker {
		resp.headers_mut().insert(
			HeaderName::from_static("x-next-batch"),
			next_batch_header(req.uri(), req.headers(), &marker, requested_limit),
		);
	}
	Ok(resp)
}

fn finalized_filter(uri: &hyper::Uri) -> bool {
	uri.query()
		.and_then(|q| form_urlencoded::parse(q.as_bytes()).find(|(k, _)| k == "finalized"))
		.map(|(_, v)| v == "true" || v == "1")
		.unwrap_or(false)
}

pub async fn create_file(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	if !vault.exists()? {
		return Err(Error::NotFound);
	}
	let file_id = new_file_id();
	vault.create_file(&file_id)?;

	Ok(Response::builder()
		.status(StatusCode::CREATED)
		.header(hyper::header::LOCATION, format!("files/{}", file_id))
		.header("X-File-Id", file_id)
		.body(Body::empty())
		.unwrap())
}

fn new_file_id() -> String {
	use rand::RngCore;
	let mut bytes = [0u8; 16];
	rand::thread_rng().fill_bytes(&mut bytes);
	hex::encode(bytes)
}

#[derive(Deserialize)]
struct BlockAssignment {
	id: String,
	offset: u64,
}

#[derive(Deserialize)]
struct AssignBody {
	blocks: Vec<BlockAssignment>,
}

#[derive(Serialize)]
struct FileBlockView {
	id: String,
	offset: u64,
}

/// Dispatches on the request body: empty finalizes the file, non-empty assigns blocks.
pub async fn post_file(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
	file_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	let body = read_body(req).await?;

	if body.is_empty() {
		finalize(&vault, &file_id)
	} else {
		assign(&vault, &file_id, &body)
	}
}

fn finalize(vault: &Vault, file_id: &str) -> Result<Response<Body>, Error> {
	vault.finalize_file(file_id, None)?;
	Ok(Response::builder()
		.status(StatusCode::OK)
		.body(Body::empty())
		.unwrap())
}

fn assign(vault: &Vault, file_id: &str, body: &[u8]) -> Result<Response<Body>, Error> {
	let parsed: AssignBody = serde_json::from_slice(body)
		.map_err(|e| Error::BadRequest(format!("invalid assignment body: {}", e)))?;

	let assignments: Vec<(String, u64)> = parsed
		.blocks
		.iter()
		.map(|b| (b.id.clone(), b.offset))
		.collect();

	let block_ids: Vec<String> = parsed.blocks.iter().map(|b| b.id.clone()).collect();
	let missing = vault.missing_blocks(&block_ids)?;

	vault.assign_blocks(file_id, &assignments)?;

	Ok(json_body(StatusCode::OK, &missing))
}

pub async fn get_file(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
	file_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = std::sync::Arc::new(Vault::new(ctx.store.clone(), &rctx, vault_id.clone()));

	if !vault.has_file(&file_id)? {
		return Err(Error::NotFound);
	}

	let stream = reassemble_file(
		vault,
		ctx.block_driver.clone(),
		rctx.project_id().to_string(),
		vault_id,
		file_id,
	);

	Ok(Response::builder()
		.status(StatusCode::OK)
		.header(hyper::header::CONTENT_TYPE, "application/octet-stream")
		.body(Body::wrap_stream(stream))
		.unwrap())
}

pub async fn list_file_blocks(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
	file_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let (marker, limit) = parse_marker_limit(req.uri());

	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	if !vault.has_file(&file_id)? {
		return Err(Error::NotFound);
	}

	let offset = marker.and_then(|m| m.parse::<u64>().ok());
	let rows = vault.list_file_blocks(&file_id, offset, limit)?;
	let view: Vec<FileBlockView> = rows
		.into_iter()
		.map(|(id, offset)| FileBlockView { id, offset })
		.collect();

	Ok(json_body(StatusCode::OK, &view))
}
