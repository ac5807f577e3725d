//! Handlers for `/v1.0/vaults/{v}/blocks` and `/v1.0/vaults/{v}/blocks/{block_id}`, per §6
//! "Blocks". Batch upload decodes a msgpack map of block id to bytes; `rmp_serde` plus
//! `serde_bytes::ByteBuf` avoids a base64 round-trip for the binary payloads.

use std::collections::BTreeMap;

use hyper::{header::HeaderName, Body, Request, Response, StatusCode};
use serde::Deserialize;

use deuce_model::Vault;

use crate::context::{request_context, ApiContext};
use crate::error::Error;
use crate::helpers::{json_body, parse_marker_limit, read_body};
use crate::pagination::{next_batch_header, probe_count, split_page};

pub async fn list_blocks(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let (marker, limit) = parse_marker_limit(req.uri());
	let probe = probe_count(&ctx.api_config, limit);
	let requested_limit = ctx.api_config.determine_limit(limit);

	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	if !vault.exists()? {
		return Err(Error::NotFound);
	}
	let rows = vault.list_blocks(marker.as_deref().unwrap_or(""), probe)?;
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

pub async fn put_block(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
	block_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id.clone());
	if !vault.exists()? {
		return Err(Error::NotFound);
	}

	let body = read_body(req).await?;
	let size = body.len() as u64;

	let storage_id = ctx
		.block_driver
		.put(rctx.project_id(), &vault_id, body)
		.await
		.map_err(Error::Block)?;

	vault.register_block(&block_id, &storage_id, size)?;

	Ok(Response::builder()
		.status(StatusCode::CREATED)
		.header("X-Storage-Id", storage_id)
		.body(Body::empty())
		.unwrap())
}

#[derive(Deserialize)]
struct BatchBlock(#[serde(with = "serde_bytes")] Vec<u8>);

pub async fn post_blocks_batch(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id.clone());
	if !vault.exists()? {
		return Err(Error::NotFound);
	}

	let body = read_body(req).await?;
	let batch: BTreeMap<String, BatchBlock> = rmp_serde::from_slice(&body)
		.map_err(|e| Error::BadRequest(format!("invalid msgpack batch body: {}", e)))?;

	for (block_id, BatchBlock(data)) in batch {
		let size = data.len() as u64;
		let storage_id = ctx
			.block_driver
			.put(rctx.project_id(), &vault_id, bytes::Bytes::from(data))
			.await
			.map_err(Error::Block)?;
		vault.register_block(&block_id, &storage_id, size)?;
	}

	Ok(Response::builder()
		.status(StatusCode::CREATED)
		.body(Body::empty())
		.unwrap())
}

pub async fn get_block(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
	block_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id.clone());
	if !vault.exists()? {
		return Err(Error::NotFound);
	}

	let storage_id = vault
		.get_block_storage_id(&block_id)?
		.ok_or(Error::NotFound)?;

	let stream = ctx
		.block_driver
		.get(rctx.project_id(), &vault_id, &storage_id)
		.await
		.map_err(Error::Block)?;

	Ok(Response::builder()
		.status(StatusCode::OK)
		.header(hyper::header::CONTENT_TYPE, "application/octet-stream")
		.body(Body::wrap_stream(stream))
		.unwrap())
}

pub async fn head_block(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
	block_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	if !vault.exists()? {
		return Err(Error::NotFound);
	}

	if !vault.has_block(&block_id, false)? {
		return Err(Error::NotFound);
	}
	let size = vault.get_block_data(&block_id)?;
	let ref_count = vault.get_block_ref_count(&block_id)?;
	let ref_modified = vault.get_block_ref_modified(&block_id)?;
	let storage_id = vault
		.get_block_storage_id(&block_id)?
		.ok_or(Error::NotFound)?;

	Ok(Response::builder()
		.status(StatusCode::NO_CONTENT)
		.header("X-Block-Reference-Count", ref_count)
		.header("X-Ref-Modified", ref_modified)
		.header("X-Block-Size", size)
		.header("X-Storage-Id", storage_id)
		.body(Body::empty())
		.unwrap())
}

pub async fn delete_block(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
	block_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id.clone());
	if !vault.exists()? {
		return Err(Error::NotFound);
	}

	let storage_id = vault
		.get_block_storage_id(&block_id)?
		.ok_or(Error::NotFound)?;

	vault.unregister_block(&block_id)?;

	ctx.block_driver
		.delete(rctx.project_id(), &vault_id, &storage_id)
		.await
		.map_err(Error::Block)?;

	Ok(Response::builder()
		.status(StatusCode::NO_CONTENT)
		.body(Body::empty())
		.unwrap())
}
