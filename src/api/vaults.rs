//! Handlers for `/v1.0/vaults` and `/v1.0/vaults/{vault_id}`, per §6 "Vaults".

use hyper::{header::HeaderName, Body, Request, Response, StatusCode};

use deuce_model::Vault;

use crate::context::{request_context, ApiContext};
use crate::error::Error;
use crate::helpers::{json_body, parse_marker_limit};
use crate::pagination::{next_batch_header, probe_count, split_page};

pub async fn list_vaults(ctx: &ApiContext, req: Request<Body>) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let (marker, limit) = parse_marker_limit(req.uri());
	let probe = probe_count(&ctx.api_config, limit);
	let requested_limit = ctx.api_config.determine_limit(limit);

	let rows = Vault::list(&ctx.store, &rctx, marker.as_deref().unwrap_or(""), probe)?;
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

pub async fn create_vault(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	vault.create()?;
	Ok(Response::builder()
		.status(StatusCode::CREATED)
		.body(Body::empty())
		.unwrap())
}

pub async fn head_vault(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	if !vault.exists()? {
		return Err(Error::NotFound);
	}
	let stats = vault.stats()?;

	Ok(Response::builder()
		.status(StatusCode::NO_CONTENT)
		.header("X-File-Count", stats.files.count)
		.header("X-Bad-File-Count", stats.files.bad)
		.header("X-Block-Count", stats.blocks.count)
		.header("X-Bad-Block-Count", stats.blocks.bad)
		.body(Body::empty())
		.unwrap())
}

pub async fn delete_vault(
	ctx: &ApiContext,
	req: Request<Body>,
	vault_id: String,
) -> Result<Response<Body>, Error> {
	let rctx = request_context(&req)?;
	let vault = Vault::new(ctx.store.clone(), &rctx, vault_id);
	vault.delete()?;
	Ok(Response::builder()
		.status(StatusCode::NO_CONTENT)
		.body(Body::empty())
		.unwrap())
}
