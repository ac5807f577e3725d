//! The hyper 0.14 server loop: bind, accept, dispatch to a handler per `router::Endpoint`, wrap
//! every handler's `Result` through `InfallibleResult` so a domain error becomes a response body
//! instead of a dropped connection. One plain header-based auth extraction and one router, no
//! signature middleware or sub-server split.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};

use crate::blocks;
use crate::context::ApiContext;
use crate::error::Error;
use crate::files;
use crate::helpers::InfallibleResult;
use crate::router::{self, Endpoint};
use crate::vaults;

const VERSION_PREFIX: &str = "/v1.0";

pub async fn run(bind_addr: SocketAddr, ctx: ApiContext) -> Result<(), hyper::Error> {
	let ctx = Arc::new(ctx);

	let make_svc = make_service_fn(move |_conn| {
		let ctx = ctx.clone();
		async move {
			Ok::<_, Infallible>(service_fn(move |req| {
				let ctx = ctx.clone();
				async move { dispatch(ctx, req).await.make_infallible() }
			}))
		}
	});

	info!("Deuce API listening on {}", bind_addr);
	Server::bind(&bind_addr).serve(make_svc).await
}

async fn dispatch(ctx: Arc<ApiContext>, req: Request<Body>) -> Result<Response<Body>, Error> {
	let path = req
		.uri()
		.path()
		.strip_prefix(VERSION_PREFIX)
		.ok_or(Error::NotFound)?;

	let endpoint = router::route(req.method(), path)?;

	match endpoint {
		Endpoint::ListVaults => vaults::list_vaults(&ctx, req).await,
		Endpoint::CreateVault { vault } => vaults::create_vault(&ctx, req, vault).await,
		Endpoint::HeadVault { vault } => vaults::head_vault(&ctx, req, vault).await,
		Endpoint::DeleteVault { vault } => vaults::delete_vault(&ctx, req, vault).await,

		Endpoint::ListBlocks { vault } => blocks::list_blocks(&ctx, req, vault).await,
		Endpoint::PutBlock { vault, block_id } => blocks::put_block(&ctx, req, vault, block_id).await,
		Endpoint::PostBlocksBatch { vault } => blocks::post_blocks_batch(&ctx, req, vault).await,
		Endpoint::GetBlock { vault, block_id } => blocks::get_block(&ctx, req, vault, block_id).await,
		Endpoint::HeadBlock { vault, block_id } => blocks::head_block(&ctx, req, vault, block_id).await,
		Endpoint::DeleteBlock { vault, block_id } => blocks::delete_block(&ctx, req, vault, block_id).await,

		Endpoint::ListFiles { vault } => files::list_files(&ctx, req, vault).await,
		Endpoint::CreateFile { vault } => files::create_file(&ctx, req, vault).await,
		Endpoint::PostFile { vault, file_id } => files::post_file(&ctx, req, vault, file_id).await,
		Endpoint::GetFile { vault, file_id } => files::get_file(&ctx, req, vault, file_id).await,
		Endpoint::ListFileBlocks { vault, file_id } => {
			files::list_file_blocks(&ctx, req, vault, file_id).await
		}
	}
}
