use warp::{reject::Rejection, reply::Reply, Filter};

pub mod context;
pub mod handlers;

pub use context::{with_context, AppContext};

/// Upper bound on JSON request bodies; export requests carry every extracted row.
const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

static INDEX_HTML: &str = include_str!("index.html");

/// Every route of the service.
pub fn routes(ctx: AppContext) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML));

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::health_check);

    let policies = warp::path!("api" / "policies")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::list_policies);

    let extract = warp::path!("api" / "extract")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(with_context(ctx))
        .and_then(handlers::extract);

    let export = warp::path!("api" / "export-csv")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and_then(handlers::export_csv);

    index
        .or(health)
        .or(policies)
        .or(extract)
        .or(export)
        .with(warp::trace::request())
}
