use reqwest::Client;
use std::{convert::Infallible, sync::Arc};
use warp::Filter;

use crate::config::Config;

/// Everything a handler needs, handed to it per request.
/// Cheap to clone: the client and config are shared.
#[derive(Clone)]
pub struct AppContext {
    pub client: Client,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(client: Client, config: Config) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

pub fn with_context(
    ctx: AppContext,
) -> impl Filter<Extract = (AppContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}
