//! `ferrywatch scope`: show the connection URL a scope produces.

use serde::Serialize;

use ferrywatch_config::profile_endpoint;

use crate::cli::{GlobalOpts, ScopeCmdArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct ScopeView {
    url: String,
    params: Vec<(String, String)>,
}

pub fn handle(args: &ScopeCmdArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let profile = config::resolve_profile(global)?;
    let endpoint = profile_endpoint(&profile)?;
    let scope = config::resolve_scope(&profile, &args.scope);

    let view = ScopeView {
        url: util::websocket_url(&scope.to_url(&endpoint))?.to_string(),
        params: scope.serialize(),
    };

    let rendered = match output::render_structured(global.output, &view)? {
        Some(json) => json,
        None => view.url,
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
