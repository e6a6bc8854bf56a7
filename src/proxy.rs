/**
 * Copyright (c) 2024-2025 Glaive, Inc.
 *
 * This file is part of Glaive Gateway
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::path::PathBuf;

use async_trait::async_trait;
use pingora::prelude::HttpPeer;
use pingora::proxy::{ProxyHttp, Session};
use pingora::Result;
use tracing::info_span;
use tracing::Instrument;

use crate::aggregator;
use crate::local;

/// Which role this instance serves a request in: reading its own log
/// files, or fanning a query out to peers and merging their answers.
pub enum Mode {
    Local { log_root: PathBuf },
    Aggregator { hosts: Vec<String> },
}

pub struct LogServProxy {
    pub mode: Mode,
}

#[async_trait]
impl ProxyHttp for LogServProxy {
    type CTX = ();

    fn new_ctx(&self) {}

    // Never reached: every request is answered directly in request_filter.
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Ok(Box::new(HttpPeer::new("", false, "".to_string())))
    }

    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool>
    where
        Self::CTX: Send + Sync,
    {
        let header = session.req_header().clone();
        let path = header.uri.path().to_string();
        let span = info_span!("request", method = %header.method, path = %path);

        match &self.mode {
            Mode::Local { log_root } => local::handle(session, log_root).instrument(span).await,
            Mode::Aggregator { hosts } => {
                let raw_query = header.uri.query().unwrap_or("").to_string();
                aggregator::handle(session, hosts, &header.method, &path, &raw_query)
                    .instrument(span)
                    .await
            }
        }
    }
}