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

//! Domain error taxonomy. Validation errors are raised at the validator
//! layer and converted to responses at the handler boundary; the Engine
//! never catches them. Peer-level errors in the Aggregator are always
//! demoted to `messages[]` and never become a `LogServError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogServError {
    #[error("{0}")]
    Validation(String),

    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    Unexpected(String),
}

impl LogServError {
    pub fn status_code(&self) -> u16 {
        match self {
            LogServError::Validation(_) => 400,
            LogServError::NotFound => 404,
            LogServError::Unexpected(_) => 500,
        }
    }

    /// The message placed in the `{error}` JSON body. `NotFound` and
    /// `Unexpected` always render a fixed, non-leaky message; only
    /// `Validation` echoes caller-relevant detail.
    pub fn body_message(&self) -> String {
        match self {
            LogServError::Validation(msg) => msg.clone(),
            LogServError::NotFound => "Not Found".to_string(),
            LogServError::Unexpected(_) => "Internal Server Error".to_string(),
        }
    }
}

impl From<std::io::Error> for LogServError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => LogServError::NotFound,
            std::io::ErrorKind::UnexpectedEof => {
                LogServError::Unexpected("unexpected end of file".to_string())
            }
            _ => LogServError::Unexpected(err.to_string()),
        }
    }
}
