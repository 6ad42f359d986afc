// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! r2d2 plumbing for Oracle connections.
//!
//! Concurrent table runs share a bounded pool of connections instead of
//! connecting per page; this manager tells r2d2 how to open and validate
//! them. Connections are validated with a server ping on checkout, so a
//! connection that died between pages is replaced before the next fetch
//! sees it.

use oracle::{Connection, Error};
use r2d2::ManageConnection;

/// Connection factory handed to the r2d2 pool.
///
/// Owns the credentials and the easy-connect descriptor
/// (`//host:port/service`) so pooled connections can be re-established
/// at any point in a run.
#[derive(Debug)]
pub struct OracleConnectionManager {
    username: String,
    password: String,
    connect_descriptor: String,
}

impl OracleConnectionManager {
    pub fn new(username: &str, password: &str, connect_descriptor: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            connect_descriptor: connect_descriptor.to_string(),
        }
    }
}

impl ManageConnection for OracleConnectionManager {
    type Connection = Connection;
    type Error = Error;

    fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        Connection::connect(&self.username, &self.password, &self.connect_descriptor)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.ping()
    }

    /// Breakage is only detected by the checkout ping above; there is no
    /// cheaper liveness signal to consult between uses.
    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
