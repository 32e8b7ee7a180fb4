//! # hivconnect
//!
//! Content tooling for the HIV Connect Central NJ provider directory.
//!
//! The directory's content lives in a hosted CMS. This crate holds the parts
//! we own around it: the change logger the CMS hooks report into, a typed
//! copy of the collection schemas, the SQL those schemas imply, and the
//! scripts that import, seed, and check content over the CMS REST API.
//!
//! ## Architecture
//!
//! ```text
//!  CMS mutation ──▶ hook receiver ──▶ ChangeHooks ──▶ ChangeLogger ──▶ stdout
//!                   (server)          (hooks)         (change_log)
//!
//!  hvc import / seed / crud-check ──▶ CmsClient ──▶ CMS REST API
//!        │                            (client)
//!        └── defaults + validation from schema / collections
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hvc collections                          # list configured schemas
//! hvc migrate sql > up.sql                 # render the DDL
//! hvc serve hooks                          # start the hook receiver
//! ADMIN_PASSWORD=… hvc import providers.json --target staging
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`change_log`] | De-duplicating content change logger |
//! | [`hooks`] | Collection and global mutation hooks |
//! | [`schema`] | Field, collection, and access types |
//! | [`collections`] | Concrete collection and global definitions |
//! | [`migrate`] | SQLite DDL generation |
//! | [`models`] | Typed records used by the scripts |
//! | [`client`] | CMS REST client |
//! | [`import`] | Bulk provider import |
//! | [`crud_check`] | CRUD smoke test |
//! | [`seed`] | FAQ and navigation seeding |
//! | [`deploy_hook`] | Cloudflare deploy-hook deletion |
//! | [`server`] | Hook receiver HTTP server |

pub mod change_log;
pub mod client;
pub mod collections;
pub mod config;
pub mod crud_check;
pub mod deploy_hook;
pub mod hooks;
pub mod import;
pub mod migrate;
pub mod models;
pub mod schema;
pub mod seed;
pub mod server;
