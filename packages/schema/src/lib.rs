#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Page validation and record mapping.
//!
//! [`validator`] turns untyped JSON pages into typed
//! [`PageEnvelope`](data_flux_schema_models::PageEnvelope)s, reporting every
//! violation it finds. [`mapper`] stamps validated records with a pipeline
//! version to produce
//! [`PersistedRecord`](data_flux_schema_models::PersistedRecord)s.

pub mod mapper;
pub mod validator;

pub use mapper::{map, map_all, map_listen_history, map_track, map_user};
pub use validator::{ValidationFailure, Validator, Violation};
