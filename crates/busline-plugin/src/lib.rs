// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handler discovery for the Busline message router.
//!
//! Handlers are never loaded by reflection. A local handler unit or a plugin
//! package declares which handler *kinds* it wants, and the kinds are looked
//! up in an explicit [`HandlerCatalog`] of factories built at startup.
//!
//! - Local units are `*.toml` files in the local callbacks directory.
//! - Plugin packages are directories in the plugin directory whose name
//!   starts with a recognized prefix; each carries a `plugin.toml`.

pub mod builtin;
pub mod catalog;
pub mod loader;
pub mod manifest;

pub use catalog::{builtin_catalog, HandlerCatalog, HandlerFactory};
pub use loader::{HandlerLoader, LoadError, LoadReport};
pub use manifest::{parse_handler_unit, parse_plugin_manifest, HandlerSpec, HandlerUnit, PluginManifest};
