// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for spiview tools (config, prefs).
//! Keeps transport and rendering adapters free of storage details.

pub mod config;
pub mod prefs;
