//! State layer for an executive dashboard: tab orchestration, payload
//! normalization, chart binding and a context-aware assistant, with the
//! communications and personal panels around them.

pub mod analytics;
pub mod api;
pub mod assistant;
pub mod charts;
pub mod cli;
pub mod comms;
pub mod config;
pub mod normalize;
pub mod runtime;
pub mod storage;
pub mod tabs;
pub mod web;
