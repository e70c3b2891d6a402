//! Local storage core of a fitness tracker.
//!
//! Layers, bottom up: [`db`] (SQLite store, per-table access objects, live
//! queries), [`repository`] (one narrow repository per entity),
//! [`viewmodel`] (per-screen holders with snapshot streams and queued
//! writes). [`remote`] talks to an external calendar and carries external
//! sign-in identities.

pub mod config;
pub mod credentials;
pub mod db;
pub mod models;
pub mod remote;
pub mod repository;
pub mod viewmodel;
