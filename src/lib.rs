pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod repository;
pub mod service;
pub mod uploads;
