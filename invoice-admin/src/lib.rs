//! Invoice Admin - Companies, clients, numbered invoices and financial analytics.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
