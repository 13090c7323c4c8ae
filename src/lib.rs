//! Cliente para processadores de jobs de longa duração.
//!
//! Um job é criado com uma requisição, acompanhado por polling periódico até
//! chegar a um estado terminal e pode ser cancelado a qualquer momento.

pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod ui;
