//! The parts of `tfdr` that do not talk to the network: the state document
//! model, the resource filter engine, and the copy/delete sequences that run
//! against any [`gateway::StateGateway`].

pub mod error;
pub mod filter;
pub mod gateway;
pub mod state;
pub mod transfer;
