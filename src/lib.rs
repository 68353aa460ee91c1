pub mod classad;
pub mod condor;
pub mod config;
pub mod error;
pub mod graphs;
pub mod jobs;
pub mod runtime;
pub mod shutdown;
pub mod web;
