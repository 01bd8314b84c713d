pub mod build;
pub mod codegen;
pub mod config;
pub mod pages;
pub mod serve;
